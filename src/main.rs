use clap::Parser;
use std::io;
use std::process::ExitCode;

use rv32emu::bus::SystemBus;
use rv32emu::hart::Hart;

/// Emulate a 32-bit RISC-V processor
///
/// The input file is a flat binary image, copied into RAM at
/// 0x8000_0000 (the reset vector) and executed from the beginning.
/// Bytes the program stores to address 0 appear on standard output.
/// Emulation runs until the processor hits an instruction it cannot
/// decode, or until the optional cycle budget runs out.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about)]
struct Args {
    /// Path to the binary image to execute
    input: String,

    /// Print each retired instruction's address and disassembly
    #[arg(short, long)]
    trace: bool,

    /// Stop after this many instructions
    #[arg(short, long)]
    cycles: Option<u64>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let image = match std::fs::read(&args.input) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("error: could not read {}: {e}", args.input);
            return ExitCode::FAILURE;
        }
    };

    let mut hart = Hart::new(SystemBus::with_image(&image, io::stdout()));
    hart.set_trace(args.trace);

    let mut remaining = args.cycles;
    while !hart.emulation_stopped() {
        if let Some(cycles) = remaining.as_mut() {
            if *cycles == 0 {
                break;
            }
            *cycles -= 1;
        }
        hart.step();
    }

    if hart.emulation_stopped() {
        eprintln!("emulation stopped at pc=0x{:08x}", hart.pc());
    }

    ExitCode::SUCCESS
}
