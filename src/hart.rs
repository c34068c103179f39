//! RISC-V hardware thread
//!
//! This is a single RISC-V hart implementing RV32I, the M extension
//! and the word subset of the A extension, with no notion of
//! privilege (see section 1.2 of the RISC-V unprivileged
//! specification version 20191213 for the execution environment
//! being modelled):
//!
//! * there is only one hart, so the atomic instructions are
//!   trivially atomic and the aq/rl ordering flags have no effect
//! * the initial state is the reset state: every register zero and
//!   the pc at [`RESET_VECTOR`]
//! * all memory traffic goes through the host's [`Bus`]; what is
//!   RAM, what is a device and what is unmapped is the host's
//!   business
//! * fetching an undecodable instruction word is fatal: the hart
//!   signals the bus, leaves the pc on the offending word and stops
//!
//! The member function step() controls execution of the hart. Each
//! time it is called, the instruction at the current pc is fetched,
//! executed and retired, and the pc moves on (by four, or to the
//! branch or jump target). The host drives the hart by calling
//! step() until [`Hart::emulation_stopped`] reports true.

use crate::bus::Bus;
use crate::disasm;
use crate::instr::Instr;

use self::registers::Registers;
use self::reservation::ReservationSet;

mod exec;
pub mod registers;
pub mod reservation;

/// The pc points here after reset; the host is expected to place
/// the first executable word at this address
pub const RESET_VECTOR: u32 = 0x8000_0000;

#[derive(Debug)]
pub struct Hart<B> {
    bus: B,
    pc: u32,
    registers: Registers,
    reservations: ReservationSet,
    stopped: bool,
    trace: bool,
}

impl<B: Bus> Hart<B> {
    /// Make a hart in its reset state, bound to the bus for the
    /// rest of its life
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            pc: RESET_VECTOR,
            registers: Registers::default(),
            reservations: ReservationSet::default(),
            stopped: false,
            trace: false,
        }
    }

    /// Return the hart to its reset state: pc at the reset vector,
    /// registers zero, no outstanding reservation, not stopped.
    /// Memory is untouched (reset does not reload the image).
    pub fn reset(&mut self) {
        self.pc = RESET_VECTOR;
        self.registers.reset();
        self.reservations.clear();
        self.stopped = false;
    }

    /// Get the current program counter
    pub fn pc(&self) -> u32 {
        self.pc
    }

    /// Read the value of register xn
    pub fn x(&self, n: u8) -> u32 {
        self.registers.read(n)
    }

    /// Write the value of register xn (writes to x0 are discarded)
    pub fn set_x(&mut self, n: u8, value: u32) {
        self.registers.write(n, value);
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// When tracing is on, each retired instruction prints its
    /// address and disassembly on its own line
    pub fn set_trace(&mut self, trace: bool) {
        self.trace = trace;
    }

    /// True once the hart has hit an illegal instruction. The pc
    /// still holds the address of the offending instruction.
    pub fn emulation_stopped(&self) -> bool {
        self.stopped
    }

    /// Execute the instruction at the current pc
    ///
    /// One step is fetch, decode, execute, pc update; the pc is
    /// written exactly once per step. If the fetched word does not
    /// decode, the bus's illegal-instruction signal is raised, the
    /// pc is left pointing at the word, no architectural state
    /// changes, and the hart stops. Stepping a stopped hart does
    /// nothing.
    pub fn step(&mut self) {
        if self.stopped {
            return;
        }
        let code = self.read32(self.pc);
        match Instr::decode(code) {
            Ok(instr) => {
                if self.trace {
                    if let Ok(listing) = disasm::disassemble(self.pc, code) {
                        println!("{:08x}\t{}", self.pc, listing);
                    }
                }
                self.execute(instr);
            }
            Err(_) => {
                self.bus.illegal_instruction();
                self.stopped = true;
            }
        }
    }

    /// Set pc = pc + 4, wrapping if necessary
    fn increment_pc(&mut self) {
        self.pc = self.pc.wrapping_add(4);
    }

    // All hart memory traffic funnels through the accessors below.
    // Every store removes exactly the bytes it writes from the
    // reservation set before the data reaches the bus, which is
    // what makes an sc.w fail after an intervening store to any of
    // its four bytes.

    fn read8(&self, address: u32) -> u8 {
        self.bus.read8(address)
    }

    fn read16(&self, address: u32) -> u16 {
        self.bus.read16(address)
    }

    fn read32(&self, address: u32) -> u32 {
        self.bus.read32(address)
    }

    fn write8(&mut self, address: u32, data: u8) {
        self.reservations.invalidate(address, 1);
        self.bus.write8(address, data);
    }

    fn write16(&mut self, address: u32, data: u16) {
        self.reservations.invalidate(address, 2);
        self.bus.write16(address, data);
    }

    fn write32(&mut self, address: u32, data: u32) {
        self.reservations.invalidate(address, 4);
        self.bus.write32(address, data);
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::bus::SystemBus;
    use crate::encode::*;

    fn hart_with_program(words: &[u32]) -> Hart<SystemBus<Vec<u8>>> {
        let mut image = Vec::new();
        for word in words {
            image.extend_from_slice(&word.to_le_bytes());
        }
        Hart::new(SystemBus::with_image(&image, Vec::new()))
    }

    #[test]
    fn check_reset_state() {
        let hart = hart_with_program(&[]);
        assert_eq!(hart.pc(), RESET_VECTOR);
        for n in 0..32 {
            assert_eq!(hart.x(n), 0);
        }
        assert!(!hart.emulation_stopped());
    }

    #[test]
    fn check_reset_after_running() {
        let mut hart = hart_with_program(&[addi(1, 0, 7), jal(2, -4)]);
        hart.step();
        hart.step();
        assert_ne!(hart.pc(), RESET_VECTOR);
        hart.reset();
        assert_eq!(hart.pc(), RESET_VECTOR);
        assert_eq!(hart.x(1), 0);
        assert_eq!(hart.x(2), 0);
    }

    #[test]
    fn check_illegal_instruction_stops_hart() {
        // 0xffff_ffff does not decode
        let mut hart = hart_with_program(&[addi(1, 0, 1), 0xffff_ffff]);
        hart.step();
        assert!(!hart.emulation_stopped());
        hart.step();
        assert!(hart.emulation_stopped());
        assert!(hart.bus().stopped());
        // The pc is left on the offending instruction and nothing
        // was committed
        assert_eq!(hart.pc(), RESET_VECTOR + 4);
        assert_eq!(hart.x(1), 1);
    }

    #[test]
    fn check_step_after_stop_does_nothing() {
        let mut hart = hart_with_program(&[0xffff_ffff]);
        hart.step();
        assert!(hart.emulation_stopped());
        let pc = hart.pc();
        hart.step();
        assert_eq!(hart.pc(), pc);
    }

    #[test]
    fn check_reset_clears_stop() {
        let mut hart = hart_with_program(&[0xffff_ffff]);
        hart.step();
        assert!(hart.emulation_stopped());
        hart.reset();
        assert!(!hart.emulation_stopped());
    }

    #[test]
    fn check_x0_reads_zero_after_every_step() {
        let mut hart = hart_with_program(&[
            addi(0, 0, 123),
            lui(0, 0xfffff),
            jal(0, 4),
            addi(5, 0, 1),
        ]);
        for _ in 0..4 {
            hart.step();
            assert_eq!(hart.x(0), 0);
        }
        assert_eq!(hart.x(5), 1);
    }

    #[test]
    fn check_lr_sc_round_trip() {
        // a0 holds an address; lr.w then sc.w with no intervening
        // store succeeds
        let mut hart = hart_with_program(&[lr_w(5, 10), sc_w(6, 7, 10)]);
        hart.set_x(10, RESET_VECTOR + 0x100);
        hart.set_x(7, 0xcafe_f00d);
        hart.bus_mut().write32(RESET_VECTOR + 0x100, 0x1234_5678);
        hart.step();
        assert_eq!(hart.x(5), 0x1234_5678);
        hart.step();
        assert_eq!(hart.x(6), 0);
        assert_eq!(hart.bus().read32(RESET_VECTOR + 0x100), 0xcafe_f00d);
    }

    #[test]
    fn check_sc_without_reservation_fails() {
        let mut hart = hart_with_program(&[sc_w(6, 7, 10)]);
        hart.set_x(10, RESET_VECTOR + 0x100);
        hart.set_x(7, 0xcafe_f00d);
        hart.step();
        assert_eq!(hart.x(6), 1);
        assert_eq!(hart.bus().read32(RESET_VECTOR + 0x100), 0);
    }

    #[test]
    fn check_store_breaks_reservation() {
        // sb into the middle of the reserved word makes the sc fail
        // and leaves the word unchanged by the sc
        let mut hart = hart_with_program(&[lr_w(5, 10), sb(7, 10, 1), sc_w(6, 7, 10)]);
        hart.set_x(10, RESET_VECTOR + 0x100);
        hart.set_x(7, 0xee);
        hart.step();
        hart.step();
        hart.step();
        assert_eq!(hart.x(6), 1);
        assert_eq!(hart.bus().read32(RESET_VECTOR + 0x100), 0x0000_ee00);
    }

    #[test]
    fn check_unrelated_store_keeps_reservation() {
        let mut hart = hart_with_program(&[lr_w(5, 10), sw(7, 10, 8), sc_w(6, 7, 10)]);
        hart.set_x(10, RESET_VECTOR + 0x100);
        hart.set_x(7, 0xcafe_f00d);
        hart.step();
        hart.step();
        hart.step();
        assert_eq!(hart.x(6), 0);
        assert_eq!(hart.bus().read32(RESET_VECTOR + 0x100), 0xcafe_f00d);
    }

    #[test]
    fn check_straddling_store_breaks_reservation() {
        // A halfword store at base - 1 touches only the first
        // reserved byte, which is enough to fail the sc
        let mut hart = hart_with_program(&[lr_w(5, 10), sh(7, 10, -1), sc_w(6, 7, 10)]);
        hart.set_x(10, RESET_VECTOR + 0x100);
        hart.step();
        hart.step();
        hart.step();
        assert_eq!(hart.x(6), 1);
    }

    #[test]
    fn check_sc_clears_reservation_either_way() {
        // After a successful sc, a second sc to the same address
        // fails because the first cleared the reservation
        let mut hart = hart_with_program(&[lr_w(5, 10), sc_w(6, 7, 10), sc_w(28, 7, 10)]);
        hart.set_x(10, RESET_VECTOR + 0x100);
        hart.step();
        hart.step();
        assert_eq!(hart.x(6), 0);
        hart.step();
        assert_eq!(hart.x(28), 1);
    }

    #[test]
    fn check_new_lr_moves_reservation() {
        // The second lr.w drops the first reservation, so an sc.w
        // against the first address fails
        let mut hart = hart_with_program(&[lr_w(5, 10), lr_w(6, 11), sc_w(28, 7, 10)]);
        hart.set_x(10, RESET_VECTOR + 0x100);
        hart.set_x(11, RESET_VECTOR + 0x200);
        hart.step();
        hart.step();
        hart.step();
        assert_eq!(hart.x(28), 1);
    }

    #[test]
    fn check_console_output() {
        // addi t0, zero, 65; sb t0, 0(zero)
        let mut hart = hart_with_program(&[addi(5, 0, 65), sb(5, 0, 0)]);
        hart.step();
        hart.step();
        assert_eq!(hart.bus().console(), &b"A".to_vec());
        // The console is not RAM: the byte does not read back
        assert_eq!(hart.bus().read8(0), 0xff);
        assert_eq!(hart.pc(), RESET_VECTOR + 8);
    }
}
