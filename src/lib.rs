//! Emulator for a 32-bit RISC-V hardware thread
//!
//! The crate models a single hart implementing the RV32I base integer
//! instruction set, the M standard extension for integer
//! multiplication and division, and the word-sized subset of the A
//! standard extension (instruction behaviour follows the RISC-V
//! unprivileged specification version 20191213). The hart performs
//! all memory traffic through the [`bus::Bus`] trait, which the host
//! implements; [`bus::SystemBus`] is the reference host memory map
//! (128 MiB of RAM at the reset vector and a console output byte at
//! address zero).
//!
//! The same decoder that drives execution also produces a textual
//! disassembly of each instruction (see [`disasm`]), which the hart
//! can print as it retires instructions.

pub mod bus;
pub mod disasm;
pub mod encode;
pub mod hart;
pub mod instr;
pub mod opcodes;
pub mod utils;
