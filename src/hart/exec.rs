//! Instruction execution
//!
//! Semantics of every implemented instruction, per the RISC-V
//! unprivileged specification version 20191213: chapter 2 (RV32I),
//! chapter 7 (M) and chapter 8 (A, word subset only).
//!
//! Within one step the ordering is: source-register reads, memory
//! read (loads and atomics), arithmetic, memory write (stores and
//! atomics), destination-register write, pc write. Because sources
//! are read before anything is written, a destination register may
//! alias a source register (e.g. `jalr t0, 0(t0)`).
//!
//! All arithmetic wraps modulo 2^32; the "signed" comparisons and
//! operations reinterpret the register bits as two's complement
//! without changing them.

use crate::bus::Bus;
use crate::instr::{AmoOp, BranchCond, Instr, LoadWidth, RegImmOp, RegRegOp, StoreWidth};
use crate::utils::{interpret_i32_as_unsigned, interpret_u32_as_signed, sign_extend};

use super::Hart;

fn branch_taken(cond: BranchCond, src1: u32, src2: u32) -> bool {
    match cond {
        BranchCond::Beq => src1 == src2,
        BranchCond::Bne => src1 != src2,
        BranchCond::Blt => interpret_u32_as_signed(src1) < interpret_u32_as_signed(src2),
        BranchCond::Bge => interpret_u32_as_signed(src1) >= interpret_u32_as_signed(src2),
        BranchCond::Bltu => src1 < src2,
        BranchCond::Bgeu => src1 >= src2,
    }
}

/// Register-immediate arithmetic. For the shifts, i_immediate holds
/// the 5-bit shift amount; for everything else it is the
/// sign-extended 12-bit immediate.
fn reg_imm_value(op: RegImmOp, src: u32, i_immediate: u32) -> u32 {
    match op {
        RegImmOp::Addi => src.wrapping_add(i_immediate),
        RegImmOp::Slti => {
            (interpret_u32_as_signed(src) < interpret_u32_as_signed(i_immediate)) as u32
        }
        RegImmOp::Sltiu => (src < i_immediate) as u32,
        RegImmOp::Xori => src ^ i_immediate,
        RegImmOp::Ori => src | i_immediate,
        RegImmOp::Andi => src & i_immediate,
        RegImmOp::Slli => src << (0x1f & i_immediate),
        RegImmOp::Srli => src >> (0x1f & i_immediate),
        RegImmOp::Srai => {
            interpret_i32_as_unsigned(interpret_u32_as_signed(src) >> (0x1f & i_immediate))
        }
    }
}

/// Register-register arithmetic, covering the base integer set and
/// the M extension. Register shifts use only the low five bits of
/// src2. Division follows section 7.2: divide-by-zero and the
/// signed overflow case produce defined results, never a trap.
fn reg_reg_value(op: RegRegOp, src1: u32, src2: u32) -> u32 {
    match op {
        RegRegOp::Add => src1.wrapping_add(src2),
        RegRegOp::Sub => src1.wrapping_sub(src2),
        RegRegOp::Sll => src1 << (0x1f & src2),
        RegRegOp::Slt => (interpret_u32_as_signed(src1) < interpret_u32_as_signed(src2)) as u32,
        RegRegOp::Sltu => (src1 < src2) as u32,
        RegRegOp::Xor => src1 ^ src2,
        RegRegOp::Srl => src1 >> (0x1f & src2),
        RegRegOp::Sra => {
            interpret_i32_as_unsigned(interpret_u32_as_signed(src1) >> (0x1f & src2))
        }
        RegRegOp::Or => src1 | src2,
        RegRegOp::And => src1 & src2,
        RegRegOp::Mul => {
            interpret_u32_as_signed(src1).wrapping_mul(interpret_u32_as_signed(src2)) as u32
        }
        RegRegOp::Mulh => {
            let src1 = i64::from(interpret_u32_as_signed(src1));
            let src2 = i64::from(interpret_u32_as_signed(src2));
            ((src1 * src2) >> 32) as u32
        }
        RegRegOp::Mulhsu => {
            let src1 = i64::from(interpret_u32_as_signed(src1));
            let src2 = i64::from(src2);
            ((src1 * src2) >> 32) as u32
        }
        RegRegOp::Mulhu => {
            let src1 = u64::from(src1);
            let src2 = u64::from(src2);
            ((src1 * src2) >> 32) as u32
        }
        RegRegOp::Div => {
            let divisor = interpret_u32_as_signed(src2);
            if divisor == 0 {
                0xffff_ffff
            } else {
                // wrapping_div returns i32::MIN for the
                // i32::MIN / -1 overflow case, as required
                interpret_i32_as_unsigned(interpret_u32_as_signed(src1).wrapping_div(divisor))
            }
        }
        RegRegOp::Divu => {
            if src2 == 0 {
                0xffff_ffff
            } else {
                src1 / src2
            }
        }
        RegRegOp::Rem => {
            let divisor = interpret_u32_as_signed(src2);
            if divisor == 0 {
                src1
            } else {
                // wrapping_rem returns 0 for the i32::MIN / -1
                // overflow case, as required
                interpret_i32_as_unsigned(interpret_u32_as_signed(src1).wrapping_rem(divisor))
            }
        }
        RegRegOp::Remu => {
            if src2 == 0 {
                src1
            } else {
                src1 % src2
            }
        }
    }
}

/// The value an atomic memory operation writes back, from the old
/// memory word and the src register
fn amo_value(op: AmoOp, old: u32, src: u32) -> u32 {
    match op {
        AmoOp::Add => old.wrapping_add(src),
        AmoOp::Swap => src,
        AmoOp::Xor => old ^ src,
        AmoOp::Or => old | src,
        AmoOp::And => old & src,
        AmoOp::Min => {
            interpret_i32_as_unsigned(interpret_u32_as_signed(old).min(interpret_u32_as_signed(src)))
        }
        AmoOp::Max => {
            interpret_i32_as_unsigned(interpret_u32_as_signed(old).max(interpret_u32_as_signed(src)))
        }
        AmoOp::Minu => old.min(src),
        AmoOp::Maxu => old.max(src),
    }
}

impl<B: Bus> Hart<B> {
    pub(super) fn execute(&mut self, instr: Instr) {
        match instr {
            Instr::Lui { dest, u_immediate } => {
                self.set_x(dest, u_immediate);
                self.increment_pc();
            }
            Instr::Auipc { dest, u_immediate } => {
                self.set_x(dest, self.pc.wrapping_add(u_immediate));
                self.increment_pc();
            }
            Instr::Jal { dest, offset } => {
                let target = self.pc.wrapping_add(offset);
                self.set_x(dest, self.pc.wrapping_add(4));
                self.pc = target;
            }
            Instr::Jalr { dest, base, offset } => {
                // base is read before dest is written, so
                // dest == base is safe
                let target = 0xffff_fffe & self.x(base).wrapping_add(offset);
                self.set_x(dest, self.pc.wrapping_add(4));
                self.pc = target;
            }
            Instr::Branch {
                cond,
                src1,
                src2,
                offset,
            } => {
                if branch_taken(cond, self.x(src1), self.x(src2)) {
                    self.pc = self.pc.wrapping_add(offset);
                } else {
                    self.increment_pc();
                }
            }
            Instr::Load {
                width,
                dest,
                base,
                offset,
            } => {
                let address = self.x(base).wrapping_add(offset);
                let value = match width {
                    LoadWidth::Lb => sign_extend(self.read8(address).into(), 7),
                    LoadWidth::Lh => sign_extend(self.read16(address).into(), 15),
                    LoadWidth::Lw => self.read32(address),
                    LoadWidth::Lbu => self.read8(address).into(),
                    LoadWidth::Lhu => self.read16(address).into(),
                };
                self.set_x(dest, value);
                self.increment_pc();
            }
            Instr::Store {
                width,
                src,
                base,
                offset,
            } => {
                let address = self.x(base).wrapping_add(offset);
                let data = self.x(src);
                match width {
                    StoreWidth::Sb => self.write8(address, data as u8),
                    StoreWidth::Sh => self.write16(address, data as u16),
                    StoreWidth::Sw => self.write32(address, data),
                }
                self.increment_pc();
            }
            Instr::RegImm {
                op,
                dest,
                src,
                i_immediate,
            } => {
                let value = reg_imm_value(op, self.x(src), i_immediate);
                self.set_x(dest, value);
                self.increment_pc();
            }
            Instr::RegReg {
                op,
                dest,
                src1,
                src2,
            } => {
                let value = reg_reg_value(op, self.x(src1), self.x(src2));
                self.set_x(dest, value);
                self.increment_pc();
            }
            Instr::Amo {
                op,
                dest,
                addr,
                src,
            } => {
                // One hart, so the read-modify-write cannot be
                // interleaved with anything
                let address = self.x(addr);
                let operand = self.x(src);
                let old = self.read32(address);
                self.set_x(dest, old);
                self.write32(address, amo_value(op, old, operand));
                self.increment_pc();
            }
            Instr::LoadReserved { dest, addr } => {
                let address = self.x(addr);
                self.reservations.reserve_word(address);
                self.set_x(dest, self.read32(address));
                self.increment_pc();
            }
            Instr::StoreConditional { dest, addr, src } => {
                let address = self.x(addr);
                if self.reservations.word_reserved(address) {
                    let data = self.x(src);
                    self.write32(address, data);
                    self.set_x(dest, 0);
                } else {
                    self.set_x(dest, 1);
                }
                self.reservations.clear();
                self.increment_pc();
            }
        }
    }
}
