//! Instruction decoding
//!
//! This file is where a u32 instruction word is converted into the
//! [`Instr`] enum, which holds the instruction fields in a more
//! easily accessible format ready for execution or disassembly.
//!
//! Instruction encodings are defined in the RISC-V unprivileged
//! specification version 20191213: chapter 2 for the RV32I base
//! integer instruction set, chapter 7 for the M standard extension,
//! and chapter 8 for the A standard extension. Only the word-sized
//! subset of A is decoded.
//!
//! All immediates are sign extended at decode time and stored as
//! u32, so executing an instruction only needs wrapping arithmetic
//! on the stored value. Reserved or unimplemented encodings return
//! [`DecodeError`]; what the hart does with that is up to the
//! caller (see the hart module).

use thiserror::Error;

use crate::opcodes::*;
use crate::utils::{bits, sign_extend};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("got invalid or unimplemented opcode 0x{0:02x}")]
    InvalidOpcode(u32),
    #[error("got invalid or unimplemented instruction 0x{0:08x}")]
    InvalidInstruction(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchCond {
    Beq,
    Bne,
    Blt,
    Bge,
    Bltu,
    Bgeu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadWidth {
    Lb,
    Lh,
    Lw,
    Lbu,
    Lhu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreWidth {
    Sb,
    Sh,
    Sw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegImmOp {
    Addi,
    Slti,
    Sltiu,
    Xori,
    Ori,
    Andi,
    Slli,
    Srli,
    Srai,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegRegOp {
    Add,
    Sub,
    Sll,
    Slt,
    Sltu,
    Xor,
    Srl,
    Sra,
    Or,
    And,
    Mul,
    Mulh,
    Mulhsu,
    Mulhu,
    Div,
    Divu,
    Rem,
    Remu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmoOp {
    Add,
    Swap,
    Xor,
    Or,
    And,
    Min,
    Max,
    Minu,
    Maxu,
}

/// A decoded RISC-V instruction
///
/// Instructions with the same operand shape and execution pattern
/// share a variant, distinguished by a mnemonic field. Register
/// indices are the raw 5-bit fields; immediates are already sign
/// extended (the shift instructions hold the 5-bit shift amount in
/// i_immediate instead).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instr {
    /// Load u_immediate (already aligned to the upper 20 bits of the
    /// word, low 12 bits zero) into dest
    Lui { dest: u8, u_immediate: u32 },
    /// Add u_immediate to the pc of this instruction and store the
    /// result in dest
    Auipc { dest: u8, u_immediate: u32 },
    /// Store pc + 4 in dest and jump to pc + offset. The offset is
    /// 21 bits long with an even value.
    Jal { dest: u8, offset: u32 },
    /// Store pc + 4 in dest and jump to (base + offset) & !1
    Jalr { dest: u8, base: u8, offset: u32 },
    /// If cond holds between src1 and src2, jump to pc + offset.
    /// The offset is 13 bits long with an even value.
    Branch {
        cond: BranchCond,
        src1: u8,
        src2: u8,
        offset: u32,
    },
    /// Read width bytes at base + offset into dest. Lb and Lh sign
    /// extend the value, Lbu and Lhu zero extend it.
    Load {
        width: LoadWidth,
        dest: u8,
        base: u8,
        offset: u32,
    },
    /// Write the low bytes of src (per width) to base + offset
    Store {
        width: StoreWidth,
        src: u8,
        base: u8,
        offset: u32,
    },
    /// Combine src with i_immediate (the shift amount for Slli,
    /// Srli and Srai) and store the result in dest
    RegImm {
        op: RegImmOp,
        dest: u8,
        src: u8,
        i_immediate: u32,
    },
    /// Combine src1 with src2 and store the result in dest. Covers
    /// both the base integer operations and the M extension.
    RegReg {
        op: RegRegOp,
        dest: u8,
        src1: u8,
        src2: u8,
    },
    /// Atomically read the word at the address in addr into dest,
    /// combine it with src per op, and write the result back
    Amo { op: AmoOp, dest: u8, addr: u8, src: u8 },
    /// Read the word at the address in addr into dest and reserve
    /// its four bytes
    LoadReserved { dest: u8, addr: u8 },
    /// If the four bytes at the address in addr are still reserved,
    /// write src there and set dest to 0; otherwise set dest to 1.
    /// Either way, drop every reservation.
    StoreConditional { dest: u8, addr: u8, src: u8 },
}

fn opcode(instr: u32) -> u32 {
    bits(instr, 6, 0)
}

fn rd(instr: u32) -> u8 {
    bits(instr, 11, 7) as u8
}

fn rs1(instr: u32) -> u8 {
    bits(instr, 19, 15) as u8
}

fn rs2(instr: u32) -> u8 {
    bits(instr, 24, 20) as u8
}

fn funct3(instr: u32) -> u32 {
    bits(instr, 14, 12)
}

fn funct7(instr: u32) -> u32 {
    bits(instr, 31, 25)
}

/// The shift amount shares the low bits of the I-type immediate
/// field; the upper bits distinguish srli from srai
fn shamt(instr: u32) -> u32 {
    bits(instr, 24, 20)
}

pub fn imm_utype(instr: u32) -> u32 {
    instr & 0xffff_f000
}

pub fn imm_itype(instr: u32) -> u32 {
    sign_extend(bits(instr, 31, 20), 11)
}

pub fn imm_stype(instr: u32) -> u32 {
    let imm11_5 = bits(instr, 31, 25);
    let imm4_0 = bits(instr, 11, 7);
    sign_extend(imm11_5 << 5 | imm4_0, 11)
}

pub fn imm_btype(instr: u32) -> u32 {
    let imm12 = bits(instr, 31, 31);
    let imm11 = bits(instr, 7, 7);
    let imm10_5 = bits(instr, 30, 25);
    let imm4_1 = bits(instr, 11, 8);
    sign_extend(imm12 << 12 | imm11 << 11 | imm10_5 << 5 | imm4_1 << 1, 12)
}

pub fn imm_jtype(instr: u32) -> u32 {
    let imm20 = bits(instr, 31, 31);
    let imm19_12 = bits(instr, 19, 12);
    let imm11 = bits(instr, 20, 20);
    let imm10_1 = bits(instr, 30, 21);
    sign_extend(imm20 << 20 | imm19_12 << 12 | imm11 << 11 | imm10_1 << 1, 20)
}

fn decode_branch(instr: u32) -> Result<Instr, DecodeError> {
    let cond = match funct3(instr) {
        FUNCT3_BEQ => BranchCond::Beq,
        FUNCT3_BNE => BranchCond::Bne,
        FUNCT3_BLT => BranchCond::Blt,
        FUNCT3_BGE => BranchCond::Bge,
        FUNCT3_BLTU => BranchCond::Bltu,
        FUNCT3_BGEU => BranchCond::Bgeu,
        _ => return Err(DecodeError::InvalidInstruction(instr)),
    };
    Ok(Instr::Branch {
        cond,
        src1: rs1(instr),
        src2: rs2(instr),
        offset: imm_btype(instr),
    })
}

fn decode_load(instr: u32) -> Result<Instr, DecodeError> {
    let width = match funct3(instr) {
        FUNCT3_B => LoadWidth::Lb,
        FUNCT3_H => LoadWidth::Lh,
        FUNCT3_W => LoadWidth::Lw,
        FUNCT3_BU => LoadWidth::Lbu,
        FUNCT3_HU => LoadWidth::Lhu,
        _ => return Err(DecodeError::InvalidInstruction(instr)),
    };
    Ok(Instr::Load {
        width,
        dest: rd(instr),
        base: rs1(instr),
        offset: imm_itype(instr),
    })
}

fn decode_store(instr: u32) -> Result<Instr, DecodeError> {
    let width = match funct3(instr) {
        FUNCT3_B => StoreWidth::Sb,
        FUNCT3_H => StoreWidth::Sh,
        FUNCT3_W => StoreWidth::Sw,
        _ => return Err(DecodeError::InvalidInstruction(instr)),
    };
    Ok(Instr::Store {
        width,
        src: rs2(instr),
        base: rs1(instr),
        offset: imm_stype(instr),
    })
}

fn decode_reg_imm(instr: u32) -> Result<Instr, DecodeError> {
    let (op, i_immediate) = match funct3(instr) {
        FUNCT3_ADDI => (RegImmOp::Addi, imm_itype(instr)),
        FUNCT3_SLTI => (RegImmOp::Slti, imm_itype(instr)),
        FUNCT3_SLTIU => (RegImmOp::Sltiu, imm_itype(instr)),
        FUNCT3_XORI => (RegImmOp::Xori, imm_itype(instr)),
        FUNCT3_ORI => (RegImmOp::Ori, imm_itype(instr)),
        FUNCT3_ANDI => (RegImmOp::Andi, imm_itype(instr)),
        FUNCT3_SLLI => match funct7(instr) {
            FUNCT7_BASE => (RegImmOp::Slli, shamt(instr)),
            _ => return Err(DecodeError::InvalidInstruction(instr)),
        },
        FUNCT3_SRLI => match funct7(instr) {
            FUNCT7_BASE => (RegImmOp::Srli, shamt(instr)),
            FUNCT7_SRAI => (RegImmOp::Srai, shamt(instr)),
            _ => return Err(DecodeError::InvalidInstruction(instr)),
        },
        _ => return Err(DecodeError::InvalidInstruction(instr)),
    };
    Ok(Instr::RegImm {
        op,
        dest: rd(instr),
        src: rs1(instr),
        i_immediate,
    })
}

fn decode_reg_reg(instr: u32) -> Result<Instr, DecodeError> {
    let op = match (funct7(instr), funct3(instr)) {
        (FUNCT7_BASE, FUNCT3_ADD) => RegRegOp::Add,
        (FUNCT7_SUB, FUNCT3_SUB) => RegRegOp::Sub,
        (FUNCT7_BASE, FUNCT3_SLL) => RegRegOp::Sll,
        (FUNCT7_BASE, FUNCT3_SLT) => RegRegOp::Slt,
        (FUNCT7_BASE, FUNCT3_SLTU) => RegRegOp::Sltu,
        (FUNCT7_BASE, FUNCT3_XOR) => RegRegOp::Xor,
        (FUNCT7_BASE, FUNCT3_SRL) => RegRegOp::Srl,
        (FUNCT7_SRA, FUNCT3_SRA) => RegRegOp::Sra,
        (FUNCT7_BASE, FUNCT3_OR) => RegRegOp::Or,
        (FUNCT7_BASE, FUNCT3_AND) => RegRegOp::And,
        (FUNCT7_MULDIV, FUNCT3_MUL) => RegRegOp::Mul,
        (FUNCT7_MULDIV, FUNCT3_MULH) => RegRegOp::Mulh,
        (FUNCT7_MULDIV, FUNCT3_MULHSU) => RegRegOp::Mulhsu,
        (FUNCT7_MULDIV, FUNCT3_MULHU) => RegRegOp::Mulhu,
        (FUNCT7_MULDIV, FUNCT3_DIV) => RegRegOp::Div,
        (FUNCT7_MULDIV, FUNCT3_DIVU) => RegRegOp::Divu,
        (FUNCT7_MULDIV, FUNCT3_REM) => RegRegOp::Rem,
        (FUNCT7_MULDIV, FUNCT3_REMU) => RegRegOp::Remu,
        _ => return Err(DecodeError::InvalidInstruction(instr)),
    };
    Ok(Instr::RegReg {
        op,
        dest: rd(instr),
        src1: rs1(instr),
        src2: rs2(instr),
    })
}

fn decode_amo(instr: u32) -> Result<Instr, DecodeError> {
    if funct3(instr) != FUNCT3_AMO_W {
        return Err(DecodeError::InvalidInstruction(instr));
    }
    let dest = rd(instr);
    let addr = rs1(instr);
    let src = rs2(instr);
    // Only one hart is modelled, so the aq/rl flags in funct7[1:0]
    // have no observable effect and are ignored
    let op = match funct7(instr) >> 2 {
        FUNCT5_LR => return Ok(Instr::LoadReserved { dest, addr }),
        FUNCT5_SC => return Ok(Instr::StoreConditional { dest, addr, src }),
        FUNCT5_AMOADD => AmoOp::Add,
        FUNCT5_AMOSWAP => AmoOp::Swap,
        FUNCT5_AMOXOR => AmoOp::Xor,
        FUNCT5_AMOOR => AmoOp::Or,
        FUNCT5_AMOAND => AmoOp::And,
        FUNCT5_AMOMIN => AmoOp::Min,
        FUNCT5_AMOMAX => AmoOp::Max,
        FUNCT5_AMOMINU => AmoOp::Minu,
        FUNCT5_AMOMAXU => AmoOp::Maxu,
        _ => return Err(DecodeError::InvalidInstruction(instr)),
    };
    Ok(Instr::Amo {
        op,
        dest,
        addr,
        src,
    })
}

impl Instr {
    /// Decode a 32-bit instruction word
    ///
    /// Decoding dispatches on the opcode field first, then on funct3
    /// and funct7 where the opcode does not determine the
    /// instruction by itself. Any encoding outside the implemented
    /// sets returns an error and leaves nothing decoded.
    pub fn decode(instr: u32) -> Result<Self, DecodeError> {
        match opcode(instr) {
            OP_LUI => Ok(Instr::Lui {
                dest: rd(instr),
                u_immediate: imm_utype(instr),
            }),
            OP_AUIPC => Ok(Instr::Auipc {
                dest: rd(instr),
                u_immediate: imm_utype(instr),
            }),
            OP_JAL => Ok(Instr::Jal {
                dest: rd(instr),
                offset: imm_jtype(instr),
            }),
            OP_JALR => {
                if funct3(instr) != 0 {
                    return Err(DecodeError::InvalidInstruction(instr));
                }
                Ok(Instr::Jalr {
                    dest: rd(instr),
                    base: rs1(instr),
                    offset: imm_itype(instr),
                })
            }
            OP_BRANCH => decode_branch(instr),
            OP_LOAD => decode_load(instr),
            OP_STORE => decode_store(instr),
            OP_IMM => decode_reg_imm(instr),
            OP => decode_reg_reg(instr),
            OP_AMO => decode_amo(instr),
            other => Err(DecodeError::InvalidOpcode(other)),
        }
    }
}
