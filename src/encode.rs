//! Instruction encoding
//!
//! The inverse of the decoder in the instr module: build valid
//! 32-bit instruction words from fields. The per-mnemonic functions
//! at the bottom are what the test suites use to assemble the
//! programs they run. Register operands are plain x-register
//! indices; immediate operands take the signed value the assembly
//! syntax would show.

use crate::opcodes::*;
use crate::utils::bits;

/// Make an I-type instruction. The immediate is masked to its
/// 12-bit field, so negative offsets can be passed casted.
pub fn itype(imm: u32, rs1: u8, funct3: u32, rd: u8, opcode: u32) -> u32 {
    (imm & 0xfff) << 20 | u32::from(rs1) << 15 | funct3 << 12 | u32::from(rd) << 7 | opcode
}

/// Make an R-type instruction
pub fn rtype(funct7: u32, rs2: u8, rs1: u8, funct3: u32, rd: u8, opcode: u32) -> u32 {
    funct7 << 25
        | u32::from(rs2) << 20
        | u32::from(rs1) << 15
        | funct3 << 12
        | u32::from(rd) << 7
        | opcode
}

/// Make an S-type instruction, splitting the immediate across its
/// two fields
pub fn stype(imm: u32, rs2: u8, rs1: u8, funct3: u32, opcode: u32) -> u32 {
    let imm11_5 = bits(imm, 11, 5);
    let imm4_0 = bits(imm, 4, 0);
    imm11_5 << 25
        | u32::from(rs2) << 20
        | u32::from(rs1) << 15
        | funct3 << 12
        | imm4_0 << 7
        | opcode
}

/// Make a B-type instruction from an even 13-bit offset
pub fn btype(offset: u32, rs2: u8, rs1: u8, funct3: u32, opcode: u32) -> u32 {
    let imm12 = bits(offset, 12, 12);
    let imm11 = bits(offset, 11, 11);
    let imm10_5 = bits(offset, 10, 5);
    let imm4_1 = bits(offset, 4, 1);
    imm12 << 31
        | imm10_5 << 25
        | u32::from(rs2) << 20
        | u32::from(rs1) << 15
        | funct3 << 12
        | imm4_1 << 8
        | imm11 << 7
        | opcode
}

/// Make a U-type instruction from a 20-bit immediate
pub fn utype(imm: u32, rd: u8, opcode: u32) -> u32 {
    (imm & 0xfffff) << 12 | u32::from(rd) << 7 | opcode
}

/// Make a J-type instruction from an even 21-bit offset
pub fn jtype(offset: u32, rd: u8, opcode: u32) -> u32 {
    let imm20 = bits(offset, 20, 20);
    let imm19_12 = bits(offset, 19, 12);
    let imm11 = bits(offset, 11, 11);
    let imm10_1 = bits(offset, 10, 1);
    imm20 << 31 | imm10_1 << 21 | imm11 << 20 | imm19_12 << 12 | u32::from(rd) << 7 | opcode
}

macro_rules! load_instr {
    ($name:ident, $funct3:expr) => {
        pub fn $name(dest: u8, base: u8, offset: i32) -> u32 {
            itype(offset as u32, base, $funct3, dest, OP_LOAD)
        }
    };
}

macro_rules! reg_imm_instr {
    ($name:ident, $funct3:expr) => {
        pub fn $name(dest: u8, src: u8, imm: i32) -> u32 {
            itype(imm as u32, src, $funct3, dest, OP_IMM)
        }
    };
}

/// The shift-by-immediate instructions use I-type, with the shift
/// amount in the low five bits of the immediate field and the upper
/// bits distinguishing arithmetical from logical right shift
macro_rules! shift_instr {
    ($name:ident, $upper:expr, $funct3:expr) => {
        pub fn $name(dest: u8, src: u8, shamt: u32) -> u32 {
            itype($upper << 5 | (shamt & 0x1f), src, $funct3, dest, OP_IMM)
        }
    };
}

macro_rules! store_instr {
    ($name:ident, $funct3:expr) => {
        pub fn $name(src: u8, base: u8, offset: i32) -> u32 {
            stype(offset as u32, src, base, $funct3, OP_STORE)
        }
    };
}

macro_rules! branch_instr {
    ($name:ident, $funct3:expr) => {
        pub fn $name(src1: u8, src2: u8, offset: i32) -> u32 {
            btype(offset as u32, src2, src1, $funct3, OP_BRANCH)
        }
    };
}

macro_rules! reg_reg_instr {
    ($name:ident, $funct7:expr, $funct3:expr) => {
        pub fn $name(dest: u8, src1: u8, src2: u8) -> u32 {
            rtype($funct7, src2, src1, $funct3, dest, OP)
        }
    };
}

/// Operand order matches the assembly syntax `amo*.w rd, rs2, (rs1)`
macro_rules! amo_instr {
    ($name:ident, $funct5:expr) => {
        pub fn $name(dest: u8, src: u8, addr: u8) -> u32 {
            rtype($funct5 << 2, src, addr, FUNCT3_AMO_W, dest, OP_AMO)
        }
    };
}

pub fn lui(dest: u8, imm: u32) -> u32 {
    utype(imm, dest, OP_LUI)
}

pub fn auipc(dest: u8, imm: u32) -> u32 {
    utype(imm, dest, OP_AUIPC)
}

pub fn jal(dest: u8, offset: i32) -> u32 {
    jtype(offset as u32, dest, OP_JAL)
}

pub fn jalr(dest: u8, base: u8, offset: i32) -> u32 {
    itype(offset as u32, base, 0, dest, OP_JALR)
}

branch_instr!(beq, FUNCT3_BEQ);
branch_instr!(bne, FUNCT3_BNE);
branch_instr!(blt, FUNCT3_BLT);
branch_instr!(bge, FUNCT3_BGE);
branch_instr!(bltu, FUNCT3_BLTU);
branch_instr!(bgeu, FUNCT3_BGEU);

load_instr!(lb, FUNCT3_B);
load_instr!(lh, FUNCT3_H);
load_instr!(lw, FUNCT3_W);
load_instr!(lbu, FUNCT3_BU);
load_instr!(lhu, FUNCT3_HU);

store_instr!(sb, FUNCT3_B);
store_instr!(sh, FUNCT3_H);
store_instr!(sw, FUNCT3_W);

reg_imm_instr!(addi, FUNCT3_ADDI);
reg_imm_instr!(slti, FUNCT3_SLTI);
reg_imm_instr!(sltiu, FUNCT3_SLTIU);
reg_imm_instr!(xori, FUNCT3_XORI);
reg_imm_instr!(ori, FUNCT3_ORI);
reg_imm_instr!(andi, FUNCT3_ANDI);

shift_instr!(slli, FUNCT7_BASE, FUNCT3_SLLI);
shift_instr!(srli, FUNCT7_BASE, FUNCT3_SRLI);
shift_instr!(srai, FUNCT7_SRAI, FUNCT3_SRAI);

reg_reg_instr!(add, FUNCT7_BASE, FUNCT3_ADD);
reg_reg_instr!(sub, FUNCT7_SUB, FUNCT3_SUB);
reg_reg_instr!(sll, FUNCT7_BASE, FUNCT3_SLL);
reg_reg_instr!(slt, FUNCT7_BASE, FUNCT3_SLT);
reg_reg_instr!(sltu, FUNCT7_BASE, FUNCT3_SLTU);
reg_reg_instr!(xor, FUNCT7_BASE, FUNCT3_XOR);
reg_reg_instr!(srl, FUNCT7_BASE, FUNCT3_SRL);
reg_reg_instr!(sra, FUNCT7_SRA, FUNCT3_SRA);
reg_reg_instr!(or, FUNCT7_BASE, FUNCT3_OR);
reg_reg_instr!(and, FUNCT7_BASE, FUNCT3_AND);

reg_reg_instr!(mul, FUNCT7_MULDIV, FUNCT3_MUL);
reg_reg_instr!(mulh, FUNCT7_MULDIV, FUNCT3_MULH);
reg_reg_instr!(mulhsu, FUNCT7_MULDIV, FUNCT3_MULHSU);
reg_reg_instr!(mulhu, FUNCT7_MULDIV, FUNCT3_MULHU);
reg_reg_instr!(div, FUNCT7_MULDIV, FUNCT3_DIV);
reg_reg_instr!(divu, FUNCT7_MULDIV, FUNCT3_DIVU);
reg_reg_instr!(rem, FUNCT7_MULDIV, FUNCT3_REM);
reg_reg_instr!(remu, FUNCT7_MULDIV, FUNCT3_REMU);

amo_instr!(amoadd_w, FUNCT5_AMOADD);
amo_instr!(amoswap_w, FUNCT5_AMOSWAP);
amo_instr!(amoxor_w, FUNCT5_AMOXOR);
amo_instr!(amoor_w, FUNCT5_AMOOR);
amo_instr!(amoand_w, FUNCT5_AMOAND);
amo_instr!(amomin_w, FUNCT5_AMOMIN);
amo_instr!(amomax_w, FUNCT5_AMOMAX);
amo_instr!(amominu_w, FUNCT5_AMOMINU);
amo_instr!(amomaxu_w, FUNCT5_AMOMAXU);

pub fn lr_w(dest: u8, addr: u8) -> u32 {
    rtype(FUNCT5_LR << 2, 0, addr, FUNCT3_AMO_W, dest, OP_AMO)
}

pub fn sc_w(dest: u8, src: u8, addr: u8) -> u32 {
    rtype(FUNCT5_SC << 2, src, addr, FUNCT3_AMO_W, dest, OP_AMO)
}
