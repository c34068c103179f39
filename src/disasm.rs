//! Instruction disassembly
//!
//! Renders a decoded instruction as one line of canonical RISC-V
//! assembly. The renderer shares the decoder with the executor, so
//! the two can never disagree about fields, and it has no access to
//! hart state at all (disassembly never executes anything).
//!
//! The text format is `<mnemonic>\t<op1>,<op2>,...`, optionally
//! followed by ` # <comment>`. Pc-relative control flow gets the
//! absolute target address as the comment; `jalr zero, 0(ra)` gets
//! the comment `ret`.

use std::fmt;

use itertools::Itertools;

use crate::hart::registers::abi_name;
use crate::instr::{
    AmoOp, BranchCond, DecodeError, Instr, LoadWidth, RegImmOp, RegRegOp, StoreWidth,
};
use crate::utils::interpret_u32_as_signed;

/// One disassembled instruction
///
/// Holds the address the instruction was fetched from, the raw
/// instruction word, and the textual rendering split into mnemonic,
/// operand list and optional comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    address: u32,
    code: u32,
    mnemonic: &'static str,
    operands: Vec<String>,
    comment: Option<String>,
}

impl Instruction {
    pub fn address(&self) -> u32 {
        self.address
    }

    pub fn code(&self) -> u32 {
        self.code
    }

    pub fn mnemonic(&self) -> &'static str {
        self.mnemonic
    }

    pub fn operands(&self) -> &[String] {
        &self.operands
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}\t{}", self.mnemonic, self.operands.iter().join(","))?;
        if let Some(comment) = &self.comment {
            write!(f, " # {comment}")?;
        }
        Ok(())
    }
}

fn branch_mnemonic(cond: BranchCond) -> &'static str {
    match cond {
        BranchCond::Beq => "beq",
        BranchCond::Bne => "bne",
        BranchCond::Blt => "blt",
        BranchCond::Bge => "bge",
        BranchCond::Bltu => "bltu",
        BranchCond::Bgeu => "bgeu",
    }
}

fn load_mnemonic(width: LoadWidth) -> &'static str {
    match width {
        LoadWidth::Lb => "lb",
        LoadWidth::Lh => "lh",
        LoadWidth::Lw => "lw",
        LoadWidth::Lbu => "lbu",
        LoadWidth::Lhu => "lhu",
    }
}

fn store_mnemonic(width: StoreWidth) -> &'static str {
    match width {
        StoreWidth::Sb => "sb",
        StoreWidth::Sh => "sh",
        StoreWidth::Sw => "sw",
    }
}

fn reg_imm_mnemonic(op: RegImmOp) -> &'static str {
    match op {
        RegImmOp::Addi => "addi",
        RegImmOp::Slti => "slti",
        RegImmOp::Sltiu => "sltiu",
        RegImmOp::Xori => "xori",
        RegImmOp::Ori => "ori",
        RegImmOp::Andi => "andi",
        RegImmOp::Slli => "slli",
        RegImmOp::Srli => "srli",
        RegImmOp::Srai => "srai",
    }
}

fn reg_reg_mnemonic(op: RegRegOp) -> &'static str {
    match op {
        RegRegOp::Add => "add",
        RegRegOp::Sub => "sub",
        RegRegOp::Sll => "sll",
        RegRegOp::Slt => "slt",
        RegRegOp::Sltu => "sltu",
        RegRegOp::Xor => "xor",
        RegRegOp::Srl => "srl",
        RegRegOp::Sra => "sra",
        RegRegOp::Or => "or",
        RegRegOp::And => "and",
        RegRegOp::Mul => "mul",
        RegRegOp::Mulh => "mulh",
        RegRegOp::Mulhsu => "mulhsu",
        RegRegOp::Mulhu => "mulhu",
        RegRegOp::Div => "div",
        RegRegOp::Divu => "divu",
        RegRegOp::Rem => "rem",
        RegRegOp::Remu => "remu",
    }
}

fn amo_mnemonic(op: AmoOp) -> &'static str {
    match op {
        AmoOp::Add => "amoadd.w",
        AmoOp::Swap => "amoswap.w",
        AmoOp::Xor => "amoxor.w",
        AmoOp::Or => "amoor.w",
        AmoOp::And => "amoand.w",
        AmoOp::Min => "amomin.w",
        AmoOp::Max => "amomax.w",
        AmoOp::Minu => "amominu.w",
        AmoOp::Maxu => "amomaxu.w",
    }
}

/// The i_immediate of the comparison and logical immediates is
/// rendered the way the value takes part in the operation: signed
/// for addi/slti, unsigned for sltiu and the bitwise group, and as
/// the plain shift amount for the shifts
fn reg_imm_operand(op: RegImmOp, i_immediate: u32) -> String {
    match op {
        RegImmOp::Addi | RegImmOp::Slti => format!("{}", interpret_u32_as_signed(i_immediate)),
        RegImmOp::Sltiu | RegImmOp::Xori | RegImmOp::Ori | RegImmOp::Andi => {
            format!("{i_immediate}")
        }
        RegImmOp::Slli | RegImmOp::Srli | RegImmOp::Srai => format!("{i_immediate}"),
    }
}

/// Disassemble the instruction word fetched from address
///
/// Returns an error for words outside the implemented instruction
/// sets; nothing else can fail.
pub fn disassemble(address: u32, code: u32) -> Result<Instruction, DecodeError> {
    let instr = Instr::decode(code)?;

    let (mnemonic, operands, comment) = match instr {
        Instr::Lui { dest, u_immediate } => (
            "lui",
            vec![
                abi_name(dest).to_string(),
                format!("0x{:x}", u_immediate >> 12),
            ],
            None,
        ),
        Instr::Auipc { dest, u_immediate } => (
            "auipc",
            vec![
                abi_name(dest).to_string(),
                format!("0x{:x}", u_immediate >> 12),
            ],
            None,
        ),
        Instr::Jal { dest, offset } => (
            "jal",
            vec![
                abi_name(dest).to_string(),
                format!("{}", interpret_u32_as_signed(offset)),
            ],
            Some(format!("{:x}", address.wrapping_add(offset))),
        ),
        Instr::Jalr { dest, base, offset } => {
            let comment = if dest == 0 && base == 1 && offset == 0 {
                Some("ret".to_string())
            } else {
                None
            };
            (
                "jalr",
                vec![
                    abi_name(dest).to_string(),
                    format!("{}({})", interpret_u32_as_signed(offset), abi_name(base)),
                ],
                comment,
            )
        }
        Instr::Branch {
            cond,
            src1,
            src2,
            offset,
        } => (
            branch_mnemonic(cond),
            vec![
                abi_name(src1).to_string(),
                abi_name(src2).to_string(),
                format!("{}", interpret_u32_as_signed(offset)),
            ],
            Some(format!("{:x}", address.wrapping_add(offset))),
        ),
        Instr::Load {
            width,
            dest,
            base,
            offset,
        } => (
            load_mnemonic(width),
            vec![
                abi_name(dest).to_string(),
                format!("{}({})", interpret_u32_as_signed(offset), abi_name(base)),
            ],
            None,
        ),
        Instr::Store {
            width,
            src,
            base,
            offset,
        } => (
            store_mnemonic(width),
            vec![
                abi_name(src).to_string(),
                format!("{}({})", interpret_u32_as_signed(offset), abi_name(base)),
            ],
            None,
        ),
        Instr::RegImm {
            op,
            dest,
            src,
            i_immediate,
        } => (
            reg_imm_mnemonic(op),
            vec![
                abi_name(dest).to_string(),
                abi_name(src).to_string(),
                reg_imm_operand(op, i_immediate),
            ],
            None,
        ),
        Instr::RegReg {
            op,
            dest,
            src1,
            src2,
        } => (
            reg_reg_mnemonic(op),
            vec![
                abi_name(dest).to_string(),
                abi_name(src1).to_string(),
                abi_name(src2).to_string(),
            ],
            None,
        ),
        Instr::Amo {
            op,
            dest,
            addr,
            src,
        } => (
            amo_mnemonic(op),
            vec![
                abi_name(dest).to_string(),
                abi_name(src).to_string(),
                format!("({})", abi_name(addr)),
            ],
            None,
        ),
        Instr::LoadReserved { dest, addr } => (
            "lr.w",
            vec![
                abi_name(dest).to_string(),
                format!("({})", abi_name(addr)),
            ],
            None,
        ),
        Instr::StoreConditional { dest, addr, src } => (
            "sc.w",
            vec![
                abi_name(dest).to_string(),
                abi_name(src).to_string(),
                format!("({})", abi_name(addr)),
            ],
            None,
        ),
    };

    Ok(Instruction {
        address,
        code,
        mnemonic,
        operands,
        comment,
    })
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::encode::*;

    fn listing(address: u32, code: u32) -> String {
        disassemble(address, code).unwrap().to_string()
    }

    #[test]
    fn check_load_store_syntax() {
        assert_eq!(listing(0x8000_0000, lw(11, 2, 0)), "lw\ta1,0(sp)");
        assert_eq!(listing(0x8000_0000, lb(1, 10, -1)), "lb\tra,-1(a0)");
        assert_eq!(listing(0x8000_0000, sw(10, 2, -4)), "sw\ta0,-4(sp)");
        assert_eq!(listing(0x8000_0000, sh(7, 8, 18)), "sh\tt2,18(s0)");
    }

    #[test]
    fn check_lhu_mnemonic() {
        assert_eq!(listing(0x8000_0000, lhu(3, 10, 4)), "lhu\tgp,4(a0)");
    }

    #[test]
    fn check_branch_comment_holds_target() {
        assert_eq!(
            listing(0x8000_0004, beq(0, 0, -4)),
            "beq\tzero,zero,-4 # 80000000"
        );
        assert_eq!(
            listing(0x8000_0000, bgeu(28, 29, 16)),
            "bgeu\tt3,t4,16 # 80000010"
        );
    }

    #[test]
    fn check_jal_comment_holds_target() {
        assert_eq!(listing(0x8000_0010, jal(1, -16)), "jal\tra,-16 # 80000000");
    }

    #[test]
    fn check_jalr_ret_pattern() {
        assert_eq!(listing(0x8000_0000, jalr(0, 1, 0)), "jalr\tzero,0(ra) # ret");
        // Any other operand combination is not a ret
        assert_eq!(listing(0x8000_0000, jalr(1, 1, 0)), "jalr\tra,0(ra)");
        assert_eq!(listing(0x8000_0000, jalr(0, 1, 4)), "jalr\tzero,4(ra)");
        assert_eq!(listing(0x8000_0000, jalr(0, 5, 0)), "jalr\tzero,0(t0)");
    }

    #[test]
    fn check_upper_immediates_render_hex() {
        assert_eq!(listing(0x8000_0000, lui(10, 0x12345)), "lui\ta0,0x12345");
        assert_eq!(listing(0x8000_0000, auipc(4, 0x800)), "auipc\ttp,0x800");
    }

    #[test]
    fn check_reg_imm_immediate_signedness() {
        assert_eq!(listing(0x8000_0000, addi(10, 10, -25)), "addi\ta0,a0,-25");
        assert_eq!(listing(0x8000_0000, slti(5, 6, -1)), "slti\tt0,t1,-1");
        // The unsigned-comparison and bitwise immediates render as
        // the unsigned value they take part in the operation as
        assert_eq!(
            listing(0x8000_0000, sltiu(5, 6, -1)),
            "sltiu\tt0,t1,4294967295"
        );
        assert_eq!(
            listing(0x8000_0000, andi(5, 6, -16)),
            "andi\tt0,t1,4294967280"
        );
        assert_eq!(listing(0x8000_0000, srai(1, 2, 4)), "srai\tra,sp,4");
    }

    #[test]
    fn check_reg_reg_syntax() {
        assert_eq!(listing(0x8000_0000, add(1, 2, 3)), "add\tra,sp,gp");
        assert_eq!(listing(0x8000_0000, mulhsu(4, 5, 6)), "mulhsu\ttp,t0,t1");
        assert_eq!(listing(0x8000_0000, remu(18, 19, 20)), "remu\ts2,s3,s4");
    }

    #[test]
    fn check_amo_syntax() {
        assert_eq!(
            listing(0x8000_0000, amoadd_w(3, 4, 5)),
            "amoadd.w\tgp,tp,(t0)"
        );
        assert_eq!(
            listing(0x8000_0000, amomaxu_w(10, 11, 12)),
            "amomaxu.w\ta0,a1,(a2)"
        );
        assert_eq!(listing(0x8000_0000, lr_w(5, 10)), "lr.w\tt0,(a0)");
        assert_eq!(listing(0x8000_0000, sc_w(6, 7, 10)), "sc.w\tt1,t2,(a0)");
    }

    #[test]
    fn check_invalid_word_is_an_error() {
        assert!(disassemble(0x8000_0000, 0xffff_ffff).is_err());
    }
}
