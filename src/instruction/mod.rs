//! Instruction representation

use std::fmt;

use crate::alu::ALUOp;
use crate::alu::ALUSrc;
use crate::cpu::REGISTER_NAMES;

pub mod decode_helper;
#[cfg(test)]
pub(crate) mod encode;

/// NOP: SLL $zero, $zero, 0
pub(crate) const NOP: u32 = 0;

/// Wrapped instruction
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Instruction {
    /// Raw representation
    pub raw_inst: u32,
    /// Opcode
    pub opcode: Opcode,
    /// Format
    pub format: Format,
    /// Function
    pub function: Function,
    /// Subfields
    pub attributes: Attributes,
    /// Control signals
    pub controls: Controls,
}

impl Instruction {
    /// Decodes a raw word. Every word decodes to something;
    /// unknown opcodes come out with all control signals disabled.
    pub fn new(raw_inst: u32) -> Self {
        let opcode = decode_helper::raw_to_opcode(raw_inst);
        let format = decode_helper::opcode_to_format(opcode);

        let mut inst = Self {
            raw_inst,
            opcode,
            format,
            function: Function::default(),
            attributes: Attributes::default(),
            controls: Controls::default(),
        };

        decode_helper::parse(&mut inst);
        inst
    }

    /// beq or bne
    pub fn is_conditional_branch(&self) -> bool {
        matches!(self.opcode, Opcode::Beq | Opcode::Bne)
    }

    /// Registers read as (rs, rt); 0 where the field is not a source
    pub fn source_registers(&self) -> (u32, u32) {
        use Opcode::*;

        let rs = match self.opcode {
            J | Jal | Lui | Unknown(_) => 0,
            _ => self.attributes.rs,
        };
        let rt = match self.opcode {
            Special | Beq | Bne | Sw => self.attributes.rt,
            _ => 0,
        };
        (rs, rt)
    }
}

impl Default for Instruction {
    fn default() -> Self {
        Self::new(NOP)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Function::*;

        let name = |index: u32| REGISTER_NAMES[(index & 0x1f) as usize];
        let Attributes { rs, rt, rd, shamt, imm, target, .. } = self.attributes;
        let mnemonic = format!("{:?}", self.function).to_lowercase();

        match self.function {
            SLL if self.raw_inst == NOP => write!(f, "nop"),
            ADD | ADDU | SUB | SUBU | AND | OR | NOR | SLT | SLTU => {
                write!(f, "{mnemonic} {}, {}, {}", name(rd), name(rs), name(rt))
            }
            SLL | SRL => {
                write!(f, "{mnemonic} {}, {}, {shamt}", name(rd), name(rt))
            }
            JR => write!(f, "jr {}", name(rs)),
            MULT => write!(f, "mult {}, {}", name(rs), name(rt)),
            MFHI | MFLO => write!(f, "{mnemonic} {}", name(rd)),
            ADDI | ADDIU | SLTI | SLTIU => {
                write!(f, "{mnemonic} {}, {}, {}", name(rt), name(rs), imm as i32)
            }
            ANDI | ORI => {
                write!(f, "{mnemonic} {}, {}, {imm:#x}", name(rt), name(rs))
            }
            LUI => write!(f, "lui {}, {:#x}", name(rt), imm & 0xffff),
            LW | SW => {
                write!(f, "{mnemonic} {}, {}({})", name(rt), imm as i32, name(rs))
            }
            BEQ | BNE => {
                write!(f, "{mnemonic} {}, {}, {}", name(rs), name(rt), imm as i32)
            }
            J | JAL => write!(f, "{mnemonic} {:#x}", target << 2),
            UNKNOWN => write!(f, "unknown ({:#010x})", self.raw_inst),
        }
    }
}

/// MIPS primary opcode
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Opcode {
    /// R-type, selected by funct
    Special,
    J,
    Jal,
    Beq,
    Bne,
    Addi,
    Addiu,
    Slti,
    Sltiu,
    Andi,
    Ori,
    Lui,
    Lw,
    Sw,
    Unknown(u32),
}

/// MIPS instruction format
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Format {
    R,
    I,
    J,
}

/// MIPS function (mnemonic)
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum Function {
    ADD,
    ADDU,
    SUB,
    SUBU,
    AND,
    OR,
    NOR,
    SLT,
    SLTU,
    #[default]
    SLL,
    SRL,
    JR,
    MULT,
    MFHI,
    MFLO,
    ADDI,
    ADDIU,
    SLTI,
    SLTIU,
    ANDI,
    ORI,
    LUI,
    LW,
    SW,
    BEQ,
    BNE,
    J,
    JAL,
    UNKNOWN,
}

/// Instruction fields. Every field is extracted regardless of format;
/// `imm` is already extended to 32 bits.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Attributes {
    pub rs: u32,
    pub rt: u32,
    pub rd: u32,
    pub shamt: u32,
    pub funct: u32,
    pub imm: u32,
    pub target: u32,
}

/// Selector for the register written back
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum RegDst {
    #[default]
    Rt,
    Rd,
    /// $ra, for jal
    Ra,
}

impl RegDst {
    /// Resolves the write target for the given fields
    pub fn select(&self, attributes: &Attributes) -> u32 {
        match self {
            RegDst::Rt => attributes.rt,
            RegDst::Rd => attributes.rd,
            RegDst::Ra => 31,
        }
    }
}

/// Control signals; the default is the disabled bundle
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Controls {
    pub reg_dst: RegDst,
    pub alu_src: ALUSrc,
    pub mem_to_reg: bool,
    pub reg_write: bool,
    pub mem_read: bool,
    pub mem_write: bool,
    pub branch: bool,
    pub jump: bool,
    pub alu_op: ALUOp,
}
