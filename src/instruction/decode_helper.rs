//! Decoding helper functions.

use super::Attributes;
use super::Controls;
use super::Format;
use super::Function;
use super::Instruction;
use super::Opcode;
use super::RegDst;

/// Sign-extends the low 16 bits
fn sign_extend_16(value: u32) -> u32 {
    value as u16 as i16 as i32 as u32
}

/// Extracts the extended immediate from an instruction.
/// Logical immediates zero-extend, everything else sign-extends.
fn get_imm_extended(inst: &Instruction) -> u32 {
    let imm = get_imm(inst.raw_inst);
    match inst.opcode {
        Opcode::Andi | Opcode::Ori => imm,
        _ => sign_extend_16(imm),
    }
}

/// Determines an instruction's mnemonic, e.g., JAL, NOR, or SLTIU
fn get_function(inst: &Instruction) -> Function {
    use Function::*;

    match inst.opcode {
        Opcode::Special => match inst.attributes.funct {
            0x00 => SLL,
            0x02 => SRL,
            0x08 => JR,
            0x10 => MFHI,
            0x12 => MFLO,
            0x18 => MULT,
            0x20 => ADD,
            0x21 => ADDU,
            0x22 => SUB,
            0x23 => SUBU,
            0x24 => AND,
            0x25 => OR,
            0x27 => NOR,
            0x2a => SLT,
            0x2b => SLTU,
            _ => UNKNOWN,
        },
        Opcode::J => J,
        Opcode::Jal => JAL,
        Opcode::Beq => BEQ,
        Opcode::Bne => BNE,
        Opcode::Addi => ADDI,
        Opcode::Addiu => ADDIU,
        Opcode::Slti => SLTI,
        Opcode::Sltiu => SLTIU,
        Opcode::Andi => ANDI,
        Opcode::Ori => ORI,
        Opcode::Lui => LUI,
        Opcode::Lw => LW,
        Opcode::Sw => SW,
        Opcode::Unknown(_) => UNKNOWN,
    }
}

/// Generates the control signals. Only the opcode is consulted, except
/// for jr which is the one R-type form that neither writes a register
/// nor falls through.
pub fn get_controls(inst: &Instruction) -> Controls {
    use Opcode::*;

    use crate::alu::ALUOp;
    use crate::alu::ALUSrc;

    if let Unknown(_) = inst.opcode {
        return Controls::default();
    }

    let is_jr = inst.function == Function::JR;

    Controls {
        reg_dst: match inst.opcode {
            Special => RegDst::Rd,
            Jal => RegDst::Ra,
            _ => RegDst::Rt,
        },
        alu_src: match inst.opcode {
            Special | Beq | Bne | J | Jal => ALUSrc::REG,
            _ => ALUSrc::IMM,
        },
        mem_to_reg: matches!(inst.opcode, Lw),
        reg_write: match inst.opcode {
            Special => !is_jr,
            Sw | Beq | Bne | J => false,
            _ => true,
        },
        mem_read: matches!(inst.opcode, Lw),
        mem_write: matches!(inst.opcode, Sw),
        branch: matches!(inst.opcode, Beq | Bne),
        jump: matches!(inst.opcode, J | Jal) || is_jr,
        alu_op: match inst.opcode {
            Special => ALUOp::FUNCT,
            Beq | Bne => ALUOp::SUB,
            Andi | Ori | Slti | Sltiu | Lui => ALUOp::IMM,
            _ => ALUOp::ADD,
        },
    }
}

/// Returns the opcode from a raw instruction
pub fn raw_to_opcode(raw_inst: u32) -> Opcode {
    match get_opcode(raw_inst) {
        0x00 => Opcode::Special,
        0x02 => Opcode::J,
        0x03 => Opcode::Jal,
        0x04 => Opcode::Beq,
        0x05 => Opcode::Bne,
        0x08 => Opcode::Addi,
        0x09 => Opcode::Addiu,
        0x0a => Opcode::Slti,
        0x0b => Opcode::Sltiu,
        0x0c => Opcode::Andi,
        0x0d => Opcode::Ori,
        0x0f => Opcode::Lui,
        0x23 => Opcode::Lw,
        0x2b => Opcode::Sw,
        other => Opcode::Unknown(other),
    }
}

/// Returns the instruction format from an opcode.
/// Unknown opcodes count as I-type.
pub fn opcode_to_format(opcode: Opcode) -> Format {
    match opcode {
        Opcode::Special => Format::R,
        Opcode::J | Opcode::Jal => Format::J,
        _ => Format::I,
    }
}

/// Fills in fields, mnemonic and control signals
pub fn parse(inst: &mut Instruction) {
    let raw_inst = inst.raw_inst;
    inst.attributes = Attributes {
        rs: get_rs(raw_inst),
        rt: get_rt(raw_inst),
        rd: get_rd(raw_inst),
        shamt: get_shamt(raw_inst),
        funct: get_funct(raw_inst),
        imm: 0,
        target: get_target(raw_inst),
    };
    inst.attributes.imm = get_imm_extended(inst);
    inst.function = get_function(inst);
    inst.controls = get_controls(inst);
}

/// Extracts opcode from a raw instruction
fn get_opcode(raw_inst: u32) -> u32 {
    raw_inst >> 26
}

/// Extracts the rs field from a raw instruction
fn get_rs(raw_inst: u32) -> u32 {
    (raw_inst >> 21) & 0x1f
}

/// Extracts the rt field from a raw instruction
fn get_rt(raw_inst: u32) -> u32 {
    (raw_inst >> 16) & 0x1f
}

/// Extracts the rd field from a raw instruction
fn get_rd(raw_inst: u32) -> u32 {
    (raw_inst >> 11) & 0x1f
}

/// Extracts the shift amount from a raw instruction
fn get_shamt(raw_inst: u32) -> u32 {
    (raw_inst >> 6) & 0x1f
}

/// Extracts funct from a raw instruction
fn get_funct(raw_inst: u32) -> u32 {
    raw_inst & 0x3f
}

/// Extracts the raw 16-bit immediate
fn get_imm(raw_inst: u32) -> u32 {
    raw_inst & 0xffff
}

/// Extracts the 26-bit jump target
fn get_target(raw_inst: u32) -> u32 {
    raw_inst & 0x03ff_ffff
}
