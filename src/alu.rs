//! ALU implementation

use tracing::debug;

use crate::cpu::Accumulator;
use crate::error::ExecutionError;
use crate::error::SimulatorResult;
use crate::instruction::Function;
use crate::instruction::Instruction;

/// Result of one ALU operation
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ALUOutput {
    pub result: u32,
    /// Inverted for bne, so that "zero" always means "branch taken"
    pub zero: bool,
    /// New hi/lo pair, only produced by mult
    pub accumulator: Option<Accumulator>,
}

/// Derives the ALU control code from the 2-bit operation class
/// and the instruction's function
pub fn alu_control(op: ALUOp, inst: &Instruction) -> SimulatorResult<ALUControl> {
    use Function::*;

    let control = match op {
        ALUOp::ADD => Some(ALUControl::ADD),
        ALUOp::SUB => Some(ALUControl::SUB),
        ALUOp::FUNCT => match inst.function {
            ADD | ADDU | JR => Some(ALUControl::ADD),
            SUB | SUBU => Some(ALUControl::SUB),
            AND => Some(ALUControl::AND),
            OR => Some(ALUControl::OR),
            NOR => Some(ALUControl::NOR),
            SLT => Some(ALUControl::SLT),
            SLTU => Some(ALUControl::SLTU),
            SLL => Some(ALUControl::SLL),
            SRL => Some(ALUControl::SRL),
            MULT => Some(ALUControl::MULT),
            MFHI => Some(ALUControl::MFHI),
            MFLO => Some(ALUControl::MFLO),
            _ => None,
        },
        ALUOp::IMM => match inst.function {
            ANDI => Some(ALUControl::AND),
            ORI => Some(ALUControl::OR),
            SLTI => Some(ALUControl::SLT),
            SLTIU => Some(ALUControl::SLTU),
            LUI => Some(ALUControl::LUI),
            _ => None,
        },
    };

    control.ok_or_else(|| {
        ExecutionError::InvalidAluControl {
            op,
            funct: inst.attributes.funct,
            raw_inst: inst.raw_inst,
        }
        .into()
    })
}

/// Performs an atomic ALU operation.
/// `accumulator` is the hi/lo pair visible to mfhi/mflo.
pub fn alu(
    control: ALUControl,
    inst: &Instruction,
    op1: u32,
    op2: u32,
    accumulator: Accumulator,
) -> ALUOutput {
    let shamt = inst.attributes.shamt;
    let mut product = None;

    let result = match control {
        ALUControl::AND => op1 & op2,
        ALUControl::OR => op1 | op2,
        ALUControl::ADD => op1.wrapping_add(op2),
        ALUControl::SLL => op2 << shamt,
        ALUControl::SRL => op2 >> shamt,
        ALUControl::LUI => op2 << 16,
        ALUControl::SUB => op1.wrapping_sub(op2),
        ALUControl::SLT => ((op1 as i32) < (op2 as i32)) as u32,
        ALUControl::SLTU => (op1 < op2) as u32,
        ALUControl::MULT => {
            let wide = (op1 as i32 as i64) * (op2 as i32 as i64);
            product = Some(Accumulator {
                hi: (wide >> 32) as u32,
                lo: wide as u32,
            });
            0
        }
        ALUControl::MFHI => accumulator.hi,
        ALUControl::MFLO => accumulator.lo,
        ALUControl::NOR => !(op1 | op2),
    };

    let mut zero = result == 0;
    if inst.function == Function::BNE {
        zero = !zero;
    }

    debug!(
        "ALU {:?} ({:#06b}): {:#010x}, {:#010x} -> {:#010x}, zero = {}",
        control, control as u8, op1, op2, result, zero
    );

    ALUOutput { result, zero, accumulator: product }
}

/// Selector for ALU src2 input
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum ALUSrc {
    // From register
    #[default]
    REG,
    // From extended immediate
    IMM,
}

/// 2-bit ALU operation class produced by the decoder
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum ALUOp {
    /// Address arithmetic and addi
    #[default]
    ADD = 0b00,
    /// Branch comparison
    SUB = 0b01,
    /// Decided by funct
    FUNCT = 0b10,
    /// Decided by the immediate opcode
    IMM = 0b11,
}

/// ALU control codes
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ALUControl {
    AND = 0b0000,
    OR = 0b0001,
    ADD = 0b0010,
    SLL = 0b0011,
    SRL = 0b0100,
    LUI = 0b0101,
    SUB = 0b0110,
    SLT = 0b0111,
    SLTU = 0b1000,
    MULT = 0b1001,
    MFHI = 0b1010,
    MFLO = 0b1011,
    NOR = 0b1100,
}
