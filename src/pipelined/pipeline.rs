//! Pipeline state
use std::fmt;

use crate::cpu::Accumulator;
use crate::instruction::Controls;
use crate::instruction::Instruction;

/// Pipeline state = 4 pipeline registers
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PipelineState {
    pub if_id: IFIDRegister,
    pub id_ex: IDEXRegister,
    pub ex_mem: EXMEMRegister,
    pub mem_wb: MEMWBRegister,
}

impl PipelineState {
    /// Register written by the instruction now in EX, if any
    pub fn ex_write_target(&self) -> Option<u32> {
        let controls = self.id_ex.controls;
        controls
            .reg_write
            .then(|| controls.reg_dst.select(&self.id_ex.inst.attributes))
    }

    /// Register written by the instruction now in MEM, if any
    pub fn mem_write_target(&self) -> Option<u32> {
        self.ex_mem.controls.reg_write.then_some(self.ex_mem.write_target)
    }

    /// Source registers of the instruction now in ID
    pub fn id_sources(&self) -> Option<(u32, u32)> {
        if !self.if_id.valid {
            return None;
        }
        Some(Instruction::new(self.if_id.raw_inst).source_registers())
    }

    /// Nullifies every register younger than MEM
    pub fn flush(&mut self) {
        self.if_id = IFIDRegister::default();
        self.id_ex = IDEXRegister::default();
        self.ex_mem = EXMEMRegister::default();
    }
}

/// IF/ID register
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct IFIDRegister {
    /// Address of the following instruction
    pub pc: u32,

    /// Raw instruction
    pub raw_inst: u32,

    /// Cleared for empty and flushed slots
    pub valid: bool,

    /// Address of a fetch that fell outside memory
    pub fetch_fault: Option<u32>,
}

impl IFIDRegister {
    /// Slot holding a successfully fetched word
    pub fn fetched(pc: u32, raw_inst: u32) -> Self {
        Self { pc, raw_inst, valid: true, fetch_fault: None }
    }
}

/// ID/EX register
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct IDEXRegister {
    /// Address of the following instruction
    pub pc: u32,

    /// Wrapped instruction
    pub inst: Instruction,

    /// Control signals; disabled for bubbles
    pub controls: Controls,

    /// Value of rs
    pub read_data_1: u32,
    /// Value of rt
    pub read_data_2: u32,

    /// Faulted fetch travelling towards MEM
    pub fetch_fault: Option<u32>,
}

/// EX/MEM register
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EXMEMRegister {
    /// Address of the following instruction
    pub pc: u32,

    /// Wrapped instruction
    pub inst: Instruction,

    pub controls: Controls,

    /// PC if branch is taken
    pub branch_target: u32,

    /// Destination of j/jal/jr
    pub jump_target: u32,

    /// Taken flag for conditional branches
    pub zero: bool,

    /// Execution result
    pub alu_result: u32,

    /// Value to store
    pub read_data_2: u32,

    /// Register to write back
    pub write_target: u32,

    /// Pending hi/lo from mult, committed in MEM
    pub accumulator: Option<Accumulator>,

    /// Faulted fetch, raised once it reaches MEM
    pub fetch_fault: Option<u32>,
}

/// MEM/WB register
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MEMWBRegister {
    /// Address of the following instruction
    pub pc: u32,

    /// Wrapped instruction
    pub inst: Instruction,

    pub controls: Controls,

    /// Loaded word
    pub read_data: u32,

    /// Execution result
    pub alu_result: u32,

    /// Register to write back
    pub write_target: u32,
}

impl MEMWBRegister {
    /// Memory-to-register mux
    pub fn write_back_value(&self) -> u32 {
        if self.controls.mem_to_reg {
            self.read_data
        } else {
            self.alu_result
        }
    }
}

/// Pipeline stages, in bit order of a `StageMask`
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Stage {
    Fetch = 0,
    Decode = 1,
    Execute = 2,
    Memory = 3,
    WriteBack = 4,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "IF",
            Stage::Decode => "ID",
            Stage::Execute => "EX",
            Stage::Memory => "MEM",
            Stage::WriteBack => "WB",
        };
        write!(f, "{}", name)
    }
}

/// One bit per stage. Bit k set in a cycle means stage k handles a
/// bubble; the mask moves one stage down the pipe every cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StageMask(u8);

impl StageMask {
    pub fn is_set(&self, stage: Stage) -> bool {
        self.0 & (1 << stage as u8) != 0
    }

    pub fn set(&mut self, stage: Stage) {
        self.0 |= 1 << stage as u8;
    }

    pub fn clear(&mut self, stage: Stage) {
        self.0 &= !(1 << stage as u8);
    }

    /// Advances one cycle; bits past WB fall off the end
    pub fn shift(&mut self) {
        self.0 = (self.0 << 1) & 0x3f;
    }

    /// Whether a bit has moved past WB
    pub fn drained(&self) -> bool {
        self.0 & (1 << 5) != 0
    }
}
