//! MIPS CPU state

use crate::error::ExecutionError;
use crate::error::SimulatorResult;
use crate::instruction::Format;
use crate::pipelined::branch_predictor::PredictorHeuristic;
use crate::pipelined::hazard::HazardPolicy;

/// Return address that marks the end of the program
pub const SENTINEL_ADDRESS: u32 = 0xffff_ffff;

/// Default cycle limit
pub const DEFAULT_MAX_CYCLES: u64 = 10_000_000;

/// Register index of $sp
pub const SP: u32 = 29;
/// Register index of $ra
pub const RA: u32 = 31;

/// ABI names, indexed by register number
pub const REGISTER_NAMES: [&str; 32] = [
    "$zero", "$at", "$v0", "$v1", "$a0", "$a1", "$a2", "$a3", "$t0", "$t1",
    "$t2", "$t3", "$t4", "$t5", "$t6", "$t7", "$s0", "$s1", "$s2", "$s3",
    "$s4", "$s5", "$s6", "$s7", "$t8", "$t9", "$k0", "$k1", "$gp", "$sp",
    "$fp", "$ra",
];

/// CPU state
#[derive(Clone, Debug)]
pub struct CPUState {
    /// Program counter
    pub pc: Register,
    /// General purpose registers
    pub gpr: RegisterFile,
    /// hi/lo pair written by mult
    pub accumulator: Accumulator,

    /// CPU policy
    pub policy: CPUPolicy,

    /// History of execution
    pub history: CPUHistory,
}

impl CPUState {
    pub fn make(policy: CPUPolicy) -> Self {
        Self {
            pc: Register::new(0),
            gpr: RegisterFile::default(),
            accumulator: Accumulator::default(),
            policy,
            history: CPUHistory::default(),
        }
    }

    /// Increments history cycle count
    pub fn update_cycle_count(&mut self, value: u64) {
        self.history.cycle_count += value;
    }
}

/// A single 32-bit register
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Register {
    /// Current data in the register
    data: u32,
}

impl Register {
    pub fn new(data: u32) -> Self {
        Self { data }
    }

    /// Reads the register
    pub fn read(&self) -> u32 {
        self.data
    }

    /// Writes to register
    pub fn write(&mut self, value: u32) {
        self.data = value;
    }
}

/// 32 general purpose registers; $zero is hard-wired
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RegisterFile {
    regs: [Register; 32],
    /// Bit i is set once register i has been written by an instruction
    used: u32,
}

impl RegisterFile {
    /// Reads a register; $zero and out-of-range indices read as zero
    pub fn read(&self, index: u32) -> u32 {
        match index {
            1..=31 => self.regs[index as usize].read(),
            _ => 0,
        }
    }

    /// Architectural write. Writes to $zero are dropped.
    pub fn write(&mut self, index: u32, value: u32) -> SimulatorResult<()> {
        match index {
            0 => Ok(()),
            1..=31 => {
                self.regs[index as usize].write(value);
                self.used |= 1 << index;
                Ok(())
            }
            _ => Err(ExecutionError::InvalidRegister(index).into()),
        }
    }

    /// Sets a register at reset time without marking it used
    pub fn preset(&mut self, index: u32, value: u32) {
        if (1..=31).contains(&index) {
            self.regs[index as usize].write(value);
        }
    }

    /// Whether an instruction has written this register
    pub fn is_used(&self, index: u32) -> bool {
        index < 32 && self.used & (1 << index) != 0
    }

    /// Snapshot of all 32 values
    pub fn values(&self) -> [u32; 32] {
        let mut values = [0; 32];
        for (index, value) in values.iter_mut().enumerate() {
            *value = self.read(index as u32);
        }
        values
    }
}

/// hi/lo pair
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Accumulator {
    pub hi: u32,
    pub lo: u32,
}

/// CPU policy
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CPUPolicy {
    pub verbose: bool,
    pub hazard: HazardPolicy,
    pub heuristic: PredictorHeuristic,
    pub max_cycles: u64,
}

impl Default for CPUPolicy {
    fn default() -> Self {
        Self {
            verbose: false,
            hazard: HazardPolicy::default(),
            heuristic: PredictorHeuristic::default(),
            max_cycles: DEFAULT_MAX_CYCLES,
        }
    }
}

/// History module
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CPUHistory {
    pub cycle_count: u64,
    pub r_type_count: u64,
    pub i_type_count: u64,
    pub j_type_count: u64,
    pub branch_hit_count: u64,
    pub branch_miss_count: u64,
    pub mem_access_count: u64,
    pub jump_count: u64,
    pub stall_count: u64,
    pub forward_count: u64,
}

impl CPUHistory {
    /// Counts a decoded instruction by format
    pub fn record_format(&mut self, format: Format) {
        match format {
            Format::R => self.r_type_count += 1,
            Format::I => self.i_type_count += 1,
            Format::J => self.j_type_count += 1,
        }
    }

    pub fn instruction_count(&self) -> u64 {
        self.r_type_count + self.i_type_count + self.j_type_count
    }

    pub fn resolved_branch_count(&self) -> u64 {
        self.branch_hit_count + self.branch_miss_count
    }

    /// Cycles per decoded instruction
    pub fn cpi(&self) -> f64 {
        match self.instruction_count() {
            0 => 0.0,
            count => self.cycle_count as f64 / count as f64,
        }
    }
}
