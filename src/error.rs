use std::path::PathBuf;

use thiserror::Error;

use crate::alu::ALUOp;

/// Top-level error type for the simulator
#[derive(Error, Debug)]
pub enum SimulatorError {
    #[error("Failed to load image: {0}")]
    ImageError(#[from] ImageError),

    #[error("CPU execution error: {0}")]
    ExecutionError(#[from] ExecutionError),

    #[error("Memory error: {0}")]
    MemoryError(#[from] MemoryError),

    #[error("Cycle {cycle} failed: {source}")]
    CycleFailed {
        cycle: u64,
        #[source]
        source: Box<SimulatorError>,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

impl SimulatorError {
    /// Strips any cycle wrapper and returns the underlying failure
    pub fn root(&self) -> &SimulatorError {
        match self {
            SimulatorError::CycleFailed { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Errors related to the instruction image
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Failed to read image file '{0}': {1}")]
    FileReadError(PathBuf, #[source] std::io::Error),

    #[error("Image of {0} bytes does not fit into {1} bytes of memory")]
    TooLarge(usize, usize),
}

/// Errors related to CPU execution
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Invalid ALU control: class {op:?}, funct {funct:#04x}, instruction {raw_inst:#010x}")]
    InvalidAluControl { op: ALUOp, funct: u32, raw_inst: u32 },

    #[error("Invalid register write target: {0}")]
    InvalidRegister(u32),

    #[error("Execution limit reached: {0} cycles")]
    ExecutionLimitReached(u64),

    #[error("Branch resolved at PC={0:#010x} without an outstanding prediction")]
    OrphanBranchResolution(u32),
}

/// Errors related to memory operations
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Memory access error at address {address:#010x}: {kind}")]
    AccessError { address: u32, kind: MemoryErrorKind },
}

/// Specific kinds of memory errors
#[derive(Error, Debug, PartialEq)]
pub enum MemoryErrorKind {
    #[error("Attempted to access data outside addressable range")]
    OutOfBounds,

    #[error("Attempted to fetch an instruction outside addressable range")]
    FetchOutOfBounds,
}

/// Type alias for Result with SimulatorError
pub type SimulatorResult<T> = Result<T, SimulatorError>;
