//! Human-readable per-cycle trace

use std::fmt;

use super::pipeline::Stage;

/// Everything that happened in one cycle, in stage order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CycleTrace {
    pub cycle: u64,
    /// PC at the start of the cycle
    pub pc: u32,
    lines: Vec<String>,
}

impl CycleTrace {
    pub fn new(cycle: u64, pc: u32) -> Self {
        Self { cycle, pc, lines: Vec::new() }
    }

    /// Line attributed to a stage
    pub fn stage(&mut self, stage: Stage, message: impl fmt::Display) {
        self.lines.push(format!("[{}] {}", stage, message));
    }

    /// Line attributed to a pipeline-wide event such as a flush
    pub fn note(&mut self, tag: &str, message: impl fmt::Display) {
        self.lines.push(format!("[{}] {}", tag, message));
    }

    /// Whether any line contains `needle`
    #[cfg(test)]
    pub(crate) fn mentions(&self, needle: &str) -> bool {
        self.lines.iter().any(|line| line.contains(needle))
    }
}

impl fmt::Display for CycleTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[PC: {:#010x}, CYCLE: {}]", self.pc, self.cycle)?;
        for line in &self.lines {
            writeln!(f, "  {}", line)?;
        }
        Ok(())
    }
}
