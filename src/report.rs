//! End-of-run reporting: statistics block and register dump

use std::fmt;
use std::path::Path;

use crate::cpu::CPUHistory;
use crate::cpu::RegisterFile;
use crate::cpu::REGISTER_NAMES;
use crate::error::SimulatorResult;

/// Registers written during the run, e.g.
/// `$t0(8): 0x0000000a(10), $ra(31): ...`, or `None`
pub fn used_registers(gpr: &RegisterFile) -> String {
    let used: Vec<String> = (0..32)
        .filter(|&index| gpr.is_used(index))
        .map(|index| {
            let value = gpr.read(index);
            format!(
                "{}({}): {:#010x}({})",
                REGISTER_NAMES[index as usize], index, value, value as i32
            )
        })
        .collect();

    if used.is_empty() {
        "None".to_string()
    } else {
        used.join(", ")
    }
}

/// Human-readable statistics block
pub struct Stats<'a> {
    history: &'a CPUHistory,
    gpr: &'a RegisterFile,
}

impl<'a> Stats<'a> {
    pub fn new(history: &'a CPUHistory, gpr: &'a RegisterFile) -> Self {
        Self { history, gpr }
    }
}

impl fmt::Display for Stats<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let history = self.history;
        let accuracy = match history.resolved_branch_count() {
            0 => 0.0,
            n => history.branch_hit_count as f64 * 100.0 / n as f64,
        };

        writeln!(f, "-------==[ Stats ]==-------")?;
        writeln!(f, "- Used Register Values:\n  {}", used_registers(self.gpr))?;
        writeln!(f, "- Total Execution Clocks: {}", history.cycle_count)?;
        writeln!(f, "- Total 'R' Type Instructions: {}", history.r_type_count)?;
        writeln!(f, "- Total 'I' Type Instructions: {}", history.i_type_count)?;
        writeln!(f, "- Total 'J' Type Instructions: {}", history.j_type_count)?;
        writeln!(f, "- Total Branch Prediction HITs: {}", history.branch_hit_count)?;
        writeln!(
            f,
            "- Total Branch Prediction MISSes: {} ({:.2}% accuracy)",
            history.branch_miss_count, accuracy
        )?;
        writeln!(f, "- Total Memory Access (RW): {}", history.mem_access_count)?;
        writeln!(f, "- Total Jumps: {}", history.jump_count)?;
        writeln!(f, "- Total Stall Cycles: {}", history.stall_count)?;
        writeln!(f, "- Total Forwarded Operands: {}", history.forward_count)?;
        writeln!(f, "- CPI: {:.3}", history.cpi())
    }
}

/// `index:hex-value` pairs for all 32 registers, newline-terminated
pub fn register_dump(gpr: &RegisterFile) -> String {
    let mut out: String = gpr
        .values()
        .iter()
        .enumerate()
        .map(|(index, value)| format!("{}:{:#010x},", index, value))
        .collect();
    out.push('\n');
    out
}

/// Writes the register dump to `path`, replacing its contents
pub fn store_results(path: &Path, gpr: &RegisterFile) -> SimulatorResult<()> {
    std::fs::write(path, register_dump(gpr))?;
    Ok(())
}
