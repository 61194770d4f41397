//! Data hazard handling: either stall decode, or forward results
//! into the operands the next EX stage will see

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use super::pipeline::PipelineState;
use super::pipeline::Stage;
use crate::error::SimulatorError;

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum HazardPolicy {
    /// Bubble IF and ID until the producer has written back
    #[default]
    Stall,
    /// Bypass EX/MEM and MEM/WB results
    Forward,
}

impl fmt::Display for HazardPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HazardPolicy::Stall => write!(f, "stall"),
            HazardPolicy::Forward => write!(f, "forward"),
        }
    }
}

impl FromStr for HazardPolicy {
    type Err = SimulatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stall" => Ok(HazardPolicy::Stall),
            "forward" => Ok(HazardPolicy::Forward),
            _ => Err(SimulatorError::ConfigError(format!(
                "unknown hazard policy '{}'",
                s
            ))),
        }
    }
}

/// Read-after-write hazard seen from the current pipeline registers
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StallCause {
    /// Stage holding the producer
    pub producer: Stage,
    pub register: u32,
}

/// Checks whether the instruction in ID reads a register that the
/// instruction in EX or MEM has yet to write back. The stall repeats
/// until the producer reaches WB, whose result decode then reads.
pub fn detect_stall(current: &PipelineState) -> Option<StallCause> {
    let (rs, rt) = current.id_sources()?;

    let producers = [
        (Stage::Execute, current.ex_write_target()),
        (Stage::Memory, current.mem_write_target()),
    ];

    producers.into_iter().find_map(|(producer, target)| match target {
        Some(register) if register != 0 && (register == rs || register == rt) => {
            Some(StallCause { producer, register })
        }
        _ => None,
    })
}

/// Which operand of ID/EX received a forwarded value
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Operand {
    Rs,
    Rt,
}

/// One forwarded value
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Forwarding {
    pub operand: Operand,
    pub register: u32,
    /// Stage of the producer when the value was taken
    pub source: Stage,
    pub value: u32,
}

impl fmt::Display for Forwarding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} <- r[{}] = {:#010x} from {}",
            self.operand, self.register, self.value, self.source
        )
    }
}

/// Overwrites stale operands in `next.id_ex` with results produced this
/// cycle. The EX/MEM result wins over the MEM/WB one.
///
/// A load sitting in EX/MEM only carries its address, so a load
/// immediately followed by a use of its result is not covered; the
/// program has to schedule an independent instruction in between.
pub fn forward(next: &mut PipelineState) -> Vec<Forwarding> {
    let (rs, rt) = next.id_ex.inst.source_registers();
    let mut forwarded = Vec::new();

    for (operand, register) in [(Operand::Rs, rs), (Operand::Rt, rt)] {
        if register == 0 || next.id_ex.controls == Default::default() {
            continue;
        }

        let ex_mem = &next.ex_mem;
        let mem_wb = &next.mem_wb;
        let found = if ex_mem.controls.reg_write && ex_mem.write_target == register {
            Some((Stage::Execute, ex_mem.alu_result))
        } else if mem_wb.controls.reg_write && mem_wb.write_target == register {
            Some((Stage::Memory, mem_wb.write_back_value()))
        } else {
            None
        };

        if let Some((source, value)) = found {
            match operand {
                Operand::Rs => next.id_ex.read_data_1 = value,
                Operand::Rt => next.id_ex.read_data_2 = value,
            }
            let forwarding = Forwarding { operand, register, source, value };
            debug!("forwarding {}", forwarding);
            forwarded.push(forwarding);
        }
    }

    forwarded
}
