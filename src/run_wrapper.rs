//! A simulator wrapper

use std::path::Path;

use crate::cpu::CPUPolicy;
use crate::cpu::CPUState;
use crate::error::SimulatorResult;
use crate::loader;
use crate::memory::Memory;
use crate::pipelined::Pipeline;

/// Run simulation on the given image file
/// and return the final CPU state
pub fn run(image_file: &Path, policy: CPUPolicy) -> SimulatorResult<CPUState> {
    let image = loader::read_image(image_file)?;
    run_image(&image, policy)
}

/// Run simulation on an in-memory image.
/// The per-cycle trace goes to stdout when the policy is verbose.
pub fn run_image(image: &[u8], policy: CPUPolicy) -> SimulatorResult<CPUState> {
    let mut cpu = CPUState::make(policy);
    let mut mem = Memory::make();
    loader::load_image(&mut cpu, &mut mem, image)?;

    let mut pipeline = Pipeline::new(cpu, mem);
    pipeline.run(|trace| {
        if policy.verbose {
            print!("{}", trace);
        }
    })?;

    Ok(pipeline.cpu)
}
