//! Utility functions for preparing the CPU and memory for execution

use std::path::Path;

use tracing::info;
use tracing::warn;

use crate::cpu::CPUState;
use crate::cpu::RA;
use crate::cpu::SENTINEL_ADDRESS;
use crate::cpu::SP;
use crate::error::ImageError;
use crate::error::SimulatorResult;
use crate::memory::Memory;
use crate::memory::MEMORY_SIZE;

/// Initial stack pointer: the top of memory
pub const STACK_BASE: u32 = MEMORY_SIZE as u32;

/// Reads a raw image file
pub fn read_image(path: &Path) -> SimulatorResult<Vec<u8>> {
    let image = std::fs::read(path)
        .map_err(|e| ImageError::FileReadError(path.to_path_buf(), e))?;
    info!("read {} bytes from '{}'", image.len(), path.display());
    Ok(image)
}

/// Initializes $sp and the sentinel return address
pub fn set_stack(cpu: &mut CPUState) {
    cpu.gpr.preset(SP, STACK_BASE);
    cpu.gpr.preset(RA, SENTINEL_ADDRESS);
}

/// Loads an image at address 0 and resets the CPU to run it
pub fn load_image(
    cpu: &mut CPUState,
    mem: &mut Memory,
    image: &[u8],
) -> SimulatorResult<()> {
    if image.len() % 4 != 0 {
        warn!("image length {} is not a whole number of words", image.len());
    }

    mem.load_image(image)?;
    set_stack(cpu);
    cpu.pc.write(0);

    if cpu.policy.verbose {
        eprintln!("[VERBOSE] Loaded {} instructions", image.len() / 4);
    }

    Ok(())
}
