//! Memory structure

use crate::error::ImageError;
use crate::error::MemoryError;
use crate::error::MemoryErrorKind;
use crate::error::SimulatorResult;

/// Size of the flat memory, which also caps the image size
pub const MEMORY_SIZE: usize = 0x100_0000;

/// Word-granular memory interface used by the pipeline stages.
/// Words are stored big-endian.
pub trait StorageInterface {
    /// Reads the instruction word at `pc`
    fn fetch(&self, pc: u32) -> SimulatorResult<u32>;
    /// Data load
    fn get32(&self, address: u32) -> SimulatorResult<u32>;
    /// Data store; nothing is written on failure
    fn set32(&mut self, address: u32, value: u32) -> SimulatorResult<()>;
}

/// Flat byte-addressable memory, zero-filled at reset
#[derive(Clone, Debug, PartialEq)]
pub struct Memory {
    data: Vec<u8>,
}

impl Default for Memory {
    fn default() -> Self {
        Self::make()
    }
}

impl Memory {
    pub fn make() -> Self {
        Self { data: vec![0; MEMORY_SIZE] }
    }

    /// Copies an image to address 0
    pub fn load_image(&mut self, image: &[u8]) -> SimulatorResult<()> {
        if image.len() > self.data.len() {
            return Err(ImageError::TooLarge(image.len(), self.data.len()).into());
        }
        self.data[..image.len()].copy_from_slice(image);
        Ok(())
    }

    /// Returns the byte range of a word, or the error kind
    fn word_range(
        &self,
        address: u32,
        kind: MemoryErrorKind,
    ) -> SimulatorResult<std::ops::Range<usize>> {
        let start = address as usize;
        match start.checked_add(4) {
            Some(end) if end <= self.data.len() => Ok(start..end),
            _ => Err(MemoryError::AccessError { address, kind }.into()),
        }
    }

    fn word_at(&self, range: std::ops::Range<usize>) -> u32 {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data[range]);
        u32::from_be_bytes(bytes)
    }
}

impl StorageInterface for Memory {
    fn fetch(&self, pc: u32) -> SimulatorResult<u32> {
        // Instruction words are aligned down
        let range = self.word_range(pc & !0x3, MemoryErrorKind::FetchOutOfBounds)?;
        Ok(self.word_at(range))
    }

    fn get32(&self, address: u32) -> SimulatorResult<u32> {
        let range = self.word_range(address, MemoryErrorKind::OutOfBounds)?;
        Ok(self.word_at(range))
    }

    fn set32(&mut self, address: u32, value: u32) -> SimulatorResult<()> {
        let range = self.word_range(address, MemoryErrorKind::OutOfBounds)?;
        self.data[range].copy_from_slice(&value.to_be_bytes());
        Ok(())
    }
}
