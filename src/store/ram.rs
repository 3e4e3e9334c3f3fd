//! RAM-backed EEPROM image.
//!
//! Used directly by host tests and simulations, and as the working copy
//! behind the flash-backed store on the nRF52840.

use super::Eeprom;
use crate::config::{EEPROM_SIZE, FILL_BYTE};
use crate::error::{Error, Result};

/// 512-byte image held in RAM.
#[derive(Clone)]
pub struct RamEeprom {
    bytes: [u8; EEPROM_SIZE],
    writes: usize,
}

impl RamEeprom {
    /// A never-programmed part: every byte reads `FILL_BYTE`.
    pub const fn new() -> Self {
        Self {
            bytes: [FILL_BYTE; EEPROM_SIZE],
            writes: 0,
        }
    }

    /// Start from an existing image (e.g. one loaded from flash).
    pub const fn from_image(bytes: [u8; EEPROM_SIZE]) -> Self {
        Self { bytes, writes: 0 }
    }

    pub fn image(&self) -> &[u8; EEPROM_SIZE] {
        &self.bytes
    }

    /// Number of write operations performed since construction.
    pub fn write_count(&self) -> usize {
        self.writes
    }

    fn range(offset: usize, len: usize) -> Result<core::ops::Range<usize>> {
        let end = offset.checked_add(len).ok_or(Error::Storage)?;
        if end > EEPROM_SIZE {
            return Err(Error::Storage);
        }
        Ok(offset..end)
    }
}

impl Default for RamEeprom {
    fn default() -> Self {
        Self::new()
    }
}

impl Eeprom for RamEeprom {
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<()> {
        let range = Self::range(offset, buf.len())?;
        buf.copy_from_slice(&self.bytes[range]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        let range = Self::range(offset, data.len())?;
        self.bytes[range].copy_from_slice(data);
        self.writes += 1;
        Ok(())
    }
}
