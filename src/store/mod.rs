//! Persistent credential store.
//!
//! Fixed-slot array of credential blocks plus a count byte and the
//! master key, all inside one 512-byte non-volatile image:
//!
//! ```text
//! 0x000 ┌──────────────────────────────┐
//!       │ slot 0 .. slot 7 (8 × 63 B)  │
//! 0x1F8 ├──────────────────────────────┤
//!       │ credential count (1 B)       │
//! 0x1F9 ├──────────────────────────────┤
//!       │ master key (7 B)             │
//! 0x200 └──────────────────────────────┘
//! ```
//!
//! Slots fill contiguously from 0. There is no per-slot delete, only a
//! full wipe. Writes are not atomic: losing power mid-write can leave
//! the image torn, and nothing here detects that.

mod ram;
mod record;

pub use ram::RamEeprom;
pub use record::{CredentialRecord, Field};

use crate::config::{
    BLOCK_LEN, CHUNK_LEN, CREDCOUNT_OFFSET, EEPROM_SIZE, FILL_BYTE, MASTERKEY_OFFSET,
    MASTER_KEY_LEN, MAX_SLOTS,
};
use crate::error::{Error, Result};

/// The 7-byte unlock secret.
pub type MasterKey = [u8; MASTER_KEY_LEN];

/// Byte-addressable non-volatile memory.
///
/// Both operations block until the bytes are committed (or, for a
/// cached backend, until the cache reflects them).
pub trait Eeprom {
    /// Fill `buf` with the bytes starting at `offset`.
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<()>;

    /// Write `data` starting at `offset`.
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<()>;
}

impl<E: Eeprom + ?Sized> Eeprom for &mut E {
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<()> {
        (**self).read(offset, buf)
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        (**self).write(offset, data)
    }
}

/// Sole owner of the persisted image and of the in-memory credential count.
pub struct CredentialStore<E> {
    eeprom: E,
    /// Mirror of the persisted count byte.
    count: u8,
}

impl<E: Eeprom> CredentialStore<E> {
    /// Take ownership of the memory and load the credential count.
    ///
    /// A count above `MAX_SLOTS` (erased or never-initialised memory) is
    /// treated as an empty store.
    pub fn open(mut eeprom: E) -> Result<Self> {
        let mut raw = [0u8; 1];
        eeprom.read(CREDCOUNT_OFFSET, &mut raw)?;

        let count = if raw[0] > MAX_SLOTS {
            warn!("Store: invalid credential count {=u8}, treating as empty", raw[0]);
            0
        } else {
            raw[0]
        };

        info!("Store: {=u8} credentials", count);
        Ok(Self { eeprom, count })
    }

    /// Number of occupied slots.
    pub fn count(&self) -> u8 {
        self.count
    }

    pub fn is_full(&self) -> bool {
        self.count >= MAX_SLOTS
    }

    /// Append a credential to the next free slot and return its index.
    ///
    /// Not idempotent: the same record appended twice takes two slots.
    pub fn append(&mut self, record: &CredentialRecord) -> Result<u8> {
        if self.is_full() {
            warn!("Store: full, credential dropped");
            return Err(Error::StoreFull);
        }

        let slot = self.count;
        self.eeprom.write(slot_offset(slot), &record.encode())?;

        let count = slot + 1;
        self.eeprom.write(CREDCOUNT_OFFSET, &[count])?;
        self.count = count;

        debug!("Store: wrote slot {=u8}", slot);
        Ok(slot)
    }

    /// Read back the credential in `slot` (0-based).
    pub fn read(&mut self, slot: u8) -> Result<CredentialRecord> {
        if slot >= self.count {
            return Err(Error::SlotOutOfRange);
        }

        let mut block = [0u8; BLOCK_LEN];
        self.eeprom.read(slot_offset(slot), &mut block)?;
        Ok(CredentialRecord::decode(&block))
    }

    /// Overwrite the whole image with `FILL_BYTE` and reset the count.
    ///
    /// With `reset_key == false` the master key is carried across the
    /// wipe; with `true` it is left erased.
    pub fn wipe(&mut self, reset_key: bool) -> Result<()> {
        let saved_key = if reset_key {
            None
        } else {
            Some(self.master_key()?)
        };

        let fill = [FILL_BYTE; CHUNK_LEN];
        for offset in (0..EEPROM_SIZE).step_by(CHUNK_LEN) {
            let len = CHUNK_LEN.min(EEPROM_SIZE - offset);
            self.eeprom.write(offset, &fill[..len])?;
        }

        self.eeprom.write(CREDCOUNT_OFFSET, &[0])?;
        self.count = 0;

        if let Some(key) = saved_key {
            self.set_master_key(&key)?;
        }

        info!("Store: wiped (reset_key={=bool})", reset_key);
        Ok(())
    }

    /// Read the persisted master key.
    pub fn master_key(&mut self) -> Result<MasterKey> {
        let mut key = [0u8; MASTER_KEY_LEN];
        self.eeprom.read(MASTERKEY_OFFSET, &mut key)?;
        Ok(key)
    }

    /// Persist a new master key. No validation beyond the fixed length.
    pub fn set_master_key(&mut self, key: &MasterKey) -> Result<()> {
        self.eeprom.write(MASTERKEY_OFFSET, key)
    }

    /// Backing memory (read-only).
    pub fn eeprom(&self) -> &E {
        &self.eeprom
    }

    /// Backing memory, for backends that need servicing (e.g. flushing a cache).
    pub fn eeprom_mut(&mut self) -> &mut E {
        &mut self.eeprom
    }

    pub fn into_inner(self) -> E {
        self.eeprom
    }
}

fn slot_offset(slot: u8) -> usize {
    slot as usize * BLOCK_LEN
}
