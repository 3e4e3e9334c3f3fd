//! Flash-backed EEPROM image.
//!
//! The nRF52840 has no EEPROM, so the 512-byte persisted region lives in
//! RAM while running and is written to internal flash as a single
//! `sequential-storage` map item. Stores only touch the RAM copy and set
//! a dirty flag; the main loop persists the image when it sees the flag.
//!
//! Flash layout:
//!   - Pages `STORAGE_FLASH_PAGE_START ..+ STORAGE_FLASH_PAGE_COUNT`.
//!   - One map item, key [`KEY_IMAGE`], value = the raw 512-byte image.
//!   - `sequential-storage` handles wear levelling and page GC.

use defmt::{debug, error, info};
use embedded_storage_async::nor_flash::NorFlash;
use stickpass::config::{EEPROM_SIZE, STORAGE_FLASH_PAGE_COUNT, STORAGE_FLASH_PAGE_START};
use stickpass::error::Result;
use stickpass::store::{Eeprom, RamEeprom};

/// Flash page size for nRF52840 (4 KB).
const FLASH_PAGE_SIZE: u32 = 4096;

const STORAGE_START: u32 = STORAGE_FLASH_PAGE_START * FLASH_PAGE_SIZE;
const STORAGE_END: u32 = (STORAGE_FLASH_PAGE_START + STORAGE_FLASH_PAGE_COUNT) * FLASH_PAGE_SIZE;

/// Map key of the image item.
const KEY_IMAGE: u8 = 0x01;

/// Scratch space for one item: the image plus key and item header.
const ITEM_BUF_SIZE: usize = EEPROM_SIZE + 64;

/// RAM working copy of the persisted region, with a dirty flag.
pub struct FlashEeprom {
    image: RamEeprom,
    dirty: bool,
}

impl FlashEeprom {
    /// Load the image from flash. A missing or unreadable item gives a
    /// blank (all `0xFF`) image, like a never-programmed EEPROM.
    pub async fn load(flash: &mut impl NorFlash) -> Self {
        let mut buf = [0u8; ITEM_BUF_SIZE];

        let image = match sequential_storage::map::fetch_item::<u8, &[u8], _>(
            flash,
            STORAGE_START..STORAGE_END,
            &mut sequential_storage::cache::NoCache::new(),
            &mut buf,
            &KEY_IMAGE,
        )
        .await
        {
            Ok(Some(data)) if data.len() == EEPROM_SIZE => {
                let mut bytes = [0u8; EEPROM_SIZE];
                bytes.copy_from_slice(data);
                info!("Flash: image loaded");
                RamEeprom::from_image(bytes)
            }
            Ok(Some(data)) => {
                error!("Flash: image has wrong size {=usize}, starting blank", data.len());
                RamEeprom::new()
            }
            Ok(None) => {
                info!("Flash: no image, starting blank");
                RamEeprom::new()
            }
            Err(e) => {
                error!("Flash read error: {:?}", defmt::Debug2Format(&e));
                RamEeprom::new()
            }
        };

        Self {
            image,
            dirty: false,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Snapshot the image for saving and clear the dirty flag.
    ///
    /// If the save fails the caller must call [`FlashEeprom::mark_dirty`].
    pub fn take_dirty(&mut self) -> Option<[u8; EEPROM_SIZE]> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        Some(*self.image.image())
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}

impl Eeprom for FlashEeprom {
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<()> {
        self.image.read(offset, buf)
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        self.image.write(offset, data)?;
        self.dirty = true;
        Ok(())
    }
}

/// Persist one image snapshot. Returns `false` on a flash error.
pub async fn save_image(flash: &mut impl NorFlash, image: &[u8; EEPROM_SIZE]) -> bool {
    let mut buf = [0u8; ITEM_BUF_SIZE];
    let item: &[u8] = image;

    match sequential_storage::map::store_item::<u8, &[u8], _>(
        flash,
        STORAGE_START..STORAGE_END,
        &mut sequential_storage::cache::NoCache::new(),
        &mut buf,
        &KEY_IMAGE,
        &item,
    )
    .await
    {
        Ok(()) => {
            debug!("Flash: image saved");
            true
        }
        Err(e) => {
            error!("Flash write error: {:?}", defmt::Debug2Format(&e));
            false
        }
    }
}
