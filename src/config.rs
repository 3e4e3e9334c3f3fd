//! Application-wide constants and compile-time configuration.
//!
//! Persisted layout, protocol codes, timing parameters and USB identity
//! live here so they can be tuned in one place.

// Credential layout

/// Width of the credential name field (bytes).
pub const NAME_LEN: usize = 10;

/// Width of the username field (bytes).
pub const USERNAME_LEN: usize = 32;

/// Width of the password field (bytes).
pub const PASSWORD_LEN: usize = 21;

/// One persisted credential block: name | username | password.
pub const BLOCK_LEN: usize = NAME_LEN + USERNAME_LEN + PASSWORD_LEN;

/// Sub-offsets of each field inside a block.
pub const NAME_OFFSET: usize = 0;
pub const USERNAME_OFFSET: usize = NAME_OFFSET + NAME_LEN;
pub const PASSWORD_OFFSET: usize = USERNAME_OFFSET + USERNAME_LEN;

/// Number of credential slots.
pub const MAX_SLOTS: u8 = 8;

// Persisted memory map (512-byte EEPROM image)
//
//   0x000..0x1F8  credential slots (8 × 63 bytes)
//   0x1F8         credential count
//   0x1F9..0x200  master key

/// Total size of the persisted image.
pub const EEPROM_SIZE: usize = 512;

/// Size of the slot region.
pub const SLOT_REGION_LEN: usize = MAX_SLOTS as usize * BLOCK_LEN;

/// Location of the 1-byte credential count.
pub const CREDCOUNT_OFFSET: usize = 0x1F8;

/// Location of the master key.
pub const MASTERKEY_OFFSET: usize = 0x1F9;

/// Master key length (bytes).
pub const MASTER_KEY_LEN: usize = 7;

/// Value written over the whole image by a wipe (erased EEPROM state).
pub const FILL_BYTE: u8 = 0xFF;

const _: () = assert!(SLOT_REGION_LEN <= CREDCOUNT_OFFSET);
const _: () = assert!(MASTERKEY_OFFSET + MASTER_KEY_LEN <= EEPROM_SIZE);

// USB vendor control requests (bRequest)

pub const REQ_LED_OFF: u8 = 0;
pub const REQ_LED_ON: u8 = 1;
pub const REQ_CLEAR_EEPROM: u8 = 2;
pub const REQ_ID_UPLOAD: u8 = 3;
pub const REQ_UNLOCK_DEVICE: u8 = 15;
pub const REQ_INIT_DEVICE: u8 = 16;

// Tags carried in the first byte of an 8-byte control payload

pub const TAG_UPLOAD_INIT: u8 = 4;
pub const TAG_NAME_SEND: u8 = 5;
pub const TAG_NAME_DONE: u8 = 6;
pub const TAG_USERNAME_SEND: u8 = 7;
pub const TAG_USERNAME_DONE: u8 = 8;
pub const TAG_PASS_SEND: u8 = 9;
pub const TAG_PASS_DONE: u8 = 10;
pub const TAG_UNLOCK: u8 = 12;
pub const TAG_INIT: u8 = 13;

/// Maximum control payload (tag + 7 data bytes).
pub const CHUNK_LEN: usize = 8;

/// Data bytes carried by one chunk after the tag.
pub const CHUNK_DATA_LEN: usize = CHUNK_LEN - 1;

// Autotype timing

/// Backspaces sent before a preview or injection to clear the previous preview.
pub const CLEAR_KEYSTROKES: u8 = NAME_LEN as u8;

/// Timer tick period (ms).
pub const TICK_MS: u64 = 100;

/// Button hold time that makes a press "long" (in 100 ms ticks). 10 = 1.0 s.
pub const LONG_PRESS_TICKS: u8 = 10;

/// Main-loop iterations the button must read "released" before a press is accepted.
pub const DEBOUNCE_CEILING: u8 = 50;

/// Main-loop pacing (ms). With `DEBOUNCE_CEILING` this gives ~50 ms of debounce.
pub const MAIN_LOOP_PERIOD_MS: u64 = 1;

/// Watchdog timeout (32.768 kHz ticks). 65536 = 2 s.
pub const WATCHDOG_TIMEOUT_TICKS: u32 = 65_536;

// USB

/// USB VID/PID - the shared V-USB vendor-class pair the host tool looks for.
pub const USB_VID: u16 = 0x16c0;
pub const USB_PID: u16 = 0x05dc;

/// USB device strings (the host tool matches on manufacturer and product).
pub const USB_MANUFACTURER: &str = "stickpass";
pub const USB_PRODUCT: &str = "StickPass";
pub const USB_SERIAL_NUMBER: &str = "000001";

/// USB HID polling interval (ms).
pub const USB_HID_POLL_MS: u8 = 10;

/// Give up on an interrupt-IN write the host never collects (ms).
pub const USB_HID_WRITE_TIMEOUT_MS: u64 = 250;

// Flash image of the persisted region

/// Flash page index where the credential image starts (4 KB per page on nRF52840).
pub const STORAGE_FLASH_PAGE_START: u32 = 240;

/// Number of flash pages reserved for the credential image.
pub const STORAGE_FLASH_PAGE_COUNT: u32 = 4;
