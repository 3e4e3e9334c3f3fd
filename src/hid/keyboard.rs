//! USB HID keyboard report (single-key boot layout).
//!
//! Layout (3 bytes):
//! ```text
//! Byte 0: Modifier keys (bitfield)
//!         Bit 0 = Left Ctrl,  Bit 1 = Left Shift,
//!         Bit 2 = Left Alt,   Bit 3 = Left GUI,
//!         Bit 4 = Right Ctrl, Bit 5 = Right Shift,
//!         Bit 6 = Right Alt,  Bit 7 = Right GUI
//! Byte 1: Reserved (0x00)
//! Byte 2: Key code (USB HID usage code), 0 = no key
//! ```
//! Autotype only ever presses one key at a time, so the keycode array of
//! the boot layout is shortened to a single slot.

use super::keymap;

/// Keyboard report size in bytes.
pub const KEYBOARD_REPORT_SIZE: usize = 3;

/// Left Shift bit in the modifier byte.
pub const MOD_LEFT_SHIFT: u8 = 0x02;

/// Usage codes for the non-character keys autotype sends.
pub const KEY_BACKSPACE: u8 = 0x2A;
pub const KEY_TAB: u8 = 0x2B;

/// One keyboard input report.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyboardReport {
    /// Modifier key bitfield.
    pub modifier: u8,
    /// Reserved byte, always 0x00.
    pub reserved: u8,
    /// Pressed key, or 0.
    pub keycode: u8,
}

impl KeyboardReport {
    /// Create an empty (all-keys-released) report.
    pub const fn empty() -> Self {
        Self {
            modifier: 0,
            reserved: 0,
            keycode: 0,
        }
    }

    pub const fn key(modifier: u8, keycode: u8) -> Self {
        Self {
            modifier,
            reserved: 0,
            keycode,
        }
    }

    /// Press for one ASCII byte. Unmapped bytes give a null keystroke.
    pub fn from_ascii(byte: u8) -> Self {
        let (modifier, keycode) = keymap::ascii_to_key(byte);
        Self::key(modifier, keycode)
    }

    /// Backspace, sent with Shift held as the clear sequence always has been.
    pub const fn backspace() -> Self {
        Self::key(MOD_LEFT_SHIFT, KEY_BACKSPACE)
    }

    pub const fn tab() -> Self {
        Self::key(0, KEY_TAB)
    }

    /// Serialise into a byte slice for USB HID transmission.
    /// Returns the number of bytes written (always 3), or 0 if `buf` is too small.
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        if buf.len() < KEYBOARD_REPORT_SIZE {
            return 0;
        }
        buf[0] = self.modifier;
        buf[1] = self.reserved;
        buf[2] = self.keycode;
        KEYBOARD_REPORT_SIZE
    }

    pub const fn to_bytes(&self) -> [u8; KEYBOARD_REPORT_SIZE] {
        [self.modifier, self.reserved, self.keycode]
    }

    /// Returns `true` if no keys are pressed (release event).
    pub fn is_empty(&self) -> bool {
        self.modifier == 0 && self.keycode == 0
    }
}

// USB HID report descriptor for the single-key keyboard

/// USB HID Report Descriptor matching [`KeyboardReport`].
///
/// Declares to the host:
///   - 8 modifier key bits (input)
///   - 1 reserved byte
///   - 5 LED indicators (output)
///   - 1 key code byte (input)
pub const KEYBOARD_REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x06, // Usage (Keyboard)
    0xA1, 0x01, // Collection (Application)
    //
    //   - Modifier keys (8 bits) -
    0x05, 0x07, //   Usage Page (Keyboard/Keypad)
    0x19, 0xE0, //   Usage Minimum (Left Control)
    0x29, 0xE7, //   Usage Maximum (Right GUI)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x08, //   Report Count (8)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    //
    //   - Reserved byte -
    0x95, 0x01, //   Report Count (1)
    0x75, 0x08, //   Report Size (8)
    0x81, 0x03, //   Input (Constant, Variable, Absolute) - padding
    //
    //   - LED output (5 bits + 3 padding) -
    0x05, 0x08, //   Usage Page (LEDs)
    0x19, 0x01, //   Usage Minimum (Num Lock)
    0x29, 0x05, //   Usage Maximum (Kana)
    0x95, 0x05, //   Report Count (5)
    0x75, 0x01, //   Report Size (1)
    0x91, 0x02, //   Output (Data, Variable, Absolute)
    0x95, 0x01, //   Report Count (1)
    0x75, 0x03, //   Report Size (3)
    0x91, 0x03, //   Output (Constant, Variable, Absolute) - padding
    //
    //   - Key code (1 byte) -
    0x95, 0x01, //   Report Count (1)
    0x75, 0x08, //   Report Size (8)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x65, //   Logical Maximum (101)
    0x05, 0x07, //   Usage Page (Keyboard/Keypad)
    0x19, 0x00, //   Usage Minimum (0)
    0x29, 0x65, //   Usage Maximum (Keyboard Application)
    0x81, 0x00, //   Input (Data, Array)
    //
    0xC0, // End Collection
];
