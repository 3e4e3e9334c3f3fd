//! ASCII → (modifier, keycode) table for a US keyboard layout.
//!
//! Anything without a mapping (control bytes, non-ASCII) becomes
//! `(0, 0)`: an empty keystroke, so playback carries on.

use super::keyboard::MOD_LEFT_SHIFT;

const SHIFT: u8 = MOD_LEFT_SHIFT;

/// Look up the key press that types `byte`.
pub fn ascii_to_key(byte: u8) -> (u8, u8) {
    match byte {
        b'a'..=b'z' => (0, 0x04 + (byte - b'a')),
        b'A'..=b'Z' => (SHIFT, 0x04 + (byte - b'A')),
        b'1'..=b'9' => (0, 0x1E + (byte - b'1')),
        b'0' => (0, 0x27),

        b'!' => (SHIFT, 0x1E),
        b'@' => (SHIFT, 0x1F),
        b'#' => (SHIFT, 0x20),
        b'$' => (SHIFT, 0x21),
        b'%' => (SHIFT, 0x22),
        b'^' => (SHIFT, 0x23),
        b'&' => (SHIFT, 0x24),
        b'*' => (SHIFT, 0x25),
        b'(' => (SHIFT, 0x26),
        b')' => (SHIFT, 0x27),

        b' ' => (0, 0x2C),
        b'-' => (0, 0x2D),
        b'_' => (SHIFT, 0x2D),
        b'=' => (0, 0x2E),
        b'+' => (SHIFT, 0x2E),
        b'[' => (0, 0x2F),
        b'{' => (SHIFT, 0x2F),
        b']' => (0, 0x30),
        b'}' => (SHIFT, 0x30),
        b'\\' => (0, 0x31),
        b'|' => (SHIFT, 0x31),
        b';' => (0, 0x33),
        b':' => (SHIFT, 0x33),
        b'\'' => (0, 0x34),
        b'"' => (SHIFT, 0x34),
        b'`' => (0, 0x35),
        b'~' => (SHIFT, 0x35),
        b',' => (0, 0x36),
        b'<' => (SHIFT, 0x36),
        b'.' => (0, 0x37),
        b'>' => (SHIFT, 0x37),
        b'/' => (0, 0x38),
        b'?' => (SHIFT, 0x38),

        _ => (0, 0),
    }
}
