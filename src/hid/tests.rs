//! Unit tests for keyboard report building and serialization.
//!
//! These tests run on the host (not embedded) and verify the pure
//! logic of the character table and report layout.

use super::keyboard::{KeyboardReport, KEY_BACKSPACE, KEY_TAB, MOD_LEFT_SHIFT};
use super::keymap::ascii_to_key;
use super::{KEYBOARD_REPORT_DESCRIPTOR, KEYBOARD_REPORT_SIZE};

// ═══════════════════════════════════════════════════════════════════════════
// Keyboard Report Tests
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn keyboard_report_empty() {
    let report = KeyboardReport::empty();
    assert!(report.is_empty());
    assert_eq!(report.to_bytes(), [0, 0, 0]);
}

#[test]
fn keyboard_report_serialize() {
    let report = KeyboardReport::key(MOD_LEFT_SHIFT, 0x04);
    let mut buf = [0xAAu8; 3];
    let written = report.serialize(&mut buf);

    assert_eq!(written, KEYBOARD_REPORT_SIZE);
    assert_eq!(buf, [0x02, 0x00, 0x04]);
}

#[test]
fn keyboard_report_serialize_buffer_too_small() {
    let report = KeyboardReport::empty();
    let mut small_buf = [0u8; 2];
    let written = report.serialize(&mut small_buf);
    assert_eq!(written, 0); // Should fail gracefully
}

#[test]
fn keyboard_report_modifier_only_is_not_empty() {
    let report = KeyboardReport::key(MOD_LEFT_SHIFT, 0);
    assert!(!report.is_empty());
}

#[test]
fn special_keys() {
    assert_eq!(
        KeyboardReport::backspace(),
        KeyboardReport::key(MOD_LEFT_SHIFT, KEY_BACKSPACE)
    );
    assert_eq!(KeyboardReport::tab().to_bytes(), [0x00, 0x00, 0x2B]);
    assert_eq!(KEY_TAB, 0x2B);
}

// ═══════════════════════════════════════════════════════════════════════════
// Character Table Tests
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn lowercase_letters() {
    assert_eq!(ascii_to_key(b'a'), (0, 0x04));
    assert_eq!(ascii_to_key(b'm'), (0, 0x10));
    assert_eq!(ascii_to_key(b'z'), (0, 0x1D));
}

#[test]
fn uppercase_letters_use_shift() {
    assert_eq!(ascii_to_key(b'A'), (MOD_LEFT_SHIFT, 0x04));
    assert_eq!(ascii_to_key(b'P'), (MOD_LEFT_SHIFT, 0x13));
    assert_eq!(ascii_to_key(b'Z'), (MOD_LEFT_SHIFT, 0x1D));
}

#[test]
fn digits() {
    assert_eq!(ascii_to_key(b'1'), (0, 0x1E));
    assert_eq!(ascii_to_key(b'9'), (0, 0x26));
    assert_eq!(ascii_to_key(b'0'), (0, 0x27));
}

#[test]
fn shifted_number_row() {
    let row = b"!@#$%^&*()";
    for (i, &c) in row.iter().enumerate() {
        assert_eq!(ascii_to_key(c), (MOD_LEFT_SHIFT, 0x1E + i as u8), "{}", c as char);
    }
}

#[test]
fn punctuation_used_in_logins() {
    assert_eq!(ascii_to_key(b'.'), (0, 0x37));
    assert_eq!(ascii_to_key(b' '), (0, 0x2C));
    assert_eq!(ascii_to_key(b'_'), (MOD_LEFT_SHIFT, 0x2D));
    assert_eq!(ascii_to_key(b'-'), (0, 0x2D));
    assert_eq!(ascii_to_key(b'?'), (MOD_LEFT_SHIFT, 0x38));
}

#[test]
fn every_printable_ascii_byte_has_a_key() {
    for c in 0x20u8..0x7F {
        assert_ne!(ascii_to_key(c).1, 0, "unmapped {:?}", c as char);
    }
}

#[test]
fn unsupported_bytes_give_null_keystroke() {
    for c in [0x00u8, 0x07, b'\t', b'\n', 0x7F, 0x80, 0xE9, 0xFF] {
        assert_eq!(ascii_to_key(c), (0, 0));
        assert!(KeyboardReport::from_ascii(c).is_empty());
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Descriptor Tests
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn descriptor_is_a_single_keyboard_collection() {
    assert_eq!(&KEYBOARD_REPORT_DESCRIPTOR[..6], &[0x05, 0x01, 0x09, 0x06, 0xA1, 0x01]);
    assert_eq!(KEYBOARD_REPORT_DESCRIPTOR.last(), Some(&0xC0));
}

#[test]
fn descriptor_input_size_matches_report() {
    // Walk short items and add up Input bits (Report Size × Report Count).
    let d = KEYBOARD_REPORT_DESCRIPTOR;
    let (mut size, mut count, mut input_bits) = (0u32, 0u32, 0u32);
    let mut i = 0;
    while i < d.len() {
        let prefix = d[i];
        let len = match prefix & 0x03 {
            3 => 4,
            n => n as usize,
        };
        let value = d[i + 1..i + 1 + len]
            .iter()
            .rev()
            .fold(0u32, |acc, &b| (acc << 8) | b as u32);
        match prefix & 0xFC {
            0x74 => size = value,
            0x94 => count = value,
            0x80 => input_bits += size * count,
            _ => {}
        }
        i += 1 + len;
    }
    assert_eq!(input_bits as usize, KEYBOARD_REPORT_SIZE * 8);
}
