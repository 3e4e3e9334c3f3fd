//! HID keyboard output: report type, descriptor and character table.

pub mod keyboard;
pub mod keymap;

#[cfg(test)]
mod tests;

pub use keyboard::{KeyboardReport, KEYBOARD_REPORT_DESCRIPTOR, KEYBOARD_REPORT_SIZE};
