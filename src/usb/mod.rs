//! USB device subsystem.
//!
//! The nRF52840's USB 2.0 Full-Speed controller is driven by
//! `embassy-usb`. The device exposes:
//!
//! - Vendor control requests on the default pipe (LED, clear, unlock,
//!   init, credential upload), handled in [`control`].
//! - One HID keyboard interface whose interrupt-IN endpoint carries the
//!   autotype reports.

pub mod control;
pub mod hid_device;
