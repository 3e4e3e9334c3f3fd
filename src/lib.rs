//! Core of the StickPass USB password stick.
//!
//! Everything here is hardware-independent and runs on the host:
//! credential store, auth gate, upload protocol, autotype playback and
//! button classification, tied together by [`StickPass`].
//!
//! Usage: `cargo test` on the host.
//!
//! Note: The embedded binary (`src/main.rs`, `embedded` feature) adds the
//! nRF52840 glue: USB stack, flash-backed image and the polling loop.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod log;

pub mod auth;
pub mod config;
pub mod device;
pub mod error;
pub mod hid;
pub mod input;
pub mod playback;
pub mod protocol;
pub mod store;
pub mod upload;

pub use auth::{AuthGate, AuthState};
pub use device::{ControlOutcome, StickPass};
pub use error::{Error, Result};
pub use hid::KeyboardReport;
pub use input::{PressClassifier, PressEvent, TickSource};
pub use playback::{PlaybackEngine, PlaybackMode, PlaybackState};
pub use protocol::{Chunk, Command, UploadTag};
pub use store::{CredentialRecord, CredentialStore, Eeprom, MasterKey, RamEeprom};
pub use upload::{UploadMachine, UploadProgress, UploadState};
