//! Unified error type for stickpass.
//!
//! We avoid `alloc` - all error variants are fieldless.
//! Implements `defmt::Format` for efficient on-target logging.

use core::fmt;

/// Top-level error type used across the firmware core.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // Credential store
    /// Every slot is occupied; nothing was written.
    StoreFull,

    /// The requested slot is not below the credential count.
    SlotOutOfRange,

    /// The non-volatile memory backend failed or was addressed out of range.
    Storage,

    /// A field value is wider than its fixed slot width.
    FieldTooLong,

    // Auth
    /// A privileged request arrived while the device is locked.
    Locked,

    // Control transfers
    /// `bRequest` is not one of the vendor requests we serve.
    UnknownRequest,

    /// The data stage is shorter than the request needs.
    MalformedPayload,

    /// The payload tag does not belong to the request it arrived on.
    UnexpectedTag,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::StoreFull => "credential store is full",
            Error::SlotOutOfRange => "slot index beyond credential count",
            Error::Storage => "non-volatile memory access failed",
            Error::FieldTooLong => "field exceeds its maximum width",
            Error::Locked => "device is locked",
            Error::UnknownRequest => "unknown vendor request",
            Error::MalformedPayload => "control payload too short",
            Error::UnexpectedTag => "unexpected payload tag",
        };
        f.write_str(msg)
    }
}

/// Convenience alias used by the core modules.
pub type Result<T> = core::result::Result<T, Error>;
