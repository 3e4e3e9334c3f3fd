//! nRF52840 glue: persisted image in flash, button, ticks.

pub mod button;
pub mod flash;

pub use button::{Button, UptimeTicks};
pub use flash::{save_image, FlashEeprom};
