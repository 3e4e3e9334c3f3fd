//! Push button and tick source.
//!
//! The button is active-low with the internal pull-up enabled. Unlike an
//! edge-driven task, it is sampled once per main-loop iteration so the
//! press classifier sees a steady stream of levels for debouncing.

use embassy_nrf::gpio::{AnyPin, Input, Pull};
use embassy_time::Instant;
use stickpass::config::TICK_MS;
use stickpass::input::TickSource;

pub struct Button {
    pin: Input<'static>,
}

impl Button {
    pub fn new(pin: AnyPin) -> Self {
        Self {
            pin: Input::new(pin, Pull::Up),
        }
    }

    pub fn is_pressed(&self) -> bool {
        self.pin.is_low()
    }
}

/// 100 ms ticks since boot, truncated to `u8`.
pub struct UptimeTicks;

impl TickSource for UptimeTicks {
    fn ticks(&self) -> u8 {
        (Instant::now().as_millis() / TICK_MS) as u8
    }
}
