//! Button debounce and short/long press classification.
//!
//! The main loop samples the button once per iteration and feeds the
//! level here together with the current tick count. A press is only
//! recognised after the line has read "released" for
//! [`DEBOUNCE_CEILING`] consecutive samples, which filters contact bounce
//! on both edges.
//!
//! While held, the classifier sits in `Holding` until either the button
//! is released (short press) or [`LONG_PRESS_TICKS`] have elapsed (long
//! press). A long press then waits for release before re-arming, so one
//! physical press-and-release cycle yields exactly one event.

use crate::config::{DEBOUNCE_CEILING, LONG_PRESS_TICKS};

/// Classified button press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PressEvent {
    /// Released before the dwell time.
    Short,
    /// Held for the full dwell time.
    Long,
}

/// Elapsed-time source counting 100 ms ticks.
///
/// The counter is a free-running `u8`; only differences are meaningful,
/// taken with wrapping arithmetic.
pub trait TickSource {
    fn ticks(&self) -> u8;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClassifierState {
    /// Counting consecutive released samples.
    Debouncing { stable: u8 },
    /// Pressed at tick `since`, not yet classified.
    Holding { since: u8 },
    /// Long press already reported; waiting for the button to come up.
    AwaitRelease,
}

pub struct PressClassifier {
    state: ClassifierState,
}

impl PressClassifier {
    pub const fn new() -> Self {
        Self {
            state: ClassifierState::Debouncing { stable: 0 },
        }
    }

    pub fn state(&self) -> ClassifierState {
        self.state
    }

    /// True while a press is down but not yet classified.
    pub fn is_holding(&self) -> bool {
        matches!(self.state, ClassifierState::Holding { .. })
    }

    /// Sample the button through a tick source.
    pub fn poll_with<T: TickSource>(&mut self, pressed: bool, clock: &T) -> Option<PressEvent> {
        self.poll(pressed, clock.ticks())
    }

    /// Feed one sample. Returns an event when a press has just been
    /// classified.
    pub fn poll(&mut self, pressed: bool, now: u8) -> Option<PressEvent> {
        match self.state {
            ClassifierState::Debouncing { stable } => {
                if !pressed {
                    self.state = ClassifierState::Debouncing {
                        stable: stable.saturating_add(1).min(DEBOUNCE_CEILING),
                    };
                } else if stable >= DEBOUNCE_CEILING {
                    debug!("Button: down at tick {=u8}", now);
                    self.state = ClassifierState::Holding { since: now };
                } else {
                    self.state = ClassifierState::Debouncing { stable: 0 };
                }
                None
            }
            ClassifierState::Holding { since } => {
                if !pressed {
                    self.state = ClassifierState::Debouncing { stable: 0 };
                    Some(PressEvent::Short)
                } else if now.wrapping_sub(since) >= LONG_PRESS_TICKS {
                    self.state = ClassifierState::AwaitRelease;
                    Some(PressEvent::Long)
                } else {
                    None
                }
            }
            ClassifierState::AwaitRelease => {
                if !pressed {
                    self.state = ClassifierState::Debouncing { stable: 0 };
                }
                None
            }
        }
    }
}

impl Default for PressClassifier {
    fn default() -> Self {
        Self::new()
    }
}
