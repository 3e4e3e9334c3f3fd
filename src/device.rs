//! Top-level device context.
//!
//! [`StickPass`] owns every component and is the only thing the firmware
//! shell talks to. Control transfers come in through
//! [`StickPass::handle_control`], button samples through
//! [`StickPass::poll_button`], and the interrupt-IN endpoint pulls
//! reports from [`StickPass::next_report`].
//!
//! All errors stay local: they are logged and turned into a
//! [`ControlOutcome`] so the USB layer can stall the request, but no
//! detail reaches the host.

use crate::auth::{AuthGate, AuthState};
use crate::error::{Error, Result};
use crate::hid::KeyboardReport;
use crate::input::{PressClassifier, PressEvent};
use crate::playback::{PlaybackEngine, PlaybackState};
use crate::protocol::Command;
use crate::store::{CredentialStore, Eeprom};
use crate::upload::{UploadMachine, UploadProgress, UploadState};

/// How a vendor request was handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlOutcome {
    /// The request was understood and processed (a wrong unlock key counts).
    Accepted,
    /// The request was refused and had no effect.
    Rejected(Error),
}

impl ControlOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ControlOutcome::Accepted)
    }
}

/// The password stick.
pub struct StickPass<E> {
    store: CredentialStore<E>,
    gate: AuthGate,
    upload: UploadMachine,
    playback: PlaybackEngine,
    button: PressClassifier,
    led: bool,
    idle_rate: u8,
    last_report: KeyboardReport,
}

impl<E: Eeprom> StickPass<E> {
    /// Bring the device up on `eeprom`. The gate always starts locked.
    pub fn boot(eeprom: E) -> Result<Self> {
        let store = CredentialStore::open(eeprom)?;
        info!("Device: boot, {=u8} credentials", store.count());
        Ok(Self {
            store,
            gate: AuthGate::new(),
            upload: UploadMachine::new(),
            playback: PlaybackEngine::new(),
            button: PressClassifier::new(),
            led: false,
            idle_rate: 0,
            last_report: KeyboardReport::empty(),
        })
    }

    // Control transfers

    /// Handle one vendor control request (`bRequest`, `wValue`, data stage).
    pub fn handle_control(&mut self, request: u8, value: u16, data: &[u8]) -> ControlOutcome {
        let result = Command::parse(request, value, data).and_then(|cmd| self.execute(cmd));
        match result {
            Ok(()) => ControlOutcome::Accepted,
            Err(e) => {
                warn!("Control: request {=u8} rejected: {}", request, e);
                ControlOutcome::Rejected(e)
            }
        }
    }

    fn execute(&mut self, cmd: Command<'_>) -> Result<()> {
        if cmd.is_privileged() && !self.gate.is_unlocked() {
            return Err(Error::Locked);
        }

        match cmd {
            Command::LedOn => self.led = true,
            Command::LedOff => self.led = false,
            Command::ClearEeprom { reset_key } => {
                self.store.wipe(reset_key)?;
                info!("Device: store wiped (reset_key={=bool})", reset_key);
            }
            Command::Unlock(key) => {
                self.gate.try_unlock(&key, &mut self.store)?;
            }
            Command::InitDevice(key) => {
                if !self.gate.is_unlocked() {
                    // Re-keying a locked stick must not hand over its credentials.
                    self.store.wipe(true)?;
                    self.upload = UploadMachine::new();
                }
                self.store.set_master_key(&key)?;
                info!("Device: master key set");
            }
            Command::Upload(chunk) => {
                let progress = self.upload.handle(&chunk, &self.gate, &mut self.store)?;
                if progress == UploadProgress::NotCommitted(Error::StoreFull) {
                    self.led = true;
                }
            }
        }
        Ok(())
    }

    // Button and playback

    /// Feed one button sample. A classified press starts playback.
    pub fn poll_button(&mut self, pressed: bool, now_ticks: u8) -> Option<PressEvent> {
        let event = self.button.poll(pressed, now_ticks)?;
        self.on_press(event);
        Some(event)
    }

    /// Start playback for a classified press. Ignored while locked.
    pub fn on_press(&mut self, press: PressEvent) {
        match self.playback.trigger(press, &self.gate, &mut self.store) {
            Ok(_) => {}
            Err(Error::Locked) => {
                debug!("Device: press ignored, locked");
            }
            Err(_e) => {
                error!("Device: playback failed to start: {}", _e);
            }
        }
    }

    /// Report for the next interrupt-IN opportunity, if any.
    ///
    /// Playback pauses while a press is still being classified, but only
    /// between keystrokes: a pending release always goes out first.
    pub fn next_report(&mut self) -> Option<KeyboardReport> {
        if self.button.is_holding() && !self.playback.release_pending() {
            return None;
        }
        let report = self.playback.next_report(&self.gate)?;
        self.last_report = report;
        Some(report)
    }

    // HID class state

    /// The report most recently handed to the endpoint (HID GET_REPORT).
    pub fn current_report(&self) -> KeyboardReport {
        self.last_report
    }

    pub fn idle_rate(&self) -> u8 {
        self.idle_rate
    }

    pub fn set_idle_rate(&mut self, rate: u8) {
        self.idle_rate = rate;
    }

    // Accessors

    pub fn led(&self) -> bool {
        self.led
    }

    pub fn auth_state(&self) -> AuthState {
        self.gate.state()
    }

    pub fn is_unlocked(&self) -> bool {
        self.gate.is_unlocked()
    }

    pub fn credential_count(&self) -> u8 {
        self.store.count()
    }

    pub fn upload_state(&self) -> UploadState {
        self.upload.state()
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.playback.state()
    }

    pub fn store(&self) -> &CredentialStore<E> {
        &self.store
    }

    /// Mutable access to the backend, for flushing a cached image.
    pub fn store_mut(&mut self) -> &mut CredentialStore<E> {
        &mut self.store
    }
}
