//! Autotype playback engine.
//!
//! Turns a stored credential into keyboard reports, one per interrupt-IN
//! opportunity. Every keystroke is followed by an all-released report so
//! the host never sees a key held across two characters.
//!
//! ```text
//! Idle → Start → SendChar ⇄ ReleaseChar → Idle
//!                              │
//!                              └→ SendTab → ReleaseTab → SendChar   (injection only)
//! ```
//!
//! * Preview (short press): advance the selection, clear the previous
//!   preview with 10 backspaces, type the name.
//! * Injection (long press): clear the same way, type the username, Tab,
//!   then the password.

use crate::auth::AuthGate;
use crate::config::CLEAR_KEYSTROKES;
use crate::error::{Error, Result};
use crate::hid::KeyboardReport;
use crate::input::PressEvent;
use crate::store::{CredentialRecord, CredentialStore, Eeprom};

/// What a playback run types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlaybackMode {
    /// Name only.
    Preview,
    /// Username, Tab, password.
    Injection,
}

impl From<PressEvent> for PlaybackMode {
    fn from(press: PressEvent) -> Self {
        match press {
            PressEvent::Short => PlaybackMode::Preview,
            PressEvent::Long => PlaybackMode::Injection,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlaybackState {
    #[default]
    Idle,
    Start,
    SendChar,
    ReleaseChar,
    SendTab,
    ReleaseTab,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ActiveField {
    Name,
    Username,
    Password,
}

pub struct PlaybackEngine {
    state: PlaybackState,
    mode: PlaybackMode,
    /// 1-based preview selection; 0 until the first preview.
    selected: u8,
    /// Snapshot of the credential being typed.
    record: CredentialRecord,
    field: ActiveField,
    cursor: usize,
    cleared: bool,
    backspaces: u8,
}

impl PlaybackEngine {
    pub const fn new() -> Self {
        Self {
            state: PlaybackState::Idle,
            mode: PlaybackMode::Preview,
            selected: 0,
            record: CredentialRecord::empty(),
            field: ActiveField::Name,
            cursor: 0,
            cleared: false,
            backspaces: 0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == PlaybackState::Idle
    }

    /// A key-down is on the wire and the next report releases it.
    pub fn release_pending(&self) -> bool {
        matches!(
            self.state,
            PlaybackState::ReleaseChar | PlaybackState::ReleaseTab
        )
    }

    /// Current 1-based selection (0 = nothing previewed yet).
    pub fn selected(&self) -> u8 {
        self.selected
    }

    /// Begin a run for `press`.
    ///
    /// A short press moves the selection forward through `1..=count`
    /// (wrapping) and previews it; a long press injects the current
    /// selection, or slot 0 if nothing valid is selected. Returns the
    /// slot being typed, or `None` when the store is empty or a run is
    /// already in progress.
    pub fn trigger<E: Eeprom>(
        &mut self,
        press: PressEvent,
        gate: &AuthGate,
        store: &mut CredentialStore<E>,
    ) -> Result<Option<u8>> {
        if !gate.is_unlocked() {
            return Err(Error::Locked);
        }
        if !self.is_idle() {
            debug!("Playback: busy, press ignored");
            return Ok(None);
        }

        let count = store.count();
        if count == 0 {
            debug!("Playback: store empty");
            return Ok(None);
        }

        let mode = PlaybackMode::from(press);
        let slot = match mode {
            PlaybackMode::Preview => {
                self.selected = if self.selected >= count {
                    1
                } else {
                    self.selected + 1
                };
                self.selected - 1
            }
            PlaybackMode::Injection => {
                if self.selected == 0 || self.selected > count {
                    0
                } else {
                    self.selected - 1
                }
            }
        };

        self.record = store.read(slot)?;
        self.mode = mode;
        self.state = PlaybackState::Start;
        info!("Playback: {} slot {=u8}", mode, slot);
        Ok(Some(slot))
    }

    /// Produce the report for the next interrupt-IN opportunity.
    ///
    /// `None` means there is nothing to send: the engine is idle or the
    /// gate is locked. Transitions with no report of their own (`Start`,
    /// reaching the end of an empty field) are taken within the same call.
    pub fn next_report(&mut self, gate: &AuthGate) -> Option<KeyboardReport> {
        if !gate.is_unlocked() {
            return None;
        }

        loop {
            match self.state {
                PlaybackState::Idle => return None,
                PlaybackState::Start => {
                    self.field = match self.mode {
                        PlaybackMode::Preview => ActiveField::Name,
                        PlaybackMode::Injection => ActiveField::Username,
                    };
                    self.cursor = 0;
                    self.cleared = false;
                    self.backspaces = 0;
                    self.state = PlaybackState::SendChar;
                }
                PlaybackState::SendChar => {
                    if !self.cleared {
                        self.backspaces += 1;
                        self.state = PlaybackState::ReleaseChar;
                        return Some(KeyboardReport::backspace());
                    }
                    match self.current_char() {
                        Some(c) => {
                            self.state = PlaybackState::ReleaseChar;
                            return Some(KeyboardReport::from_ascii(c));
                        }
                        None => self.end_of_field(),
                    }
                }
                PlaybackState::ReleaseChar => {
                    if self.cleared {
                        self.cursor += 1;
                    } else if self.backspaces >= CLEAR_KEYSTROKES {
                        self.cleared = true;
                    }

                    if self.cleared && self.current_char().is_none() {
                        self.end_of_field();
                    } else {
                        self.state = PlaybackState::SendChar;
                    }
                    return Some(KeyboardReport::empty());
                }
                PlaybackState::SendTab => {
                    self.state = PlaybackState::ReleaseTab;
                    return Some(KeyboardReport::tab());
                }
                PlaybackState::ReleaseTab => {
                    self.field = ActiveField::Password;
                    self.cursor = 0;
                    self.state = PlaybackState::SendChar;
                    return Some(KeyboardReport::empty());
                }
            }
        }
    }

    fn current_char(&self) -> Option<u8> {
        match self.field {
            ActiveField::Name => self.record.name.get(self.cursor),
            ActiveField::Username => self.record.username.get(self.cursor),
            ActiveField::Password => self.record.password.get(self.cursor),
        }
    }

    fn end_of_field(&mut self) {
        if self.mode == PlaybackMode::Injection && self.field == ActiveField::Username {
            self.state = PlaybackState::SendTab;
        } else {
            self.finish();
        }
    }

    fn finish(&mut self) {
        self.record.clear();
        self.cursor = 0;
        self.state = PlaybackState::Idle;
        debug!("Playback: done");
    }
}

impl Default for PlaybackEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::keyboard::{KEY_BACKSPACE, KEY_TAB, MOD_LEFT_SHIFT};
    use crate::store::RamEeprom;

    const KEY: [u8; 7] = *b"0000000";

    struct Rig {
        store: CredentialStore<RamEeprom>,
        gate: AuthGate,
        engine: PlaybackEngine,
    }

    impl Rig {
        fn new(records: &[(&[u8], &[u8], &[u8])]) -> Self {
            let mut store = CredentialStore::open(RamEeprom::new()).unwrap();
            store.wipe(true).unwrap();
            store.set_master_key(&KEY).unwrap();
            for (n, u, p) in records {
                store
                    .append(&CredentialRecord::new(n, u, p).unwrap())
                    .unwrap();
            }
            let mut gate = AuthGate::new();
            gate.try_unlock(&KEY, &mut store).unwrap();
            Self {
                store,
                gate,
                engine: PlaybackEngine::new(),
            }
        }

        fn press(&mut self, press: PressEvent) -> Option<u8> {
            self.engine
                .trigger(press, &self.gate, &mut self.store)
                .unwrap()
        }

        fn drain(&mut self) -> Vec<(u8, u8)> {
            let mut out = Vec::new();
            while let Some(r) = self.engine.next_report(&self.gate) {
                out.push((r.modifier, r.keycode));
                assert!(out.len() < 1000, "playback never finished");
            }
            out
        }
    }

    fn clear_sequence() -> Vec<(u8, u8)> {
        let mut v = Vec::new();
        for _ in 0..CLEAR_KEYSTROKES {
            v.push((MOD_LEFT_SHIFT, KEY_BACKSPACE));
            v.push((0, 0));
        }
        v
    }

    fn typed(text: &[u8]) -> Vec<(u8, u8)> {
        let mut v = Vec::new();
        for &c in text {
            let r = KeyboardReport::from_ascii(c);
            v.push((r.modifier, r.keycode));
            v.push((0, 0));
        }
        v
    }

    #[test]
    fn idle_engine_sends_nothing() {
        let mut rig = Rig::new(&[(b"abc", b"u", b"p")]);
        assert_eq!(rig.engine.next_report(&rig.gate), None);
        assert!(rig.engine.is_idle());
    }

    #[test]
    fn release_pending_tracks_every_key_down() {
        let mut rig = Rig::new(&[(b"x", b"u", b"p")]);
        rig.press(PressEvent::Long);
        assert!(!rig.engine.release_pending());

        while let Some(r) = rig.engine.next_report(&rig.gate) {
            assert_eq!(rig.engine.release_pending(), r != KeyboardReport::empty());
        }
        assert!(!rig.engine.release_pending());
    }

    #[test]
    fn preview_clears_then_types_name() {
        let mut rig = Rig::new(&[(b"abc", b"user", b"pass")]);
        assert_eq!(rig.press(PressEvent::Short), Some(0));

        let mut expected = clear_sequence();
        expected.extend(typed(b"abc"));
        assert_eq!(rig.drain(), expected);
        assert!(rig.engine.is_idle());
    }

    #[test]
    fn preview_cycles_and_wraps() {
        let mut rig = Rig::new(&[(b"a", b"", b""), (b"b", b"", b""), (b"c", b"", b"")]);
        let mut slots = Vec::new();
        for _ in 0..5 {
            slots.push(rig.press(PressEvent::Short).unwrap());
            rig.drain();
        }
        assert_eq!(slots, [0, 1, 2, 0, 1]);
        assert_eq!(rig.engine.selected(), 2);
    }

    #[test]
    fn injection_types_username_tab_password() {
        let mut rig = Rig::new(&[(b"site", b"user@x.com", b"Pw1")]);
        assert_eq!(rig.press(PressEvent::Long), Some(0));

        let mut expected = clear_sequence();
        expected.extend(typed(b"user@x.com"));
        expected.push((0, KEY_TAB));
        expected.push((0, 0));
        expected.extend(typed(b"Pw1"));
        assert_eq!(rig.drain(), expected);
    }

    #[test]
    fn injection_uses_last_previewed_slot() {
        let mut rig = Rig::new(&[(b"a", b"u0", b"p0"), (b"b", b"u1", b"p1")]);
        rig.press(PressEvent::Short);
        rig.drain();
        rig.press(PressEvent::Short);
        rig.drain();

        assert_eq!(rig.press(PressEvent::Long), Some(1));
        let out = rig.drain();
        let tail = &out[clear_sequence().len()..];
        let mut expected = typed(b"u1");
        expected.push((0, KEY_TAB));
        expected.push((0, 0));
        expected.extend(typed(b"p1"));
        assert_eq!(tail, &expected[..]);
    }

    #[test]
    fn full_width_fields_stop_at_width() {
        let mut rig = Rig::new(&[(b"0123456789", b"u", b"p")]);
        rig.press(PressEvent::Short);
        let out = rig.drain();
        assert_eq!(out.len(), clear_sequence().len() + 2 * 10);
    }

    #[test]
    fn empty_password_ends_after_tab() {
        let mut rig = Rig::new(&[(b"n", b"u", b"")]);
        rig.press(PressEvent::Long);
        let out = rig.drain();
        assert_eq!(out[out.len() - 2..], [(0, KEY_TAB), (0, 0)]);
    }

    #[test]
    fn empty_username_goes_straight_to_tab() {
        let mut rig = Rig::new(&[(b"n", b"", b"p")]);
        rig.press(PressEvent::Long);
        let out = rig.drain();
        let tail = &out[clear_sequence().len()..];
        let mut expected = vec![(0, KEY_TAB), (0, 0)];
        expected.extend(typed(b"p"));
        assert_eq!(tail, &expected[..]);
    }

    #[test]
    fn unsupported_characters_send_null_keystroke() {
        let mut rig = Rig::new(&[(&[b'a', 0xE9, b'b'], b"", b"")]);
        rig.press(PressEvent::Short);
        let out = rig.drain();
        let tail = &out[clear_sequence().len()..];
        assert_eq!(tail, &[(0, 0x04), (0, 0), (0, 0), (0, 0), (0, 0x05), (0, 0)]);
    }

    #[test]
    fn empty_store_does_nothing() {
        let mut rig = Rig::new(&[]);
        assert_eq!(rig.press(PressEvent::Short), None);
        assert_eq!(rig.press(PressEvent::Long), None);
        assert!(rig.drain().is_empty());
    }

    #[test]
    fn locked_gate_refuses_and_emits_nothing() {
        let mut rig = Rig::new(&[(b"abc", b"u", b"p")]);
        let locked = AuthGate::new();
        assert_eq!(
            rig.engine.trigger(PressEvent::Short, &locked, &mut rig.store),
            Err(Error::Locked)
        );
        assert_eq!(rig.engine.next_report(&locked), None);
        assert!(rig.engine.is_idle());
        assert_eq!(rig.engine.selected(), 0);
    }

    #[test]
    fn press_during_playback_is_ignored() {
        let mut rig = Rig::new(&[(b"a", b"", b""), (b"b", b"", b"")]);
        rig.press(PressEvent::Short);
        rig.engine.next_report(&rig.gate);
        assert_eq!(rig.press(PressEvent::Short), None);
        assert_eq!(rig.engine.selected(), 1);
    }

    #[test]
    fn playback_is_deterministic() {
        let mut a = Rig::new(&[(b"site", b"user@x.com", b"Pw1")]);
        let mut b = Rig::new(&[(b"site", b"user@x.com", b"Pw1")]);
        a.press(PressEvent::Long);
        b.press(PressEvent::Long);
        assert_eq!(a.drain(), b.drain());
    }

    #[test]
    fn stale_selection_after_shrink_falls_back_to_slot_zero() {
        let mut rig = Rig::new(&[(b"a", b"u0", b""), (b"b", b"u1", b"")]);
        rig.press(PressEvent::Short);
        rig.drain();
        rig.press(PressEvent::Short);
        rig.drain();
        rig.store.wipe(false).unwrap();
        rig.store
            .append(&CredentialRecord::new(b"c", b"u2", b"").unwrap())
            .unwrap();

        assert_eq!(rig.press(PressEvent::Long), Some(0));
    }
}
