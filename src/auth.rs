//! Unlock gate for the current power-on session.
//!
//! Starts `Locked` on every boot. The only way to `Unlocked` is an unlock
//! request carrying the persisted master key; the only way back is a
//! reset. A wrong key is silent: the gate stays locked and nothing is
//! reported to the host. Attempts are not rate limited.

use crate::error::Result;
use crate::store::{CredentialStore, Eeprom, MasterKey};

/// Gate state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AuthState {
    #[default]
    Locked,
    Unlocked,
}

/// Session lock.
#[derive(Debug, Default)]
pub struct AuthGate {
    state: AuthState,
}

impl AuthGate {
    /// A locked gate, as at power-on.
    pub const fn new() -> Self {
        Self {
            state: AuthState::Locked,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn is_unlocked(&self) -> bool {
        self.state == AuthState::Unlocked
    }

    /// Compare `candidate` against the persisted key and unlock on a match.
    ///
    /// Returns the resulting state. Storage failures propagate and leave
    /// the gate as it was.
    pub fn try_unlock<E: Eeprom>(
        &mut self,
        candidate: &MasterKey,
        store: &mut CredentialStore<E>,
    ) -> Result<AuthState> {
        let key = store.master_key()?;
        if keys_match(&key, candidate) {
            if self.state == AuthState::Locked {
                info!("Auth: unlocked");
            }
            self.state = AuthState::Unlocked;
        } else {
            debug!("Auth: key mismatch");
        }
        Ok(self.state)
    }
}

/// Compare every byte regardless of where the first difference is.
fn keys_match(a: &MasterKey, b: &MasterKey) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
