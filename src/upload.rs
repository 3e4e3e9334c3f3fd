//! Credential upload state machine.
//!
//! Reassembles one [`CredentialRecord`] from a stream of tagged ID_UPLOAD
//! chunks and commits it to the store on `PASS_DONE`:
//!
//! ```text
//! Idle ─INIT→ Init ─NAME_SEND*→ NameSend ─NAME_DONE→ NameDone
//!   ─USERNAME_SEND*→ UsernameSend ─USERNAME_DONE→ UsernameDone
//!   ─PASS_SEND*→ PassSend ─PASS_DONE→ (commit) PassDone
//! ```
//!
//! `INIT` is accepted from any state and restarts the sequence. Any other
//! out-of-order tag is refused without touching the staging record.
//! Field bytes are written through a bounded cursor: bytes beyond a
//! field's width are dropped, never written past it.

use crate::auth::AuthGate;
use crate::config::{NAME_LEN, PASSWORD_LEN, USERNAME_LEN};
use crate::error::{Error, Result};
use crate::protocol::{Chunk, UploadTag};
use crate::store::{CredentialRecord, CredentialStore, Eeprom, Field};

/// Where the upload sequence currently stands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UploadState {
    /// No sequence started since boot.
    #[default]
    Idle,
    Init,
    NameSend,
    NameDone,
    UsernameSend,
    UsernameDone,
    PassSend,
    /// Sequence finished; the record was committed or discarded.
    PassDone,
}

impl UploadState {
    /// Whether `tag` may follow this state.
    ///
    /// A `*_DONE` may also directly follow the previous field's marker,
    /// which lets a host skip the `*_SEND` chunk of an empty field.
    fn accepts(self, tag: UploadTag) -> bool {
        use UploadState as S;
        match tag {
            UploadTag::Init => true,
            UploadTag::NameSend => matches!(self, S::Init | S::NameSend),
            UploadTag::NameDone => matches!(self, S::Init | S::NameSend),
            UploadTag::UsernameSend => matches!(self, S::NameDone | S::UsernameSend),
            UploadTag::UsernameDone => matches!(self, S::NameDone | S::UsernameSend),
            UploadTag::PassSend => matches!(self, S::UsernameDone | S::PassSend),
            UploadTag::PassDone => matches!(self, S::UsernameDone | S::PassSend),
        }
    }
}

impl From<UploadTag> for UploadState {
    fn from(tag: UploadTag) -> Self {
        match tag {
            UploadTag::Init => UploadState::Init,
            UploadTag::NameSend => UploadState::NameSend,
            UploadTag::NameDone => UploadState::NameDone,
            UploadTag::UsernameSend => UploadState::UsernameSend,
            UploadTag::UsernameDone => UploadState::UsernameDone,
            UploadTag::PassSend => UploadState::PassSend,
            UploadTag::PassDone => UploadState::PassDone,
        }
    }
}

/// Result of feeding one accepted chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadProgress {
    /// Staging was reset or a field was closed.
    Advanced(UploadState),
    /// Field bytes were staged; `dropped` bytes did not fit.
    Staged { written: usize, dropped: usize },
    /// The record was committed to `slot`.
    Committed { slot: u8 },
    /// The sequence completed but the store refused the record.
    NotCommitted(Error),
}

/// Write position inside the field currently being streamed.
#[derive(Clone, Copy, Debug, Default)]
struct FieldCursor {
    pos: usize,
}

impl FieldCursor {
    /// Copy as much of `data` as fits into `field` at the cursor.
    /// Returns the number of bytes written.
    fn write(&mut self, field: &mut [u8], data: &[u8]) -> usize {
        let room = field.len().saturating_sub(self.pos);
        let n = room.min(data.len());
        field[self.pos..self.pos + n].copy_from_slice(&data[..n]);
        self.pos += n;
        n
    }

    fn reset(&mut self) {
        self.pos = 0;
    }
}

/// Record under construction. Raw padded buffers; termination is only
/// applied when the record is finalised.
struct Staging {
    name: [u8; NAME_LEN],
    username: [u8; USERNAME_LEN],
    password: [u8; PASSWORD_LEN],
}

impl Staging {
    const fn new() -> Self {
        Self {
            name: [0; NAME_LEN],
            username: [0; USERNAME_LEN],
            password: [0; PASSWORD_LEN],
        }
    }

    fn clear(&mut self) {
        self.name = [0; NAME_LEN];
        self.username = [0; USERNAME_LEN];
        self.password = [0; PASSWORD_LEN];
    }

    fn to_record(&self) -> CredentialRecord {
        CredentialRecord {
            name: Field::from_padded(&self.name),
            username: Field::from_padded(&self.username),
            password: Field::from_padded(&self.password),
        }
    }
}

/// Upload protocol driver. Owns the staging record and cursor.
pub struct UploadMachine {
    state: UploadState,
    cursor: FieldCursor,
    staging: Staging,
}

impl UploadMachine {
    pub const fn new() -> Self {
        Self {
            state: UploadState::Idle,
            cursor: FieldCursor { pos: 0 },
            staging: Staging::new(),
        }
    }

    pub fn state(&self) -> UploadState {
        self.state
    }

    /// Feed one chunk.
    ///
    /// Refused outright (`Error::Locked`) while the gate is locked, and
    /// with `Error::UnexpectedTag` when the tag is out of order; in both
    /// cases nothing changes. A store refusal on `PASS_DONE` is reported
    /// as [`UploadProgress::NotCommitted`], not as an error: the transfer
    /// itself succeeded.
    pub fn handle<E: Eeprom>(
        &mut self,
        chunk: &Chunk<'_>,
        gate: &AuthGate,
        store: &mut CredentialStore<E>,
    ) -> Result<UploadProgress> {
        if !gate.is_unlocked() {
            return Err(Error::Locked);
        }
        if !self.state.accepts(chunk.tag) {
            warn!("Upload: tag {} refused in state {}", chunk.tag, self.state);
            return Err(Error::UnexpectedTag);
        }

        self.state = chunk.tag.into();

        let progress = match chunk.tag {
            UploadTag::Init => {
                self.staging.clear();
                self.cursor.reset();
                debug!("Upload: started");
                UploadProgress::Advanced(self.state)
            }
            UploadTag::NameSend => self.stage(Target::Name, chunk.data),
            UploadTag::UsernameSend => self.stage(Target::Username, chunk.data),
            UploadTag::PassSend => self.stage(Target::Password, chunk.data),
            UploadTag::NameDone | UploadTag::UsernameDone => {
                self.cursor.reset();
                UploadProgress::Advanced(self.state)
            }
            UploadTag::PassDone => self.commit(store),
        };
        Ok(progress)
    }

    fn stage(&mut self, target: Target, data: &[u8]) -> UploadProgress {
        let field: &mut [u8] = match target {
            Target::Name => &mut self.staging.name,
            Target::Username => &mut self.staging.username,
            Target::Password => &mut self.staging.password,
        };
        let written = self.cursor.write(field, data);
        let dropped = data.len() - written;
        if dropped > 0 {
            warn!("Upload: field full, dropped {=usize} bytes", dropped);
        }
        UploadProgress::Staged { written, dropped }
    }

    fn commit<E: Eeprom>(&mut self, store: &mut CredentialStore<E>) -> UploadProgress {
        let mut record = self.staging.to_record();
        let result = store.append(&record);

        record.clear();
        self.staging.clear();
        self.cursor.reset();

        match result {
            Ok(slot) => {
                info!("Upload: committed to slot {=u8}", slot);
                UploadProgress::Committed { slot }
            }
            Err(e) => {
                warn!("Upload: not committed: {}", e);
                UploadProgress::NotCommitted(e)
            }
        }
    }
}

impl Default for UploadMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy)]
enum Target {
    Name,
    Username,
    Password,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthState;
    use crate::config::MAX_SLOTS;
    use crate::protocol::upload_chunks;
    use crate::store::RamEeprom;

    const KEY: [u8; 7] = *b"letmein";

    struct Rig {
        store: CredentialStore<RamEeprom>,
        gate: AuthGate,
        upload: UploadMachine,
    }

    impl Rig {
        fn new(unlocked: bool) -> Self {
            let mut store = CredentialStore::open(RamEeprom::new()).unwrap();
            store.set_master_key(&KEY).unwrap();
            let mut gate = AuthGate::new();
            if unlocked {
                assert_eq!(
                    gate.try_unlock(&KEY, &mut store).unwrap(),
                    AuthState::Unlocked
                );
            }
            Self {
                store,
                gate,
                upload: UploadMachine::new(),
            }
        }

        fn send(&mut self, tag: UploadTag, data: &[u8]) -> Result<UploadProgress> {
            let chunk = Chunk { tag, data };
            self.upload.handle(&chunk, &self.gate, &mut self.store)
        }

        fn send_record(&mut self, record: &CredentialRecord) -> Option<UploadProgress> {
            let mut last = None;
            for payload in upload_chunks(record) {
                let chunk = Chunk::parse(&payload).unwrap();
                last = Some(self.upload.handle(&chunk, &self.gate, &mut self.store).unwrap());
            }
            last
        }
    }

    #[test]
    fn full_sequence_commits_record() {
        let mut rig = Rig::new(true);
        let record = CredentialRecord::new(b"site", b"user@x.com", b"Pw1").unwrap();
        assert_eq!(
            rig.send_record(&record),
            Some(UploadProgress::Committed { slot: 0 })
        );
        assert_eq!(rig.store.count(), 1);
        assert_eq!(rig.store.read(0).unwrap(), record);
        assert_eq!(rig.upload.state(), UploadState::PassDone);
    }

    #[test]
    fn field_streams_across_several_chunks() {
        let mut rig = Rig::new(true);
        rig.send(UploadTag::Init, &[]).unwrap();
        rig.send(UploadTag::NameSend, b"n").unwrap();
        rig.send(UploadTag::NameDone, &[]).unwrap();
        rig.send(UploadTag::UsernameSend, b"abc").unwrap();
        rig.send(UploadTag::UsernameSend, b"defghij").unwrap();
        rig.send(UploadTag::UsernameSend, b"kl").unwrap();
        rig.send(UploadTag::UsernameDone, &[]).unwrap();
        rig.send(UploadTag::PassSend, b"pw").unwrap();
        rig.send(UploadTag::PassDone, &[]).unwrap();

        let back = rig.store.read(0).unwrap();
        assert_eq!(back.name.as_bytes(), b"n");
        assert_eq!(back.username.as_bytes(), b"abcdefghijkl");
        assert_eq!(back.password.as_bytes(), b"pw");
    }

    #[test]
    fn overlong_field_is_clamped_not_overflowed() {
        let mut rig = Rig::new(true);
        rig.send(UploadTag::Init, &[]).unwrap();
        assert_eq!(
            rig.send(UploadTag::NameSend, b"0123456").unwrap(),
            UploadProgress::Staged {
                written: 7,
                dropped: 0
            }
        );
        assert_eq!(
            rig.send(UploadTag::NameSend, b"789ABCD").unwrap(),
            UploadProgress::Staged {
                written: 3,
                dropped: 4
            }
        );
        assert_eq!(
            rig.send(UploadTag::NameSend, b"EFG").unwrap(),
            UploadProgress::Staged {
                written: 0,
                dropped: 3
            }
        );
        rig.send(UploadTag::NameDone, &[]).unwrap();
        rig.send(UploadTag::UsernameSend, b"u").unwrap();
        rig.send(UploadTag::UsernameDone, &[]).unwrap();
        rig.send(UploadTag::PassSend, b"p").unwrap();
        rig.send(UploadTag::PassDone, &[]).unwrap();

        let back = rig.store.read(0).unwrap();
        assert_eq!(back.name.as_bytes(), b"0123456789");
        // username starts at its own offset 0, untouched by the name overflow
        assert_eq!(back.username.as_bytes(), b"u");
    }

    #[test]
    fn locked_gate_refuses_everything() {
        let mut rig = Rig::new(false);
        let before = *rig.store.eeprom().image();
        let record = CredentialRecord::new(b"x", b"y", b"z").unwrap();

        for payload in upload_chunks(&record) {
            let chunk = Chunk::parse(&payload).unwrap();
            assert_eq!(
                rig.upload.handle(&chunk, &rig.gate, &mut rig.store),
                Err(Error::Locked)
            );
        }
        assert_eq!(rig.upload.state(), UploadState::Idle);
        assert_eq!(rig.store.count(), 0);
        assert_eq!(rig.store.eeprom().image(), &before);
    }

    #[test]
    fn out_of_order_tag_is_refused_without_state_change() {
        let mut rig = Rig::new(true);
        assert_eq!(
            rig.send(UploadTag::PassDone, &[]),
            Err(Error::UnexpectedTag)
        );
        rig.send(UploadTag::Init, &[]).unwrap();
        rig.send(UploadTag::NameSend, b"ab").unwrap();
        assert_eq!(
            rig.send(UploadTag::PassSend, b"zz"),
            Err(Error::UnexpectedTag)
        );
        assert_eq!(rig.upload.state(), UploadState::NameSend);
        assert_eq!(rig.store.count(), 0);
    }

    #[test]
    fn empty_field_may_skip_its_send_chunk() {
        let mut rig = Rig::new(true);
        rig.send(UploadTag::Init, &[]).unwrap();
        rig.send(UploadTag::NameSend, b"n").unwrap();
        rig.send(UploadTag::NameDone, &[]).unwrap();
        rig.send(UploadTag::UsernameDone, &[]).unwrap();
        rig.send(UploadTag::PassSend, b"p").unwrap();
        assert_eq!(
            rig.send(UploadTag::PassDone, &[]).unwrap(),
            UploadProgress::Committed { slot: 0 }
        );
        assert!(rig.store.read(0).unwrap().username.is_empty());
    }

    #[test]
    fn init_restarts_half_finished_upload() {
        let mut rig = Rig::new(true);
        rig.send(UploadTag::Init, &[]).unwrap();
        rig.send(UploadTag::NameSend, b"stale").unwrap();
        rig.send(UploadTag::NameDone, &[]).unwrap();
        rig.send(UploadTag::UsernameSend, b"stale-user").unwrap();

        let record = CredentialRecord::new(b"new", b"u", b"p").unwrap();
        rig.send_record(&record);
        assert_eq!(rig.store.read(0).unwrap(), record);
    }

    #[test]
    fn store_full_completes_without_commit() {
        let mut rig = Rig::new(true);
        let record = CredentialRecord::new(b"n", b"u", b"p").unwrap();
        for _ in 0..MAX_SLOTS {
            rig.send_record(&record);
        }
        assert_eq!(
            rig.send_record(&record),
            Some(UploadProgress::NotCommitted(Error::StoreFull))
        );
        assert_eq!(rig.store.count(), MAX_SLOTS);
        assert_eq!(rig.upload.state(), UploadState::PassDone);
    }

    #[test]
    fn staging_is_cleared_after_commit() {
        let mut rig = Rig::new(true);
        let record = CredentialRecord::new(b"longname", b"longuser", b"longpass").unwrap();
        rig.send_record(&record);

        // second upload with shorter fields must not inherit leftovers
        let short = CredentialRecord::new(b"ab", b"cd", b"ef").unwrap();
        rig.send_record(&short);
        assert_eq!(rig.store.read(1).unwrap(), short);
    }

    #[test]
    fn done_after_commit_needs_new_init() {
        let mut rig = Rig::new(true);
        let record = CredentialRecord::new(b"n", b"u", b"p").unwrap();
        rig.send_record(&record);
        assert_eq!(
            rig.send(UploadTag::PassDone, &[]),
            Err(Error::UnexpectedTag)
        );
        assert_eq!(rig.store.count(), 1);
    }
}
