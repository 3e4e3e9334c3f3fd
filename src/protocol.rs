//! Vendor control-transfer protocol.
//!
//! The host drives the stick with vendor requests on endpoint 0:
//!
//! | bRequest        | Dir | Data stage                         |
//! |-----------------|-----|------------------------------------|
//! | LED_OFF (0)     | IN  | none                               |
//! | LED_ON (1)      | IN  | none                               |
//! | CLEAR_EEPROM (2)| OUT | none, `wValue != 0` also resets key|
//! | ID_UPLOAD (3)   | OUT | tag + up to 7 field bytes          |
//! | UNLOCK (15)     | OUT | `TAG_UNLOCK` + 7 key bytes         |
//! | INIT (16)       | OUT | `TAG_INIT` + 7 key bytes           |
//!
//! Decoding turns a raw request into a typed [`Command`]. The encoder
//! half ([`upload_chunks`], [`unlock_payload`], [`init_payload`]) is the
//! host's side of the contract: it produces exactly the payload sequence
//! the device expects.

use heapless::Vec;

use crate::config::{
    CHUNK_DATA_LEN, CHUNK_LEN, MASTER_KEY_LEN, REQ_CLEAR_EEPROM, REQ_ID_UPLOAD, REQ_INIT_DEVICE,
    REQ_LED_OFF, REQ_LED_ON, REQ_UNLOCK_DEVICE, TAG_INIT, TAG_NAME_DONE, TAG_NAME_SEND,
    TAG_PASS_DONE, TAG_PASS_SEND, TAG_UNLOCK, TAG_UPLOAD_INIT, TAG_USERNAME_DONE,
    TAG_USERNAME_SEND,
};
use crate::error::{Error, Result};
use crate::store::{CredentialRecord, MasterKey};

/// State tag leading every ID_UPLOAD payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UploadTag {
    Init,
    NameSend,
    NameDone,
    UsernameSend,
    UsernameDone,
    PassSend,
    PassDone,
}

impl UploadTag {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            TAG_UPLOAD_INIT => Some(UploadTag::Init),
            TAG_NAME_SEND => Some(UploadTag::NameSend),
            TAG_NAME_DONE => Some(UploadTag::NameDone),
            TAG_USERNAME_SEND => Some(UploadTag::UsernameSend),
            TAG_USERNAME_DONE => Some(UploadTag::UsernameDone),
            TAG_PASS_SEND => Some(UploadTag::PassSend),
            TAG_PASS_DONE => Some(UploadTag::PassDone),
            _ => None,
        }
    }

    pub const fn byte(self) -> u8 {
        match self {
            UploadTag::Init => TAG_UPLOAD_INIT,
            UploadTag::NameSend => TAG_NAME_SEND,
            UploadTag::NameDone => TAG_NAME_DONE,
            UploadTag::UsernameSend => TAG_USERNAME_SEND,
            UploadTag::UsernameDone => TAG_USERNAME_DONE,
            UploadTag::PassSend => TAG_PASS_SEND,
            UploadTag::PassDone => TAG_PASS_DONE,
        }
    }
}

/// One ID_UPLOAD payload: tag plus at most 7 data bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub tag: UploadTag,
    pub data: &'a [u8],
}

impl<'a> Chunk<'a> {
    /// Split a raw payload. Bytes past the 8-byte chunk are dropped.
    pub fn parse(payload: &'a [u8]) -> Result<Self> {
        let (&tag, rest) = payload.split_first().ok_or(Error::MalformedPayload)?;
        let tag = UploadTag::from_byte(tag).ok_or(Error::UnexpectedTag)?;
        let data = &rest[..rest.len().min(CHUNK_DATA_LEN)];
        Ok(Self { tag, data })
    }
}

/// A decoded vendor request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command<'a> {
    LedOn,
    LedOff,
    ClearEeprom { reset_key: bool },
    Unlock(MasterKey),
    InitDevice(MasterKey),
    Upload(Chunk<'a>),
}

impl<'a> Command<'a> {
    /// Decode `bRequest`, `wValue` and the data stage of a vendor request.
    pub fn parse(request: u8, value: u16, data: &'a [u8]) -> Result<Self> {
        match request {
            REQ_LED_ON => Ok(Command::LedOn),
            REQ_LED_OFF => Ok(Command::LedOff),
            REQ_CLEAR_EEPROM => Ok(Command::ClearEeprom {
                reset_key: value != 0,
            }),
            REQ_UNLOCK_DEVICE => key_payload(TAG_UNLOCK, data).map(Command::Unlock),
            REQ_INIT_DEVICE => key_payload(TAG_INIT, data).map(Command::InitDevice),
            REQ_ID_UPLOAD => Chunk::parse(data).map(Command::Upload),
            _ => Err(Error::UnknownRequest),
        }
    }

    /// Whether the request needs an unlocked device to have any effect.
    pub fn is_privileged(&self) -> bool {
        matches!(self, Command::ClearEeprom { .. } | Command::Upload(_))
    }
}

fn key_payload(tag: u8, data: &[u8]) -> Result<MasterKey> {
    if data.len() < 1 + MASTER_KEY_LEN {
        return Err(Error::MalformedPayload);
    }
    if data[0] != tag {
        return Err(Error::UnexpectedTag);
    }
    let mut key = [0u8; MASTER_KEY_LEN];
    key.copy_from_slice(&data[1..1 + MASTER_KEY_LEN]);
    Ok(key)
}

// Host side of the contract

/// Raw control payload as the host sends it.
pub type Payload = Vec<u8, CHUNK_LEN>;

/// UNLOCK_DEVICE data stage for `key`.
pub fn unlock_payload(key: &MasterKey) -> [u8; CHUNK_LEN] {
    tagged_key(TAG_UNLOCK, key)
}

/// INIT_DEVICE data stage for `key`.
pub fn init_payload(key: &MasterKey) -> [u8; CHUNK_LEN] {
    tagged_key(TAG_INIT, key)
}

fn tagged_key(tag: u8, key: &MasterKey) -> [u8; CHUNK_LEN] {
    let mut out = [0u8; CHUNK_LEN];
    out[0] = tag;
    out[1..].copy_from_slice(key);
    out
}

/// The full ID_UPLOAD payload sequence for `record`, in protocol order.
///
/// Each field goes out as one or more `*_SEND` chunks of at most 7 bytes
/// (at least one, even for an empty field), followed by its `*_DONE`
/// marker. Marker chunks are zero-padded to 8 bytes; data chunks carry
/// only the tag and the bytes they hold.
pub fn upload_chunks(record: &CredentialRecord) -> UploadChunks<'_> {
    UploadChunks {
        record,
        step: Step::Init,
        offset: 0,
    }
}

/// Iterator returned by [`upload_chunks`].
pub struct UploadChunks<'a> {
    record: &'a CredentialRecord,
    step: Step,
    offset: usize,
}

#[derive(Clone, Copy)]
enum Step {
    Init,
    Send(Part),
    Done(Part),
    End,
}

#[derive(Clone, Copy)]
enum Part {
    Name,
    Username,
    Password,
}

impl Part {
    fn value(self, record: &CredentialRecord) -> &[u8] {
        match self {
            Part::Name => record.name.as_bytes(),
            Part::Username => record.username.as_bytes(),
            Part::Password => record.password.as_bytes(),
        }
    }

    fn tags(self) -> (UploadTag, UploadTag) {
        match self {
            Part::Name => (UploadTag::NameSend, UploadTag::NameDone),
            Part::Username => (UploadTag::UsernameSend, UploadTag::UsernameDone),
            Part::Password => (UploadTag::PassSend, UploadTag::PassDone),
        }
    }

    fn next(self) -> Step {
        match self {
            Part::Name => Step::Send(Part::Username),
            Part::Username => Step::Send(Part::Password),
            Part::Password => Step::End,
        }
    }
}

/// Tag followed by up to [`CHUNK_DATA_LEN`] bytes, zero-padded to `len`.
fn chunk(tag: UploadTag, data: &[u8], len: usize) -> Option<Payload> {
    let mut buf = [0u8; CHUNK_LEN];
    buf[0] = tag.byte();
    let data = &data[..data.len().min(CHUNK_DATA_LEN)];
    buf[1..1 + data.len()].copy_from_slice(data);
    Payload::from_slice(&buf[..len.clamp(1 + data.len(), CHUNK_LEN)]).ok()
}

fn marker(tag: UploadTag) -> Option<Payload> {
    chunk(tag, &[], CHUNK_LEN)
}

impl Iterator for UploadChunks<'_> {
    type Item = Payload;

    fn next(&mut self) -> Option<Payload> {
        match self.step {
            Step::Init => {
                self.step = Step::Send(Part::Name);
                marker(UploadTag::Init)
            }
            Step::Send(part) => {
                let value = part.value(self.record);
                let end = (self.offset + CHUNK_DATA_LEN).min(value.len());

                let out = chunk(part.tags().0, &value[self.offset..end], 0);

                self.offset = end;
                if self.offset >= value.len() {
                    self.offset = 0;
                    self.step = Step::Done(part);
                }
                out
            }
            Step::Done(part) => {
                self.step = part.next();
                marker(part.tags().1)
            }
            Step::End => None,
        }
    }
}
