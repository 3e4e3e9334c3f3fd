//! Credential record and its fixed-width fields.
//!
//! Layout of one persisted block (63 bytes):
//! ```text
//! | name (10) | username (32) | password (21) |
//! ```
//! Each field is NUL-padded to its width. A field with no NUL inside its
//! width occupies the full width.

use core::fmt;

use crate::config::{
    BLOCK_LEN, NAME_LEN, NAME_OFFSET, PASSWORD_LEN, PASSWORD_OFFSET, USERNAME_LEN,
    USERNAME_OFFSET,
};
use crate::error::{Error, Result};

/// Fixed-capacity byte field with an explicit logical length.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Field<const N: usize> {
    bytes: [u8; N],
    len: usize,
}

impl<const N: usize> Field<N> {
    /// Field width in bytes.
    pub const CAPACITY: usize = N;

    /// An empty, all-zero field.
    pub const fn empty() -> Self {
        Self {
            bytes: [0; N],
            len: 0,
        }
    }

    /// Build a field from a logical value. Fails if the value is wider than `N`.
    ///
    /// A NUL inside `value` ends the logical value there, exactly as it
    /// would once persisted and read back.
    pub fn new(value: &[u8]) -> Result<Self> {
        if value.len() > N {
            return Err(Error::FieldTooLong);
        }
        let mut raw = [0u8; N];
        raw[..value.len()].copy_from_slice(value);
        Ok(Self::from_padded(&raw))
    }

    /// Decode a NUL-padded field. The logical length is computed once here.
    pub fn from_padded(raw: &[u8; N]) -> Self {
        let len = raw.iter().position(|&b| b == 0).unwrap_or(N);
        let mut bytes = [0u8; N];
        bytes[..len].copy_from_slice(&raw[..len]);
        Self { bytes, len }
    }

    /// Logical content (up to the first NUL or the full width).
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// The NUL-padded on-wire form.
    pub fn padded(&self) -> &[u8; N] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Byte at `index` of the logical value.
    pub fn get(&self, index: usize) -> Option<u8> {
        self.as_bytes().get(index).copied()
    }

    /// Overwrite the contents with zeros.
    pub fn clear(&mut self) {
        self.bytes = [0; N];
        self.len = 0;
    }
}

impl<const N: usize> Default for Field<N> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<const N: usize> fmt::Debug for Field<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match core::str::from_utf8(self.as_bytes()) {
            Ok(s) => write!(f, "{:?}", s),
            Err(_) => write!(f, "{:?}", self.as_bytes()),
        }
    }
}

/// One stored login: what to show, what to type, and the secret.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct CredentialRecord {
    pub name: Field<NAME_LEN>,
    pub username: Field<USERNAME_LEN>,
    pub password: Field<PASSWORD_LEN>,
}

impl CredentialRecord {
    pub const fn empty() -> Self {
        Self {
            name: Field::empty(),
            username: Field::empty(),
            password: Field::empty(),
        }
    }

    /// Build a record from logical values, rejecting any over-wide field.
    pub fn new(name: &[u8], username: &[u8], password: &[u8]) -> Result<Self> {
        Ok(Self {
            name: Field::new(name)?,
            username: Field::new(username)?,
            password: Field::new(password)?,
        })
    }

    /// Serialise into one persisted block.
    pub fn encode(&self) -> [u8; BLOCK_LEN] {
        let mut block = [0u8; BLOCK_LEN];
        block[NAME_OFFSET..USERNAME_OFFSET].copy_from_slice(self.name.padded());
        block[USERNAME_OFFSET..PASSWORD_OFFSET].copy_from_slice(self.username.padded());
        block[PASSWORD_OFFSET..].copy_from_slice(self.password.padded());
        block
    }

    /// Parse one persisted block.
    pub fn decode(block: &[u8; BLOCK_LEN]) -> Self {
        let mut name = [0u8; NAME_LEN];
        let mut username = [0u8; USERNAME_LEN];
        let mut password = [0u8; PASSWORD_LEN];
        name.copy_from_slice(&block[NAME_OFFSET..USERNAME_OFFSET]);
        username.copy_from_slice(&block[USERNAME_OFFSET..PASSWORD_OFFSET]);
        password.copy_from_slice(&block[PASSWORD_OFFSET..]);
        Self {
            name: Field::from_padded(&name),
            username: Field::from_padded(&username),
            password: Field::from_padded(&password),
        }
    }

    /// Zero every field.
    pub fn clear(&mut self) {
        self.name.clear();
        self.username.clear();
        self.password.clear();
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("name", &self.name)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_logical_length_stops_at_first_nul() {
        let raw = *b"abc\0def\0\0\0";
        let field = Field::<10>::from_padded(&raw);
        assert_eq!(field.as_bytes(), b"abc");
        assert_eq!(field.len(), 3);
        // bytes after the terminator are not carried forward
        assert_eq!(field.padded(), b"abc\0\0\0\0\0\0\0");
    }

    #[test]
    fn field_without_nul_fills_full_width() {
        let raw = *b"0123456789";
        let field = Field::<10>::from_padded(&raw);
        assert_eq!(field.len(), 10);
        assert_eq!(field.as_bytes(), b"0123456789");
    }

    #[test]
    fn field_rejects_over_wide_value() {
        assert_eq!(Field::<4>::new(b"abcde"), Err(Error::FieldTooLong));
        assert!(Field::<4>::new(b"abcd").is_ok());
    }

    #[test]
    fn erased_memory_decodes_as_full_width_fields() {
        let block = [0xFF; BLOCK_LEN];
        let record = CredentialRecord::decode(&block);
        assert_eq!(record.name.len(), NAME_LEN);
        assert_eq!(record.password.len(), PASSWORD_LEN);
    }

    #[test]
    fn block_places_fields_at_fixed_offsets() {
        let record = CredentialRecord::new(b"site", b"user@x.com", b"Pw1").unwrap();
        let block = record.encode();
        assert_eq!(&block[0..4], b"site");
        assert_eq!(block[4], 0);
        assert_eq!(&block[10..20], b"user@x.com");
        assert_eq!(&block[42..45], b"Pw1");
        assert_eq!(CredentialRecord::decode(&block), record);
    }

    #[test]
    fn debug_output_hides_password() {
        let record = CredentialRecord::new(b"mail", b"me", b"hunter2").unwrap();
        let text = format!("{:?}", record);
        assert!(text.contains("mail"));
        assert!(!text.contains("hunter2"));
    }

    #[test]
    fn clear_zeroes_every_field() {
        let mut record = CredentialRecord::new(b"a", b"b", b"c").unwrap();
        record.clear();
        assert_eq!(record, CredentialRecord::default());
        assert_eq!(record.encode(), [0u8; BLOCK_LEN]);
    }
}
