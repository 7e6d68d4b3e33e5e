//! Object identification and canonical envelope format.

use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 32-byte BLAKE3 content hash identifying a blob, tree or commit.
///
/// Two trees with the same full path to content mapping always hash to the
/// same ObjectId, which is what lets a staged tree be compared against the
/// tree recorded on a commit.
///
/// # Examples
///
/// ```
/// use tfsync_core::ObjectId;
///
/// let id = ObjectId::from_bytes([0xab; 32]);
/// assert_eq!(id.as_hex().len(), 64);
/// assert_eq!(id.shard(), "ab");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId([u8; 32]);

impl ObjectId {
    /// The length of an ObjectId as a hex string.
    pub const HEX_LEN: usize = 64;

    /// Creates an ObjectId from raw bytes.
    #[inline]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying hash bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns this ObjectId as a lowercase hex string.
    pub fn as_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Returns the first 8 hex characters, for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Returns the shard prefix (first 2 hex characters).
    ///
    /// Objects live at `.tfsync/objects/{shard}/{full_hex}`.
    pub fn shard(&self) -> String {
        hex::encode(&self.0[..1])
    }

    /// Parses an ObjectId from a hex string.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::InvalidHex` if the string is not valid hex
    /// or is not exactly 64 characters long.
    ///
    /// # Examples
    ///
    /// ```
    /// use tfsync_core::ObjectId;
    ///
    /// let hex = "c".repeat(64);
    /// let id = ObjectId::from_hex(&hex).unwrap();
    /// assert_eq!(id.as_hex(), hex);
    /// ```
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.len() != Self::HEX_LEN {
            return Err(SyncError::InvalidHex(format!(
                "expected {} hex chars, got {}",
                Self::HEX_LEN,
                s.len()
            )));
        }

        let bytes = hex::decode(s).map_err(|e| SyncError::InvalidHex(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| SyncError::InvalidHex("invalid length".to_string()))?;

        Ok(Self(arr))
    }

    /// Computes the ObjectId of a payload of the given kind.
    pub(crate) fn hash_object(kind: ObjectKind, payload: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&envelope_header(kind, payload.len() as u64));
        hasher.update(payload);
        Self(*hasher.finalize().as_bytes())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({}...)", &self.as_hex()[..12])
    }
}

/// Object kind discriminant for the canonical envelope.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ObjectKind {
    /// File content
    Blob = 1,
    /// Sorted directory listing
    Tree = 2,
    /// Commit record for one replayed changeset
    Commit = 3,
}

impl ObjectKind {
    pub(crate) fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::Blob),
            2 => Some(Self::Tree),
            3 => Some(Self::Commit),
            _ => None,
        }
    }
}

/// Canonical envelope magic bytes.
pub(crate) const MAGIC: &[u8; 5] = b"TFSO1";

/// Size of the envelope header preceding the payload.
pub(crate) const HEADER_LEN: usize = 5 + 1 + 8;

/// Builds the envelope header.
///
/// Format:
/// - Magic: "TFSO1" (5 bytes)
/// - Kind: u8 (1 byte)
/// - Length: u64 LE (8 bytes)
pub(crate) fn envelope_header(kind: ObjectKind, len: u64) -> [u8; HEADER_LEN] {
    let mut out = [0u8; HEADER_LEN];
    out[..5].copy_from_slice(MAGIC);
    out[5] = kind as u8;
    out[6..].copy_from_slice(&len.to_le_bytes());
    out
}

/// Constructs the full canonical bytes (header followed by payload).
pub(crate) fn canonical_bytes(kind: ObjectKind, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(&envelope_header(kind, payload.len() as u64));
    out.extend_from_slice(payload);
    out
}
