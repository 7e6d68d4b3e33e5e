//! Content-addressed object storage with integrity verification.

use crate::error::{Result, SyncError};
use crate::object_id::{canonical_bytes, ObjectId, ObjectKind, HEADER_LEN, MAGIC};
use crate::types::{LogEntry, Tree};
use serde::{de::DeserializeOwned, Serialize};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Maximum size for a single blob object (512 MB).
const MAX_BLOB_SIZE: u64 = 512 * 1024 * 1024;

/// Default zstd level. Level 3 balances ratio against speed.
pub(crate) const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Content-addressed object storage.
///
/// Blobs, trees and commits are stored as zstd-compressed files whose path is
/// derived from their BLAKE3 hash. Writing the same content twice is a no-op.
///
/// # Examples
///
/// ```
/// use tfsync_core::ObjectStore;
/// use tempfile::TempDir;
///
/// let tmp = TempDir::new().unwrap();
/// let store = ObjectStore::new(tmp.path().join("objects"));
///
/// let id = store.put_blob(b"hello world").unwrap();
/// assert_eq!(store.get_blob(id).unwrap(), b"hello world");
/// ```
pub struct ObjectStore {
    root: PathBuf,
    compression_level: i32,
}

impl ObjectStore {
    /// Creates a new ObjectStore at the given root directory.
    ///
    /// Shard directories are created lazily on first write.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }

    /// Overrides the zstd compression level used for new objects.
    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }

    /// Returns the root directory of this object store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stores file content and returns its id.
    pub fn put_blob(&self, data: &[u8]) -> Result<ObjectId> {
        if data.len() as u64 > MAX_BLOB_SIZE {
            return Err(SyncError::BlobTooLarge {
                size: data.len() as u64,
                limit: MAX_BLOB_SIZE,
            });
        }
        self.put_object(ObjectKind::Blob, data)
    }

    /// Drains a reader and stores its bytes as a blob.
    ///
    /// # Errors
    ///
    /// Returns `BlobTooLarge` if the reader yields more than the blob limit,
    /// and propagates any read failure from the reader.
    pub fn put_blob_from(&self, reader: &mut dyn Read) -> Result<ObjectId> {
        let mut data = Vec::new();
        reader.take(MAX_BLOB_SIZE + 1).read_to_end(&mut data)?;
        self.put_blob(&data)
    }

    /// Retrieves file content by id.
    pub fn get_blob(&self, id: ObjectId) -> Result<Vec<u8>> {
        self.read_kind(id, ObjectKind::Blob)
    }

    /// Stores a directory listing.
    pub fn put_tree(&self, tree: &Tree) -> Result<ObjectId> {
        self.put_encoded(ObjectKind::Tree, tree)
    }

    /// Loads a directory listing.
    pub fn get_tree(&self, id: ObjectId) -> Result<Tree> {
        self.get_encoded(id, ObjectKind::Tree)
    }

    /// Stores a commit record.
    pub fn put_commit(&self, commit: &LogEntry) -> Result<ObjectId> {
        self.put_encoded(ObjectKind::Commit, commit)
    }

    /// Loads a commit record.
    pub fn get_commit(&self, id: ObjectId) -> Result<LogEntry> {
        self.get_encoded(id, ObjectKind::Commit)
    }

    /// Checks if an object exists in the store.
    pub fn exists(&self, id: ObjectId) -> bool {
        self.object_path(id).exists()
    }

    /// Reads an object back and re-hashes it, returning an error on any
    /// integrity failure.
    pub fn verify_object(&self, id: ObjectId) -> Result<()> {
        self.read_object(id).map(|_| ())
    }

    fn put_encoded<T: Serialize>(&self, kind: ObjectKind, value: &T) -> Result<ObjectId> {
        let payload =
            postcard::to_allocvec(value).map_err(|e| SyncError::Serialization(e.to_string()))?;
        self.put_object(kind, &payload)
    }

    fn get_encoded<T: DeserializeOwned>(&self, id: ObjectId, kind: ObjectKind) -> Result<T> {
        let payload = self.read_kind(id, kind)?;
        postcard::from_bytes(&payload).map_err(|e| SyncError::Deserialization(e.to_string()))
    }

    fn put_object(&self, kind: ObjectKind, payload: &[u8]) -> Result<ObjectId> {
        let id = ObjectId::hash_object(kind, payload);
        if self.exists(id) {
            return Ok(id);
        }
        self.write_object(id, &canonical_bytes(kind, payload))?;
        Ok(id)
    }

    fn read_kind(&self, id: ObjectId, expected: ObjectKind) -> Result<Vec<u8>> {
        let (kind, payload) = self.read_object(id)?;
        if kind != expected {
            return Err(SyncError::CorruptedObject {
                path: self.object_path(id),
                reason: format!("expected {:?}, got {:?}", expected, kind),
            });
        }
        Ok(payload)
    }

    /// Computes the filesystem path for an object.
    fn object_path(&self, id: ObjectId) -> PathBuf {
        self.root.join(id.shard()).join(id.as_hex())
    }

    /// Writes compressed canonical bytes to disk atomically.
    fn write_object(&self, id: ObjectId, canonical: &[u8]) -> Result<()> {
        let path = self.object_path(id);
        let dir = self.root.join(id.shard());
        fs::create_dir_all(&dir)?;

        let compressed = zstd::encode_all(canonical, self.compression_level)
            .map_err(|e| SyncError::Compression(e.to_string()))?;

        // Atomic write: temp file + fsync + rename
        let tmp_path = path.with_extension("tmp");
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&compressed)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &path)?;

        #[cfg(unix)]
        {
            if let Ok(dir_file) = File::open(&dir) {
                let _ = dir_file.sync_all();
            }
        }

        Ok(())
    }

    /// Reads and verifies an object from disk.
    fn read_object(&self, id: ObjectId) -> Result<(ObjectKind, Vec<u8>)> {
        let path = self.object_path(id);
        if !path.exists() {
            return Err(SyncError::ObjectNotFound(id.as_hex()));
        }

        let compressed = fs::read(&path)?;
        let canonical = zstd::decode_all(compressed.as_slice())
            .map_err(|e| SyncError::Compression(e.to_string()))?;

        if canonical.len() < HEADER_LEN {
            return Err(SyncError::CorruptedObject {
                path,
                reason: "object too small".to_string(),
            });
        }
        if &canonical[..5] != MAGIC {
            return Err(SyncError::CorruptedObject {
                path,
                reason: "invalid magic bytes".to_string(),
            });
        }
        let Some(kind) = ObjectKind::from_byte(canonical[5]) else {
            return Err(SyncError::CorruptedObject {
                path,
                reason: format!("unknown kind: {}", canonical[5]),
            });
        };

        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&canonical[6..HEADER_LEN]);
        let len = u64::from_le_bytes(len_bytes) as usize;
        let payload = &canonical[HEADER_LEN..];
        if payload.len() != len {
            return Err(SyncError::CorruptedObject {
                path,
                reason: format!("length mismatch: header says {}, got {}", len, payload.len()),
            });
        }

        let actual = ObjectId::hash_object(kind, payload);
        if actual != id {
            return Err(SyncError::HashMismatch {
                expected: id.as_hex(),
                actual: actual.as_hex(),
            });
        }

        Ok((kind, payload.to_vec()))
    }
}
