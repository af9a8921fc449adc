//! Storage abstraction for persistence.
//!
//! Backends are plain key/value stores of JSON text. The snapshot layer on
//! top decides what the keys hold and how stored text is repaired.

mod autosave;
mod file;
mod memory;
mod repair;
mod snapshot;

pub use autosave::AutoSaver;
pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use repair::{decode_state, normalize};
pub use snapshot::{BoardPersistence, SnapshotFormat, detect_format, export_json, import_state};

use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Key not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for key/value storage backends.
///
/// Writes are synchronous; callers debounce them.
pub trait Storage: Send + Sync {
    /// Store `value` under `key`, replacing any previous value.
    fn save(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Read the value stored under `key`.
    fn load(&self, key: &str) -> StorageResult<String>;

    /// Remove `key`. Removing a missing key succeeds.
    fn delete(&self, key: &str) -> StorageResult<()>;

    /// List all stored keys.
    fn list(&self) -> StorageResult<Vec<String>>;

    /// Check if a key exists.
    fn exists(&self, key: &str) -> StorageResult<bool>;
}
