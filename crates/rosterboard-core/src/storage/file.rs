//! File-based storage implementation.

use super::{Storage, StorageError, StorageResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Stores each key as a JSON file in a directory.
pub struct FileStorage {
    /// Base directory for stored files.
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a new file storage with the given base directory.
    ///
    /// Creates the directory if it doesn't exist.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StorageError::Io(format!("Failed to create storage directory: {}", e))
            })?;
        }
        Ok(Self { base_path })
    }

    /// Create file storage in the default location.
    ///
    /// On Linux: `~/.local/share/rosterboard/`
    /// On Windows: `%LOCALAPPDATA%\rosterboard\`
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;
        Self::new(base.join("rosterboard"))
    }

    /// File path for a key. Characters that are unsafe in file names are
    /// replaced, so `rosterboard:v1` lives in `rosterboard_v1.json`.
    fn key_path(&self, key: &str) -> PathBuf {
        let safe_key: String = key
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.base_path.join(format!("{}.json", safe_key))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

impl Storage for FileStorage {
    fn save(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.key_path(key);
        // The previous file stays intact until the rename.
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, value).map_err(|e| {
            StorageError::Io(format!("Failed to write {}: {}", staging.display(), e))
        })?;
        fs::rename(&staging, &path).map_err(|e| {
            StorageError::Io(format!("Failed to replace {}: {}", path.display(), e))
        })
    }

    fn load(&self, key: &str) -> StorageResult<String> {
        let path = self.key_path(key);
        if !path.exists() {
            return Err(StorageError::NotFound(key.to_string()));
        }
        fs::read_to_string(&path)
            .map_err(|e| StorageError::Io(format!("Failed to read {}: {}", path.display(), e)))
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_path(key);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| {
                StorageError::Io(format!("Failed to delete {}: {}", path.display(), e))
            })?;
        }
        Ok(())
    }

    /// Keys are reported in their sanitized file-name form.
    fn list(&self) -> StorageResult<Vec<String>> {
        if !self.base_path.exists() {
            return Ok(vec![]);
        }
        let entries = fs::read_dir(&self.base_path)
            .map_err(|e| StorageError::Io(format!("Failed to read directory: {}", e)))?;

        let mut keys = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                    keys.push(stem.to_string());
                }
            }
        }
        Ok(keys)
    }

    fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.key_path(key).exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_storage_save_load() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();

        storage.save("board", "{\"name\":\"Test\"}").unwrap();
        assert_eq!(storage.load("board").unwrap(), "{\"name\":\"Test\"}");

        storage.save("board", "{}").unwrap();
        assert_eq!(storage.load("board").unwrap(), "{}");
    }

    #[test]
    fn test_file_storage_not_found() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();

        let result = storage.load("nonexistent");
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_file_storage_creates_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let storage = FileStorage::new(nested.clone()).unwrap();
        assert!(nested.is_dir());
        assert_eq!(storage.base_path(), nested.as_path());
    }

    #[test]
    fn test_file_storage_list_skips_other_files() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();

        storage.save("doc1", "1").unwrap();
        storage.save("doc2", "2").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut list = storage.list().unwrap();
        list.sort();
        assert_eq!(list, vec!["doc1".to_string(), "doc2".to_string()]);
    }

    #[test]
    fn test_file_storage_delete() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();

        storage.save("test", "{}").unwrap();
        assert!(storage.exists("test").unwrap());
        storage.delete("test").unwrap();
        assert!(!storage.exists("test").unwrap());
    }

    #[test]
    fn test_file_storage_sanitizes_key() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();

        storage.save("rosterboard:ui:v1", "\"command\"").unwrap();
        assert!(dir.path().join("rosterboard_ui_v1.json").exists());
        assert_eq!(storage.load("rosterboard:ui:v1").unwrap(), "\"command\"");
    }
}
