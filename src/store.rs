//! Small persistent key-value store for state that outlives a session
//! (last opened directory, repeat mode).

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub const LAST_DIR: &str = "last_dir";
pub const REPEAT_MODE: &str = "repeat_mode";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("store file is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("store could not be serialized: {0}")]
    Serialize(#[from] toml::ser::Error),
}

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// A flat `key = "value"` TOML file, rewritten on every `set`.
#[derive(Debug)]
pub struct TomlStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl TomlStore {
    /// Open `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(raw) => toml::from_str(&raw)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let raw = toml::to_string(&self.values)?;
        // Write-then-rename so a crash never leaves half a file behind.
        let tmp = self.path.with_extension("toml.tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for TomlStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.values.get(key).is_some_and(|v| v == value) {
            return Ok(());
        }
        self.values.insert(key.to_string(), value.to_string());
        self.flush()
    }
}

/// Store that keeps values for the session only. Used when no store path
/// can be resolved or the file is unusable.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/state.toml");

        let mut store = TomlStore::open(&path).unwrap();
        assert_eq!(store.get(LAST_DIR), None);
        store.set(LAST_DIR, "/music/jazz").unwrap();
        store.set(REPEAT_MODE, "all").unwrap();

        let reopened = TomlStore::open(&path).unwrap();
        assert_eq!(reopened.get(LAST_DIR).as_deref(), Some("/music/jazz"));
        assert_eq!(reopened.get(REPEAT_MODE).as_deref(), Some("all"));
        assert!(!path.with_extension("toml.tmp").exists());
    }

    #[test]
    fn garbage_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.toml");
        fs::write(&path, "this is = = not toml").unwrap();
        assert!(matches!(TomlStore::open(&path), Err(StoreError::Parse(_))));
    }

    #[test]
    fn memory_store_round_trips() {
        let mut store = MemoryStore::default();
        store.set(REPEAT_MODE, "one").unwrap();
        assert_eq!(store.get(REPEAT_MODE).as_deref(), Some("one"));
    }
}
