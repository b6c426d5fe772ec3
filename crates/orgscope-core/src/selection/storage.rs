// ── Selection storage ──
//
// Durable key/value capability used to remember the last selected entity
// across restarts. Injected so the selection logic never probes its
// environment; hosts without durable storage use `NoopStorage`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use tracing::debug;

use crate::error::CoreError;

/// Key under which the selected entity slug is persisted.
pub const SELECTED_ENTITY_KEY: &str = "orgscope.current_entity_slug";

pub trait SelectionStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, CoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), CoreError>;
    fn remove(&self, key: &str) -> Result<(), CoreError>;
}

/// Remembers nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStorage;

impl SelectionStorage for NoopStorage {
    fn get(&self, _key: &str) -> Result<Option<String>, CoreError> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), CoreError> {
        Ok(())
    }

    fn remove(&self, _key: &str) -> Result<(), CoreError> {
        Ok(())
    }
}

/// Process-lifetime storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: DashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SelectionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        Ok(self.values.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CoreError> {
        self.values.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CoreError> {
        self.values.remove(key);
        Ok(())
    }
}

/// A small JSON object on disk, rewritten on every change.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, String>, CoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(HashMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, values: &HashMap<String, String>) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, raw)?;
        debug!(path = %self.path.display(), "selection storage written");
        Ok(())
    }
}

impl SelectionStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CoreError> {
        let mut values = self.load()?;
        values.insert(key.to_owned(), value.to_owned());
        self.save(&values)
    }

    fn remove(&self, key: &str) -> Result<(), CoreError> {
        let mut values = self.load()?;
        if values.remove(key).is_some() {
            self.save(&values)?;
        }
        Ok(())
    }
}
