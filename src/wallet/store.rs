//! Client-local durable key/value store.
//!
//! Entries live in a concurrent map; when a persistence path is set every
//! write is flushed to a JSON file so sessions survive restarts.

use dashmap::DashMap;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store file is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Default)]
pub struct LocalStore {
    inner: Arc<DashMap<String, String>>,
    persistence_path: Option<PathBuf>,
}

impl LocalStore {
    /// In-memory store, optionally flushed to `persistence_path`.
    pub fn new(persistence_path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            persistence_path,
        }
    }

    /// Open the store at `path`, loading existing entries if the file exists.
    pub fn load_from_file(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let store = Self::new(Some(path.to_path_buf()));
        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            let map: HashMap<String, String> = serde_json::from_reader(reader)?;
            for (key, value) in map {
                store.inner.insert(key, value);
            }
            tracing::info!(path = %path.display(), entries = store.inner.len(), "Loaded local store");
        }
        Ok(store)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).map(|entry| entry.value().clone())
    }

    pub fn set(&self, key: &str, value: String) -> StoreResult<()> {
        self.inner.insert(key.to_string(), value);
        self.save()
    }

    pub fn remove(&self, key: &str) -> StoreResult<()> {
        if self.inner.remove(key).is_some() {
            self.save()?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Flush all entries to disk. No-op for in-memory stores.
    pub fn save(&self) -> StoreResult<()> {
        let Some(path) = &self.persistence_path else {
            return Ok(());
        };
        let map: HashMap<String, String> = self
            .inner
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, &map)?;
        tracing::debug!(path = %path.display(), entries = map.len(), "Saved local store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = LocalStore::load_from_file(&path).unwrap();
        assert!(store.is_empty());
        store.set("a", "1".to_string()).unwrap();
        store.set("b", "2".to_string()).unwrap();
        store.remove("a").unwrap();

        let reopened = LocalStore::load_from_file(&path).unwrap();
        assert_eq!(reopened.get("a"), None);
        assert_eq!(reopened.get("b").as_deref(), Some("2"));
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            LocalStore::load_from_file(&path),
            Err(StoreError::Format(_))
        ));
    }

    #[test]
    fn test_memory_only() {
        let store = LocalStore::new(None);
        store.set("k", "v".to_string()).unwrap();
        assert_eq!(store.get("k").as_deref(), Some("v"));
    }
}
