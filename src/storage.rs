// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Key/value session storage.
//!
//! The session is kept as flat string keys (`fitbit_access_token`,
//! `active_provider`, ...), the same shape a browser's local storage holds.
//! [`MemoryStore`] is used by tests and short-lived sessions; [`FileStore`]
//! persists to a JSON file so the CLI stays logged in between runs.

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt session file: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Synchronous string key/value store.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    fn keys(&self) -> Vec<String>;

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// In-memory store, lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }
}

/// Store persisted to a JSON object on disk, rewritten on every change.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: DashMap<String, String>,
    /// Serializes mutate-then-flush so writes land in order.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open the store at `path`, loading existing entries if the file exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries: DashMap<String, String> = DashMap::new();

        match std::fs::read_to_string(&path) {
            Ok(contents) if !contents.trim().is_empty() => {
                let map: BTreeMap<String, String> = serde_json::from_str(&contents)?;
                for (k, v) in map {
                    entries.insert(k, v);
                }
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => return Err(StorageError::Io { path, source }),
        }

        tracing::debug!(path = %path.display(), entries = entries.len(), "Session store opened");

        Ok(Self {
            path,
            entries,
            write_lock: Mutex::new(()),
        })
    }

    fn io_err(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Write the whole map through a temp file and rename it into place.
    fn flush(&self) -> Result<(), StorageError> {
        let snapshot: BTreeMap<String, String> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        let json = serde_json::to_vec_pretty(&snapshot)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| self.io_err(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))?;
        Ok(())
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        if self.entries.remove(key).is_none() {
            return Ok(());
        }
        self.flush()
    }

    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }
}
