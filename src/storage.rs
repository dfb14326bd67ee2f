// Copyright © 2024 SiteWizard. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Storage Module
//!
//! [`Storage`] implementations. Both swallow every failure: a broken
//! medium reads as empty and drops writes, logging a warning, so the
//! wizard degrades to in-memory state instead of failing.
//!
//! ```
//! use serde_json::json;
//! use sitewizard::core::traits::Storage;
//! use sitewizard::storage::MemoryStorage;
//!
//! let storage = MemoryStorage::new();
//! storage.set("site_builder_1", &json!({"currentStep": 2}));
//! assert_eq!(storage.get_or("missing", json!(null)), json!(null));
//! ```

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::warn;
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use tempfile::NamedTempFile;

use crate::core::error::{Result, WizardError};
use crate::core::traits::Storage;

const UNAVAILABLE: &str = "Local storage not available";

/// Process-local storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, JsonValue>>,
}

impl MemoryStorage {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// `true` when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<JsonValue> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &JsonValue) {
        _ = self.entries.lock().insert(key.to_string(), value.clone());
    }

    fn remove(&self, key: &str) {
        _ = self.entries.lock().remove(key);
    }
}

/// One JSON document per key inside a directory.
///
/// Writes go through a temporary file renamed into place, so a crash never
/// leaves a half-written snapshot behind.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Stores documents under `dir`, created on first write.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Directory holding the documents.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the document for `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", name))
    }

    fn try_get(&self, key: &str) -> Result<Option<JsonValue>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)
            .map_err(|e| WizardError::io_error(path.clone(), e))?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    fn try_set(&self, key: &str, value: &JsonValue) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| WizardError::io_error(self.dir.clone(), e))?;
        let path = self.path_for(key);
        let mut tmp = NamedTempFile::new_in(&self.dir)
            .map_err(|e| WizardError::io_error(self.dir.clone(), e))?;
        serde_json::to_writer_pretty(&mut tmp, value)?;
        tmp.flush()
            .map_err(|e| WizardError::io_error(path.clone(), e))?;
        _ = tmp
            .persist(&path)
            .map_err(|e| WizardError::io_error(path.clone(), e.error))?;
        Ok(())
    }

    fn try_remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(WizardError::io_error(path, e)),
        }
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<JsonValue> {
        self.try_get(key).unwrap_or_else(|err| {
            warn!("{}: {}", UNAVAILABLE, err);
            None
        })
    }

    fn set(&self, key: &str, value: &JsonValue) {
        if let Err(err) = self.try_set(key, value) {
            warn!("{}: {}", UNAVAILABLE, err);
        }
    }

    fn remove(&self, key: &str) {
        if let Err(err) = self.try_remove(key) {
            warn!("{}: {}", UNAVAILABLE, err);
        }
    }
}
