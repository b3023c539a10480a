//! Persistence operations for InMemory database
//!
//! This module handles serialization and file I/O for saving/loading
//! the in-memory database state to/from JSON files.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use serde::{Deserialize, Deserializer, Serialize};

use super::{InMemory, MemTable};
use crate::backend::errors::BackendError;
use crate::{Error, Result, locks};

/// The current persistence file format version.
/// v0 indicates this is an unstable format subject to breaking changes.
const PERSISTENCE_VERSION: u8 = 0;

/// Helper to check if version is default (0) for serde skip_serializing_if
fn is_v0(v: &u8) -> bool {
    *v == 0
}

/// Validates the persistence version during deserialization.
fn validate_persistence_version<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let version = u8::deserialize(deserializer)?;
    if version != PERSISTENCE_VERSION {
        return Err(serde::de::Error::custom(format!(
            "unsupported persistence version {version}; only version {PERSISTENCE_VERSION} is supported"
        )));
    }
    Ok(version)
}

/// Serializable snapshot of every table
#[derive(Serialize, Deserialize)]
struct SerializableDatabase {
    /// File format version for compatibility checking
    #[serde(
        rename = "_v",
        default,
        skip_serializing_if = "is_v0",
        deserialize_with = "validate_persistence_version"
    )]
    version: u8,
    tables: HashMap<String, MemTable>,
}

impl InMemory {
    /// Saves every table to `path` as JSON.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let serializable = SerializableDatabase {
            version: PERSISTENCE_VERSION,
            tables: locks::read(&self.tables).clone(),
        };
        let json = serde_json::to_string_pretty(&serializable)
            .map_err(|e| -> Error { BackendError::SerializationFailed { source: e }.into() })?;
        std::fs::write(path, json).map_err(|e| -> Error { BackendError::FileIo { source: e }.into() })
    }

    /// Loads the database state from a JSON file written by [`save_to_file`](Self::save_to_file).
    ///
    /// If the file does not exist, a new, empty `InMemory` database is returned.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(json) => {
                let serializable: SerializableDatabase =
                    serde_json::from_str(&json).map_err(|e| -> Error {
                        BackendError::DeserializationFailed { source: e }.into()
                    })?;
                Ok(InMemory {
                    tables: RwLock::new(serializable.tables),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(InMemory::new()),
            Err(e) => Err(BackendError::FileIo { source: e }.into()),
        }
    }
}
