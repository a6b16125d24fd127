//! Key-value storage abstraction
//!
//! The whole application state lives under a single key, so a backend only has to
//! store opaque strings.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Types of storage backends available
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// One JSON document per key inside a directory
    File,
    /// SQLite database file
    Sqlite,
    /// Process memory only, nothing survives a restart
    Memory,
}

impl BackendType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "file" | "json" => Some(BackendType::File),
            "sqlite" | "db" => Some(BackendType::Sqlite),
            "memory" | "mem" => Some(BackendType::Memory),
            _ => None,
        }
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendType::File => write!(f, "File"),
            BackendType::Sqlite => write!(f, "SQLite"),
            BackendType::Memory => write!(f, "Memory"),
        }
    }
}

/// Core trait for storage backends
///
/// `get` returns `Ok(None)` for a key that was never written; an `Err` always means the
/// backend itself failed.
pub trait KeyValueStore: Send + Sync {
    /// Returns the backend type
    fn backend_type(&self) -> BackendType;

    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value`, replacing anything previously stored under `key`
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`; removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<()>;

    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// Rejects keys that cannot be used safely as file names
pub(crate) fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && !key.starts_with('.');
    if !valid {
        anyhow::bail!("Invalid storage key: {:?}", key);
    }
    Ok(())
}
