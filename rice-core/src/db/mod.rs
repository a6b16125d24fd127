//! Storage abstraction layer
//!
//! This module provides a trait-based abstraction for key-value backends, allowing the
//! state to be kept in a directory of JSON files, a SQLite database, or memory.

mod file_backend;
mod memory_backend;
pub mod migration;
mod sqlite_backend;
mod traits;

pub use file_backend::FileBackend;
pub use memory_backend::MemoryBackend;
pub use migration::{RawState, StoredShape};
pub use sqlite_backend::SqliteBackend;
pub use traits::{BackendType, KeyValueStore};

use anyhow::Result;
use std::path::Path;

/// Infers the backend from the path: SQLite extensions select SQLite, anything else is
/// treated as a directory for the file backend
pub fn infer_backend_type(path: &Path) -> BackendType {
    match path.extension().and_then(|e| e.to_str()) {
        Some("db") | Some("sqlite") | Some("sqlite3") => BackendType::Sqlite,
        _ => BackendType::File,
    }
}

/// Creates a storage backend based on the path or an explicit type
pub fn create_backend(
    path: &Path,
    backend_type: Option<BackendType>,
) -> Result<Box<dyn KeyValueStore>> {
    let bt = backend_type.unwrap_or_else(|| infer_backend_type(path));
    log::debug!("Opening {} storage at {:?}", bt, path);

    match bt {
        BackendType::File => Ok(Box::new(FileBackend::new(path))),
        BackendType::Sqlite => Ok(Box::new(SqliteBackend::new(path)?)),
        BackendType::Memory => Ok(Box::new(MemoryBackend::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_infer_backend_type() {
        assert_eq!(infer_backend_type(&PathBuf::from("state.db")), BackendType::Sqlite);
        assert_eq!(infer_backend_type(&PathBuf::from("x.sqlite3")), BackendType::Sqlite);
        assert_eq!(infer_backend_type(&PathBuf::from("store")), BackendType::File);
    }

    #[test]
    fn test_create_backend() {
        let temp_dir = TempDir::new().unwrap();

        let sqlite = create_backend(&temp_dir.path().join("rice.db"), None).unwrap();
        assert_eq!(sqlite.backend_type(), BackendType::Sqlite);

        let file = create_backend(&temp_dir.path().join("store"), None).unwrap();
        assert_eq!(file.backend_type(), BackendType::File);

        let memory =
            create_backend(&temp_dir.path().join("ignored"), Some(BackendType::Memory)).unwrap();
        assert_eq!(memory.backend_type(), BackendType::Memory);
    }
}
