//! File storage backend
//!
//! Each key is stored as `<dir>/<key>.json`. Writers hold an exclusive lock on
//! `<dir>/<key>.lock` and replace the document through a temporary file, so readers
//! never observe a half-written value.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::traits::{validate_key, BackendType, KeyValueStore};

const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Creates a backend rooted at `dir`; the directory is created on first write
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn document_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn lock_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.lock", key))
    }

    /// Waits for the lock up to [`LOCK_TIMEOUT`]
    fn lock(&self, key: &str, exclusive: bool) -> Result<File> {
        let lock_path = self.lock_path(key);
        let lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file: {:?}", lock_path))?;

        let start = Instant::now();
        loop {
            let attempt = if exclusive {
                FileExt::try_lock_exclusive(&lock_file)
            } else {
                FileExt::try_lock_shared(&lock_file)
            };
            match attempt {
                Ok(()) => return Ok(lock_file),
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    if start.elapsed() > LOCK_TIMEOUT {
                        anyhow::bail!(
                            "Timeout waiting for lock - another process may be writing: {:?}",
                            lock_path
                        );
                    }
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("Failed to acquire lock on {:?}", lock_path))
                }
            }
        }
    }
}

fn replace_document(tmp_path: &Path, path: &Path, value: &str) -> Result<()> {
    let mut tmp =
        File::create(tmp_path).with_context(|| format!("Failed to create {:?}", tmp_path))?;
    tmp.write_all(value.as_bytes())
        .with_context(|| format!("Failed to write {:?}", tmp_path))?;
    tmp.sync_all()
        .with_context(|| format!("Failed to sync {:?}", tmp_path))?;
    fs::rename(tmp_path, path).with_context(|| format!("Failed to replace {:?}", path))
}

impl KeyValueStore for FileBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::File
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        let path = self.document_path(key);
        if !path.exists() {
            return Ok(None);
        }

        let _lock = self.lock(key, false)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {:?}", path)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create storage directory: {:?}", self.dir))?;

        let lock = self.lock(key, true)?;
        let path = self.document_path(key);
        let tmp_path = path.with_extension("json.tmp");

        if let Err(e) = replace_document(&tmp_path, &path, value) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        FileExt::unlock(&lock)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        if !self.dir.exists() {
            return Ok(());
        }

        let _lock = self.lock(key, true)?;
        let path = self.document_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {:?}", path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_backend_missing_key() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path().join("store"));
        assert_eq!(backend.get("state").unwrap(), None);
        // removing from a directory that does not exist yet is fine
        backend.remove("state").unwrap();
    }

    #[test]
    fn test_file_backend_set_get_replace() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path().join("store"));

        backend.set("state", "{\"a\":1}").unwrap();
        assert_eq!(backend.get("state").unwrap().as_deref(), Some("{\"a\":1}"));
        assert!(temp_dir.path().join("store/state.json").exists());

        backend.set("state", "[]").unwrap();
        assert_eq!(backend.get("state").unwrap().as_deref(), Some("[]"));
        assert!(!temp_dir.path().join("store/state.json.tmp").exists());
    }

    #[test]
    fn test_file_backend_remove() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path());

        backend.set("state", "1").unwrap();
        assert!(backend.contains("state").unwrap());
        backend.remove("state").unwrap();
        assert!(!backend.contains("state").unwrap());
    }

    #[test]
    fn test_file_backend_failed_replace_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path());
        // a non-empty directory where the document should go makes the rename fail
        fs::create_dir_all(temp_dir.path().join("state.json/child")).unwrap();

        assert!(backend.set("state", "{}").is_err());
        assert!(!temp_dir.path().join("state.json.tmp").exists());
    }

    #[test]
    fn test_file_backend_rejects_path_keys() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path());
        assert!(backend.set("../escape", "x").is_err());
    }
}
