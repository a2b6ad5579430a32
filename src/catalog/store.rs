//! Backing store for the title cache.
//!
//! The catalog only needs "read the blob" and "replace the blob", so the file
//! lives behind a trait and tests can swap in memory.

use log::info;
use parking_lot::Mutex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub trait TitleStore: Send + Sync {
    /// Current contents, or `None` if nothing has been stored yet.
    fn read(&self) -> io::Result<Option<Vec<u8>>>;

    /// Replace the contents wholesale.
    fn write(&self, bytes: &[u8]) -> io::Result<()>;

    /// Human-readable location for logs.
    fn describe(&self) -> String;
}

/// Title cache kept in a JSON file.
pub struct FileTitleStore {
    path: PathBuf,
}

impl FileTitleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TitleStore for FileTitleStore {
    fn read(&self) -> io::Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, bytes: &[u8]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, bytes)?;
        info!("[Catalog] Wrote title cache {:?}", self.path);
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory store, counting writes.
#[derive(Default)]
pub struct MemoryTitleStore {
    data: Mutex<Option<Vec<u8>>>,
    writes: Mutex<usize>,
}

impl MemoryTitleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            data: Mutex::new(Some(bytes.into())),
            writes: Mutex::new(0),
        }
    }

    pub fn contents(&self) -> Option<Vec<u8>> {
        self.data.lock().clone()
    }

    pub fn write_count(&self) -> usize {
        *self.writes.lock()
    }
}

impl TitleStore for MemoryTitleStore {
    fn read(&self) -> io::Result<Option<Vec<u8>>> {
        Ok(self.data.lock().clone())
    }

    fn write(&self, bytes: &[u8]) -> io::Result<()> {
        *self.data.lock() = Some(bytes.to_vec());
        *self.writes.lock() += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_missing_then_written() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTitleStore::new(dir.path().join("nested").join("titles.json"));

        assert!(store.read().unwrap().is_none());

        store.write(b"{}").unwrap();
        assert_eq!(store.read().unwrap(), Some(b"{}".to_vec()));
    }

    #[test]
    fn test_memory_store_counts_writes() {
        let store = MemoryTitleStore::with_contents("{}");
        assert_eq!(store.write_count(), 0);
        store.write(b"{\"a\":\"b\"}").unwrap();
        assert_eq!(store.write_count(), 1);
        assert_eq!(store.contents(), Some(b"{\"a\":\"b\"}".to_vec()));
    }
}
