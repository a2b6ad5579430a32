//! Per-device instance lock using a Unix socket.
//!
//! Each console's title cache is rewritten wholesale on refresh, so two bridge
//! processes serving the same console would race on it. The lock is keyed by
//! the device's cache key; the OS releases the socket if the process dies.

use std::io;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstanceLockError {
    #[error("another bridge is already serving device {0}")]
    AlreadyRunning(String),

    #[error("failed to acquire instance lock: {0}")]
    Io(#[from] io::Error),
}

/// Held for as long as the bridge serves the device. Dropping removes the socket.
pub struct InstanceLock {
    _listener: UnixListener,
    path: PathBuf,
}

impl InstanceLock {
    /// Acquire the lock for `device_key` in the default runtime directory.
    pub fn acquire(device_key: &str) -> Result<Self, InstanceLockError> {
        Self::acquire_in(&runtime_dir(), device_key)
    }

    /// Acquire the lock for `device_key` under `dir`.
    pub fn acquire_in(dir: &Path, device_key: &str) -> Result<Self, InstanceLockError> {
        let path = Self::socket_path(dir, device_key);

        // A socket left behind by a SIGKILL'd process refuses connections
        if path.exists() {
            if UnixStream::connect(&path).is_ok() {
                return Err(InstanceLockError::AlreadyRunning(device_key.to_string()));
            }
            let _ = std::fs::remove_file(&path);
        }

        match UnixListener::bind(&path) {
            Ok(listener) => Ok(Self {
                _listener: listener,
                path,
            }),
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                Err(InstanceLockError::AlreadyRunning(device_key.to_string()))
            }
            Err(e) => Err(InstanceLockError::Io(e)),
        }
    }

    pub fn socket_path(dir: &Path, device_key: &str) -> PathBuf {
        dir.join(format!("wiiu-bridge-{device_key}.sock"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// XDG_RUNTIME_DIR when set (cleaned on logout), otherwise /tmp.
fn runtime_dir() -> PathBuf {
    std::env::var("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_for_same_device_fails() {
        let dir = tempfile::tempdir().unwrap();
        let lock = InstanceLock::acquire_in(dir.path(), "10.0.0.5_8572").unwrap();

        let second = InstanceLock::acquire_in(dir.path(), "10.0.0.5_8572");
        assert!(matches!(second, Err(InstanceLockError::AlreadyRunning(_))));

        // A different console is independent
        let other = InstanceLock::acquire_in(dir.path(), "10.0.0.6_8572");
        assert!(other.is_ok());

        drop(lock);
        assert!(InstanceLock::acquire_in(dir.path(), "10.0.0.5_8572").is_ok());
    }

    #[test]
    fn test_socket_path() {
        assert_eq!(
            InstanceLock::socket_path(Path::new("/run/user/1000"), "host_8572"),
            PathBuf::from("/run/user/1000/wiiu-bridge-host_8572.sock")
        );
    }
}
