// ABOUTME: Reads, creates and deletes lock files on a FileSystem.
// ABOUTME: Lock names map to a fixed-length hashed file name.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::SemaphoreError;
use super::file_lock::{FileLock, LockState};
use crate::fs::{FailureOptions, FileSystem, FsError};

/// Storage operations the lock-file semaphore needs.
pub trait LockIo: Send + Sync {
    fn lock_path(&self, name: &str) -> PathBuf;

    fn read_lock(&self, path: &Path) -> LockState;

    /// Atomically create the lock file. `Ok(false)` if it already exists.
    fn create_lock(&self, path: &Path, lock: &FileLock) -> Result<bool, SemaphoreError>;

    fn delete_lock(&self, path: &Path) -> Result<(), SemaphoreError>;
}

/// Lock files in a single directory of a [`FileSystem`].
#[derive(Clone)]
pub struct FsLockIo {
    fs: Arc<dyn FileSystem>,
    directory: PathBuf,
}

impl std::fmt::Debug for FsLockIo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsLockIo")
            .field("directory", &self.directory)
            .finish()
    }
}

impl FsLockIo {
    pub fn new(fs: Arc<dyn FileSystem>, directory: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            directory: directory.into(),
        }
    }
}

impl LockIo for FsLockIo {
    fn lock_path(&self, name: &str) -> PathBuf {
        let digest = Sha256::digest(name.as_bytes());
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        self.directory.join(format!("{hex}.lck"))
    }

    fn read_lock(&self, path: &Path) -> LockState {
        let contents = match self.fs.read_to_string(path) {
            Ok(contents) => contents,
            Err(FsError::NotFound(_)) => return LockState::Missing,
            Err(e) => {
                tracing::debug!("Lock file {} not readable: {}", path.display(), e);
                return LockState::Inaccessible;
            }
        };

        match serde_json::from_str::<FileLock>(&contents) {
            Ok(lock) => LockState::Held(lock),
            Err(e) => {
                tracing::debug!("Lock file {} not parseable: {}", path.display(), e);
                match self.fs.modified_time(path) {
                    Ok(modified) => LockState::Unreadable { modified },
                    Err(FsError::NotFound(_)) => LockState::Missing,
                    Err(_) => LockState::Inaccessible,
                }
            }
        }
    }

    fn create_lock(&self, path: &Path, lock: &FileLock) -> Result<bool, SemaphoreError> {
        let json = serde_json::to_string(lock)?;
        if let Some(parent) = path.parent() {
            self.fs
                .create_directory(parent)
                .map_err(|source| SemaphoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        match self.fs.create_new_file(path, &json) {
            Ok(()) => Ok(true),
            Err(FsError::AlreadyExists(_)) => Ok(false),
            Err(source) => Err(SemaphoreError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn delete_lock(&self, path: &Path) -> Result<(), SemaphoreError> {
        self.fs
            .delete_file(path, FailureOptions::ThrowOnFailure)
            .map_err(|source| SemaphoreError::Io {
                path: path.to_path_buf(),
                source,
            })
    }
}
