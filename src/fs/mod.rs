// ABOUTME: File-system abstraction used by the journal, locks, and retention.
// ABOUTME: Physical implementation retries transient failures; in-memory one backs tests.

mod memory;
mod physical;

pub use memory::InMemoryFileSystem;
pub use physical::PhysicalFileSystem;

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

use crate::error::ErrorKind;

/// What to do when a delete keeps failing after retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOptions {
    ThrowOnFailure,
    IgnoreFailure,
}

#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("not found: {0}")]
    NotFound(PathBuf),

    #[error("{action} failed for {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FsError {
    pub(crate) fn io(action: &'static str, path: &Path, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => FsError::NotFound(path.to_path_buf()),
            std::io::ErrorKind::AlreadyExists => FsError::AlreadyExists(path.to_path_buf()),
            _ => FsError::Io {
                action,
                path: path.to_path_buf(),
                source,
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FsError::AlreadyExists(_) => ErrorKind::Transient,
            // Removals only ever clean up.
            FsError::Io { action, .. } if action.starts_with("delete") => ErrorKind::BestEffort,
            FsError::NotFound(_) | FsError::Io { .. } => ErrorKind::Fatal,
        }
    }
}

/// The narrow file-system contract the core depends on.
pub trait FileSystem: Send + Sync {
    fn file_exists(&self, path: &Path) -> bool;

    fn directory_exists(&self, path: &Path) -> bool;

    /// True for an existing directory with no entries.
    fn directory_is_empty(&self, path: &Path) -> bool;

    fn create_directory(&self, path: &Path) -> Result<(), FsError>;

    fn read_to_string(&self, path: &Path) -> Result<String, FsError>;

    /// Replace the file contents so readers never observe a partial write.
    fn write_all_text(&self, path: &Path, contents: &str) -> Result<(), FsError>;

    /// Create a file only if it does not exist yet. Fails with `AlreadyExists` otherwise.
    fn create_new_file(&self, path: &Path, contents: &str) -> Result<(), FsError>;

    fn delete_file(&self, path: &Path, options: FailureOptions) -> Result<(), FsError>;

    /// Delete everything inside `path`, keeping `path` itself.
    fn purge_directory(&self, path: &Path, options: FailureOptions) -> Result<(), FsError>;

    /// Delete `path` and anything left inside it.
    fn delete_directory(&self, path: &Path) -> Result<(), FsError>;

    fn enumerate_files_recursively(&self, path: &Path) -> Result<Vec<PathBuf>, FsError>;

    fn modified_time(&self, path: &Path) -> Result<DateTime<Utc>, FsError>;

    /// Copy the contents of `from` into `to`, creating `to` as needed.
    fn copy_directory(&self, from: &Path, to: &Path) -> Result<(), FsError>;
}
