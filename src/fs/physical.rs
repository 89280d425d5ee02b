// ABOUTME: std::fs backed FileSystem with retrying deletes and atomic writes.
// ABOUTME: Retries absorb files briefly held open by other processes.

use chrono::{DateTime, Utc};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{FailureOptions, FileSystem, FsError};
use crate::retry::RetrySettings;

/// The real file system.
#[derive(Debug, Clone, Default)]
pub struct PhysicalFileSystem {
    retry: RetrySettings,
}

impl PhysicalFileSystem {
    pub fn new(retry: RetrySettings) -> Self {
        Self { retry }
    }

    /// Run `op` until it succeeds, the path disappears, or the retry budget is spent.
    fn with_retry<T>(
        &self,
        action: &'static str,
        path: &Path,
        mut op: impl FnMut() -> std::io::Result<T>,
    ) -> Result<T, FsError> {
        let mut tracker = self.retry.tracker();
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(FsError::io(action, path, e));
                }
                Err(e) => {
                    if !tracker.try_attempt() {
                        return Err(FsError::io(action, path, e));
                    }
                    if tracker.should_log_warning() {
                        tracing::debug!(
                            "Retry #{} on {} '{}': {}",
                            tracker.current_try() + 1,
                            action,
                            path.display(),
                            e
                        );
                    }
                    std::thread::sleep(tracker.current_interval());
                    tracker.mark_failure();
                }
            }
        }
    }

    fn handle_failure(
        result: Result<(), FsError>,
        options: FailureOptions,
    ) -> Result<(), FsError> {
        match result {
            Ok(()) | Err(FsError::NotFound(_)) => Ok(()),
            Err(e) if options == FailureOptions::IgnoreFailure => {
                tracing::debug!("Ignoring delete failure: {}", e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn temp_sibling(path: &Path) -> PathBuf {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        path.with_file_name(format!(".{}.{}.tmp", name, std::process::id()))
    }

    fn ensure_parent(path: &Path) -> Result<(), FsError> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                fs::create_dir_all(parent).map_err(|e| FsError::io("create directory", parent, e))
            }
            _ => Ok(()),
        }
    }
}

impl FileSystem for PhysicalFileSystem {
    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn directory_exists(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn directory_is_empty(&self, path: &Path) -> bool {
        fs::read_dir(path)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false)
    }

    fn create_directory(&self, path: &Path) -> Result<(), FsError> {
        fs::create_dir_all(path).map_err(|e| FsError::io("create directory", path, e))
    }

    fn read_to_string(&self, path: &Path) -> Result<String, FsError> {
        self.with_retry("read", path, || fs::read_to_string(path))
    }

    fn write_all_text(&self, path: &Path, contents: &str) -> Result<(), FsError> {
        Self::ensure_parent(path)?;
        let temp = Self::temp_sibling(path);
        self.with_retry("write", &temp, || fs::write(&temp, contents))?;
        self.with_retry("replace", path, || fs::rename(&temp, path))
    }

    fn create_new_file(&self, path: &Path, contents: &str) -> Result<(), FsError> {
        Self::ensure_parent(path)?;
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| FsError::io("create", path, e))?;
        file.write_all(contents.as_bytes())
            .and_then(|()| file.sync_all())
            .map_err(|e| FsError::io("write", path, e))
    }

    fn delete_file(&self, path: &Path, options: FailureOptions) -> Result<(), FsError> {
        if !path.exists() {
            return Ok(());
        }
        let result = self.with_retry("delete file", path, || fs::remove_file(path));
        Self::handle_failure(result, options)
    }

    fn purge_directory(&self, path: &Path, options: FailureOptions) -> Result<(), FsError> {
        let entries = match fs::read_dir(path) {
            Ok(entries) => entries,
            Err(e) => return Self::handle_failure(Err(FsError::io("list", path, e)), options),
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    Self::handle_failure(Err(FsError::io("list", path, e)), options)?;
                    continue;
                }
            };
            let child = entry.path();
            if child.is_dir() {
                self.purge_directory(&child, options)?;
                let result = self.with_retry("delete directory", &child, || fs::remove_dir(&child));
                Self::handle_failure(result, options)?;
            } else {
                self.delete_file(&child, options)?;
            }
        }
        Ok(())
    }

    fn delete_directory(&self, path: &Path) -> Result<(), FsError> {
        let result = self.with_retry("delete directory", path, || fs::remove_dir_all(path));
        Self::handle_failure(result, FailureOptions::ThrowOnFailure)
    }

    fn enumerate_files_recursively(&self, path: &Path) -> Result<Vec<PathBuf>, FsError> {
        let mut files = Vec::new();
        let mut pending = vec![path.to_path_buf()];
        while let Some(dir) = pending.pop() {
            for entry in fs::read_dir(&dir).map_err(|e| FsError::io("list", &dir, e))? {
                let entry = entry.map_err(|e| FsError::io("list", &dir, e))?;
                let child = entry.path();
                if child.is_dir() {
                    pending.push(child);
                } else {
                    files.push(child);
                }
            }
        }
        files.sort();
        Ok(files)
    }

    fn modified_time(&self, path: &Path) -> Result<DateTime<Utc>, FsError> {
        fs::metadata(path)
            .and_then(|metadata| metadata.modified())
            .map(DateTime::<Utc>::from)
            .map_err(|e| FsError::io("stat", path, e))
    }

    fn copy_directory(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        self.create_directory(to)?;
        for entry in fs::read_dir(from).map_err(|e| FsError::io("list", from, e))? {
            let entry = entry.map_err(|e| FsError::io("list", from, e))?;
            let source = entry.path();
            let target = to.join(entry.file_name());
            if source.is_dir() {
                self.copy_directory(&source, &target)?;
            } else {
                self.with_retry("copy", &target, || fs::copy(&source, &target))?;
            }
        }
        Ok(())
    }
}
