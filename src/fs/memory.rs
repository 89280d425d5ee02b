// ABOUTME: In-memory FileSystem for deterministic tests.
// ABOUTME: Records deletions and can simulate files that refuse to be deleted.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use super::{FailureOptions, FileSystem, FsError};

#[derive(Debug, Clone)]
struct MemoryFile {
    contents: String,
    modified: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct State {
    files: BTreeMap<PathBuf, MemoryFile>,
    directories: BTreeSet<PathBuf>,
    undeletable: BTreeSet<PathBuf>,
    deleted: Vec<PathBuf>,
}

impl State {
    fn add_directory(&mut self, path: &Path) {
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            self.directories.insert(ancestor.to_path_buf());
        }
    }

    fn add_file(&mut self, path: &Path, contents: &str, modified: DateTime<Utc>) {
        if let Some(parent) = path.parent() {
            self.add_directory(parent);
        }
        self.files.insert(
            path.to_path_buf(),
            MemoryFile {
                contents: contents.to_string(),
                modified,
            },
        );
    }

    fn delete_file(&mut self, path: &Path) -> Result<(), FsError> {
        if self.undeletable.contains(path) {
            return Err(FsError::Io {
                action: "delete file",
                path: path.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "file is in use",
                ),
            });
        }
        if self.files.remove(path).is_some() {
            self.deleted.push(path.to_path_buf());
        }
        Ok(())
    }
}

/// A FileSystem held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryFileSystem {
    state: Mutex<State>,
}

impl InMemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, contents: &str) {
        self.state.lock().add_file(path.as_ref(), contents, Utc::now());
    }

    pub fn add_file_modified_at(
        &self,
        path: impl AsRef<Path>,
        contents: &str,
        modified: DateTime<Utc>,
    ) {
        self.state.lock().add_file(path.as_ref(), contents, modified);
    }

    pub fn add_directory(&self, path: impl AsRef<Path>) {
        self.state.lock().add_directory(path.as_ref());
    }

    /// Make deletes of this file fail, as if another process held it open.
    pub fn make_undeletable(&self, path: impl AsRef<Path>) {
        self.state
            .lock()
            .undeletable
            .insert(path.as_ref().to_path_buf());
    }

    /// Files and directories removed so far, in deletion order.
    pub fn deleted_paths(&self) -> Vec<PathBuf> {
        self.state.lock().deleted.clone()
    }

    pub fn was_deleted(&self, path: impl AsRef<Path>) -> bool {
        self.state
            .lock()
            .deleted
            .iter()
            .any(|p| p == path.as_ref())
    }
}

impl FileSystem for InMemoryFileSystem {
    fn file_exists(&self, path: &Path) -> bool {
        self.state.lock().files.contains_key(path)
    }

    fn directory_exists(&self, path: &Path) -> bool {
        self.state.lock().directories.contains(path)
    }

    fn directory_is_empty(&self, path: &Path) -> bool {
        let state = self.state.lock();
        state.directories.contains(path)
            && !state.files.keys().any(|f| f.parent() == Some(path))
            && !state.directories.iter().any(|d| d.parent() == Some(path))
    }

    fn create_directory(&self, path: &Path) -> Result<(), FsError> {
        self.state.lock().add_directory(path);
        Ok(())
    }

    fn read_to_string(&self, path: &Path) -> Result<String, FsError> {
        self.state
            .lock()
            .files
            .get(path)
            .map(|f| f.contents.clone())
            .ok_or_else(|| FsError::NotFound(path.to_path_buf()))
    }

    fn write_all_text(&self, path: &Path, contents: &str) -> Result<(), FsError> {
        self.state.lock().add_file(path, contents, Utc::now());
        Ok(())
    }

    fn create_new_file(&self, path: &Path, contents: &str) -> Result<(), FsError> {
        let mut state = self.state.lock();
        if state.files.contains_key(path) {
            return Err(FsError::AlreadyExists(path.to_path_buf()));
        }
        state.add_file(path, contents, Utc::now());
        Ok(())
    }

    fn delete_file(&self, path: &Path, options: FailureOptions) -> Result<(), FsError> {
        match self.state.lock().delete_file(path) {
            Err(_) if options == FailureOptions::IgnoreFailure => Ok(()),
            result => result,
        }
    }

    fn purge_directory(&self, path: &Path, options: FailureOptions) -> Result<(), FsError> {
        let mut state = self.state.lock();
        let files: Vec<PathBuf> = state
            .files
            .keys()
            .filter(|f| f.starts_with(path))
            .cloned()
            .collect();
        for file in files {
            if let Err(e) = state.delete_file(&file) {
                if options == FailureOptions::ThrowOnFailure {
                    return Err(e);
                }
            }
        }

        let remaining: Vec<PathBuf> = state.files.keys().cloned().collect();
        state.directories.retain(|d| {
            d.as_path() == path
                || !d.starts_with(path)
                || remaining.iter().any(|f| f.starts_with(d))
        });
        Ok(())
    }

    fn delete_directory(&self, path: &Path) -> Result<(), FsError> {
        self.purge_directory(path, FailureOptions::ThrowOnFailure)?;
        let mut state = self.state.lock();
        if state.directories.remove(path) {
            state.deleted.push(path.to_path_buf());
        }
        Ok(())
    }

    fn enumerate_files_recursively(&self, path: &Path) -> Result<Vec<PathBuf>, FsError> {
        let state = self.state.lock();
        if !state.directories.contains(path) {
            return Err(FsError::NotFound(path.to_path_buf()));
        }
        Ok(state
            .files
            .keys()
            .filter(|f| f.starts_with(path))
            .cloned()
            .collect())
    }

    fn modified_time(&self, path: &Path) -> Result<DateTime<Utc>, FsError> {
        self.state
            .lock()
            .files
            .get(path)
            .map(|f| f.modified)
            .ok_or_else(|| FsError::NotFound(path.to_path_buf()))
    }

    fn copy_directory(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        let mut state = self.state.lock();
        if !state.directories.contains(from) {
            return Err(FsError::NotFound(from.to_path_buf()));
        }
        let copies: Vec<(PathBuf, MemoryFile)> = state
            .files
            .iter()
            .filter_map(|(p, f)| {
                p.strip_prefix(from)
                    .ok()
                    .map(|relative| (to.join(relative), f.clone()))
            })
            .collect();
        state.add_directory(to);
        for (target, file) in copies {
            state.add_file(&target, &file.contents, file.modified);
        }
        Ok(())
    }
}
