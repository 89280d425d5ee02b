// ABOUTME: JSON ledger of journal entries, read and rewritten under a named lock.
// ABOUTME: A corrupt ledger is backed up before it is replaced.

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::JournalError;
use super::entry::JournalEntry;
use crate::fs::{FileSystem, FsError};
use crate::semaphore::{Semaphore, SemaphoreGuard};

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(60);

/// The machine's deployment journal.
pub struct DeploymentJournal {
    fs: Arc<dyn FileSystem>,
    semaphore: Arc<dyn Semaphore>,
    path: PathBuf,
    lock_timeout: Duration,
}

impl std::fmt::Debug for DeploymentJournal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeploymentJournal")
            .field("path", &self.path)
            .field("lock_timeout", &self.lock_timeout)
            .finish()
    }
}

impl DeploymentJournal {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        semaphore: Arc<dyn Semaphore>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fs,
            semaphore,
            path: path.into(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn semaphore(&self) -> &Arc<dyn Semaphore> {
        &self.semaphore
    }

    pub(crate) fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    pub async fn get_all_entries(&self) -> Result<Vec<JournalEntry>, JournalError> {
        let _guard = self.lock().await?;
        self.read(false)
    }

    pub async fn entries_for_policy_set(
        &self,
        policy_set: &str,
    ) -> Result<Vec<JournalEntry>, JournalError> {
        let mut entries = self.get_all_entries().await?;
        entries.retain(|e| e.retention_policy_set == policy_set);
        Ok(entries)
    }

    pub async fn add_entry(&self, entry: JournalEntry) -> Result<(), JournalError> {
        let _guard = self.lock().await?;
        let mut entries = self.read(true)?;
        tracing::debug!(
            "Adding journal entry {} for {:?} {:?}",
            entry.id,
            entry.package_id,
            entry.package_version
        );
        entries.retain(|e| e.id != entry.id);
        entries.push(entry);
        self.write(&entries)
    }

    /// Remove entries by id. Returns how many were removed.
    pub async fn remove_entries(&self, ids: &[String]) -> Result<usize, JournalError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let _guard = self.lock().await?;
        let mut entries = self.read(true)?;
        let before = entries.len();
        entries.retain(|e| !ids.contains(&e.id));
        let removed = before - entries.len();
        if removed > 0 {
            self.write(&entries)?;
        }
        Ok(removed)
    }

    /// Most recent entry for the package in the policy set, optionally successful ones only.
    pub async fn latest_installation(
        &self,
        package_id: &str,
        policy_set: &str,
        successful_only: bool,
    ) -> Result<Option<JournalEntry>, JournalError> {
        Ok(self
            .entries_for_policy_set(policy_set)
            .await?
            .into_iter()
            .filter(|e| e.is_package(package_id) && (e.was_successful || !successful_only))
            .max_by(|a, b| {
                a.installed_on
                    .cmp(&b.installed_on)
                    .then_with(|| a.id.cmp(&b.id))
            }))
    }

    /// Most recent successful install of exactly this package version.
    pub async fn latest_successful_installation(
        &self,
        package_id: &str,
        version: &str,
        policy_set: &str,
    ) -> Result<Option<JournalEntry>, JournalError> {
        Ok(self
            .entries_for_policy_set(policy_set)
            .await?
            .into_iter()
            .filter(|e| {
                e.was_successful
                    && e.is_package(package_id)
                    && e.package_version.as_deref() == Some(version)
            })
            .max_by(|a, b| {
                a.installed_on
                    .cmp(&b.installed_on)
                    .then_with(|| a.id.cmp(&b.id))
            }))
    }

    async fn lock(&self) -> Result<SemaphoreGuard, JournalError> {
        let name = format!("deckhand-journal:{}", self.path.display());
        Ok(self.semaphore.acquire(&name, self.lock_timeout).await?)
    }

    fn read(&self, for_update: bool) -> Result<Vec<JournalEntry>, JournalError> {
        let json = match self.fs.read_to_string(&self.path) {
            Ok(json) => json,
            Err(FsError::NotFound(_)) => return Ok(Vec::new()),
            Err(source) => {
                return Err(JournalError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if json.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str(&json) {
            Ok(entries) => Ok(entries),
            Err(e) if for_update => {
                let backup = self.backup_path();
                tracing::warn!(
                    "Deployment journal {} is corrupt ({}); backing it up to {} and starting a new one",
                    self.path.display(),
                    e,
                    backup.display()
                );
                self.fs
                    .write_all_text(&backup, &json)
                    .map_err(|source| JournalError::Io {
                        path: backup.clone(),
                        source,
                    })?;
                Ok(Vec::new())
            }
            Err(e) => {
                tracing::warn!(
                    "Deployment journal {} is corrupt ({}); treating it as empty",
                    self.path.display(),
                    e
                );
                Ok(Vec::new())
            }
        }
    }

    fn write(&self, entries: &[JournalEntry]) -> Result<(), JournalError> {
        if let Some(parent) = self.path.parent() {
            self.fs
                .create_directory(parent)
                .map_err(|source| JournalError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        self.fs
            .write_all_text(&self.path, &json)
            .map_err(|source| JournalError::Io {
                path: self.path.clone(),
                source,
            })
    }

    fn backup_path(&self) -> PathBuf {
        let stamp = Utc::now().format("%Y%m%d%H%M%S");
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".corrupt-{stamp}"));
        self.path.with_file_name(name)
    }
}
