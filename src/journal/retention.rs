// ABOUTME: Retention policy: decides which journal entries to purge and deletes their files.
// ABOUTME: Keeps releases by age or by count of successful releases.

use chrono::Duration as TimeDelta;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::clock::Clock;
use super::entry::JournalEntry;
use super::ledger::DeploymentJournal;
use super::JournalError;
use crate::diagnostics::{Diagnostics, Warning};
use crate::fs::{FailureOptions, FileSystem};

const DOWNLOADING_EXTENSION: &str = "downloading";

/// What one application of the policy did.
#[derive(Debug, Default)]
pub struct RetentionReport {
    pub purged: Vec<JournalEntry>,
    pub kept: Vec<JournalEntry>,
    pub removed_downloads: Vec<PathBuf>,
    pub diagnostics: Diagnostics,
}

pub struct RetentionPolicy {
    fs: Arc<dyn FileSystem>,
    journal: Arc<DeploymentJournal>,
    clock: Arc<dyn Clock>,
    package_cache: Option<PathBuf>,
}

impl std::fmt::Debug for RetentionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetentionPolicy")
            .field("journal", &self.journal)
            .field("package_cache", &self.package_cache)
            .finish()
    }
}

impl RetentionPolicy {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        journal: Arc<DeploymentJournal>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            fs,
            journal,
            clock,
            package_cache: None,
        }
    }

    /// Directory scanned for stale partial downloads after each purge.
    pub fn with_package_cache(mut self, package_cache: impl Into<PathBuf>) -> Self {
        self.package_cache = Some(package_cache.into());
        self
    }

    /// Purge entries of `policy_set` outside the retention window.
    ///
    /// `days` takes precedence over `releases`. With neither set (or both zero)
    /// everything is kept. File deletions are best-effort; failures end up in
    /// the report's diagnostics.
    pub async fn apply_retention_policy(
        &self,
        policy_set: &str,
        days: Option<u32>,
        releases: Option<u32>,
    ) -> Result<RetentionReport, JournalError> {
        let name = format!("deckhand-retention:{}", self.journal.path().display());
        let _guard = self
            .journal
            .semaphore()
            .acquire(&name, self.journal.lock_timeout())
            .await?;

        let mut entries = self.journal.entries_for_policy_set(policy_set).await?;
        entries.sort_by(|a, b| {
            b.installed_on
                .cmp(&a.installed_on)
                .then_with(|| b.id.cmp(&a.id))
        });

        let (kept, purged) = match (days.filter(|d| *d > 0), releases.filter(|r| *r > 0)) {
            (Some(days), _) => {
                tracing::info!("Keeping deployments from the last {} days", days);
                self.split_by_age(entries, days)
            }
            (None, Some(releases)) => {
                tracing::info!(
                    "Keeping this deployment and the previous {} successful deployments",
                    releases
                );
                split_by_releases(entries, releases)
            }
            (None, None) => {
                tracing::info!("Keeping all releases");
                return Ok(RetentionReport {
                    kept: entries,
                    ..RetentionReport::default()
                });
            }
        };

        let mut report = RetentionReport {
            kept,
            ..RetentionReport::default()
        };

        if purged.is_empty() {
            tracing::info!("Did not find any deployments to clean up");
        }

        for entry in &purged {
            self.delete_extraction_destination(entry, &report.kept, &mut report.diagnostics);
            self.delete_extraction_source(entry, &report.kept, &mut report.diagnostics);
        }

        let ids: Vec<String> = purged.iter().map(|e| e.id.clone()).collect();
        self.journal.remove_entries(&ids).await?;
        report.purged = purged;

        self.remove_failed_downloads(&mut report);
        Ok(report)
    }

    fn split_by_age(
        &self,
        entries: Vec<JournalEntry>,
        days: u32,
    ) -> (Vec<JournalEntry>, Vec<JournalEntry>) {
        let now = self.clock.now();
        let cutoff = TimeDelta::days(i64::from(days));
        entries.into_iter().partition(|entry| {
            let age = now - entry.installed_on;
            let keep = age <= cutoff;
            if keep {
                tracing::debug!(
                    "Keeping {} as it was installed {} days and {} hours ago",
                    describe(entry),
                    age.num_days(),
                    age.num_hours() % 24
                );
            }
            keep
        })
    }

    fn delete_extraction_destination(
        &self,
        entry: &JournalEntry,
        kept: &[JournalEntry],
        diagnostics: &mut Diagnostics,
    ) {
        let Some(dir) = entry.extracted_to.as_deref() else {
            return;
        };
        if !self.fs.directory_exists(dir)
            || kept.iter().any(|k| k.extracted_to.as_deref() == Some(dir))
        {
            return;
        }

        tracing::info!("Removing directory '{}'", dir.display());
        if let Err(e) = self.fs.purge_directory(dir, FailureOptions::IgnoreFailure) {
            tracing::debug!("Purge of '{}' reported: {}", dir.display(), e);
        }
        if let Err(e) = self.fs.delete_directory(dir) {
            diagnostics.warn(Warning::directory_not_removed(dir, e));
        }
    }

    fn delete_extraction_source(
        &self,
        entry: &JournalEntry,
        kept: &[JournalEntry],
        diagnostics: &mut Diagnostics,
    ) {
        let Some(file) = entry.extracted_from.as_deref() else {
            return;
        };
        if file.as_os_str().is_empty()
            || !self.fs.file_exists(file)
            || kept.iter().any(|k| k.extracted_from.as_deref() == Some(file))
        {
            return;
        }

        tracing::info!("Removing package file '{}'", file.display());
        if let Err(e) = self.fs.delete_file(file, FailureOptions::ThrowOnFailure) {
            diagnostics.warn(Warning::file_not_removed(file, e));
        }
    }

    fn remove_failed_downloads(&self, report: &mut RetentionReport) {
        let Some(cache) = self.package_cache.as_deref() else {
            return;
        };
        if !self.fs.directory_exists(cache) {
            return;
        }

        let files = match self.fs.enumerate_files_recursively(cache) {
            Ok(files) => files,
            Err(e) => {
                tracing::debug!("Could not scan package cache {}: {}", cache.display(), e);
                return;
            }
        };
        let cutoff = self.clock.now() - TimeDelta::days(1);

        for file in files.iter().filter(|f| is_partial_download(f)) {
            let stale = self
                .fs
                .modified_time(file)
                .is_ok_and(|modified| modified <= cutoff);
            if !stale {
                continue;
            }
            tracing::debug!("Removing the failed to download file {}", file.display());
            match self.fs.delete_file(file, FailureOptions::ThrowOnFailure) {
                Ok(()) => report.removed_downloads.push(file.clone()),
                Err(e) => report.diagnostics.warn(Warning::file_not_removed(file, e)),
            }
        }
    }
}

/// Walk newest-first, keeping everything until `releases + 1` successful
/// releases have been kept. Failures seen before that point are kept too.
fn split_by_releases(
    entries: Vec<JournalEntry>,
    releases: u32,
) -> (Vec<JournalEntry>, Vec<JournalEntry>) {
    let limit = usize::try_from(releases).unwrap_or(usize::MAX);
    let mut kept = Vec::new();
    let mut purged = Vec::new();
    let mut successful = 0usize;

    for entry in entries {
        if !purged.is_empty() || successful > limit {
            purged.push(entry);
            continue;
        }
        if entry.was_successful {
            successful += 1;
            tracing::debug!(
                "Keeping {} as it is the {}most recent successful release",
                describe(&entry),
                ordinal_prefix(successful)
            );
        }
        kept.push(entry);
    }
    (kept, purged)
}

fn describe(entry: &JournalEntry) -> String {
    let to = entry
        .extracted_to
        .as_deref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    let from = entry
        .extracted_from
        .as_deref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    format!("{to} and {from}")
}

fn ordinal_prefix(n: usize) -> String {
    if n == 1 {
        return String::new();
    }
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix} ")
}

fn is_partial_download(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(DOWNLOADING_EXTENSION))
}
