// ABOUTME: Test support utilities.
// ABOUTME: Tracing setup and builders for journal entries and in-memory journals.

use chrono::{DateTime, Duration, TimeZone, Utc};
use deckhand::fs::{FileSystem, InMemoryFileSystem};
use deckhand::journal::{DeploymentJournal, JournalEntry};
use deckhand::semaphore::{LockFileSemaphore, Semaphore};
use std::path::PathBuf;
use std::sync::{Arc, Once};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter =
            EnvFilter::from_default_env().add_directive("deckhand=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// A fixed reference instant so ages in tests are exact.
#[allow(dead_code)]
pub fn reference_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

#[allow(dead_code)]
pub fn days_ago(days: i64) -> DateTime<Utc> {
    reference_now() - Duration::days(days)
}

/// An entry for package `Acme.Web` in policy set `set-1`, extracted under `/apps`.
#[allow(dead_code)]
pub fn entry(id: &str, version: &str, installed_on: DateTime<Utc>, ok: bool) -> JournalEntry {
    JournalEntry {
        id: id.to_string(),
        environment_id: Some("Environments-1".to_string()),
        tenant_id: None,
        project_id: Some("Projects-1".to_string()),
        retention_policy_set: "set-1".to_string(),
        package_id: Some("Acme.Web".to_string()),
        package_version: Some(version.to_string()),
        extracted_from: Some(PathBuf::from(format!("/packages/Acme.Web.{version}.tar"))),
        extracted_to: Some(PathBuf::from(format!("/apps/Acme.Web/{version}"))),
        custom_installation_directory: None,
        installed_on,
        was_successful: ok,
    }
}

/// A journal over an in-memory file system with real lock-file semantics.
#[allow(dead_code)]
pub fn memory_journal(fs: Arc<InMemoryFileSystem>) -> Arc<DeploymentJournal> {
    let dyn_fs: Arc<dyn FileSystem> = fs;
    let semaphore: Arc<dyn Semaphore> = Arc::new(
        LockFileSemaphore::in_directory(dyn_fs.clone(), "/locks")
            .with_poll_interval(std::time::Duration::from_millis(5)),
    );
    Arc::new(DeploymentJournal::new(
        dyn_fs,
        semaphore,
        "/journal/DeploymentJournal.json",
    ))
}
