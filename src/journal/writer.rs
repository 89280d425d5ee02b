// ABOUTME: Decides whether a finished deployment gets a journal entry and writes it.
// ABOUTME: Steps without a package, or with journaling disabled, leave no entry.

use std::path::Path;
use std::sync::Arc;

use super::JournalError;
use super::clock::Clock;
use super::entry::JournalEntry;
use super::ledger::DeploymentJournal;
use crate::deployment::RunningDeployment;
use crate::fs::FileSystem;
use crate::variables::known;

pub struct JournalWriter {
    fs: Arc<dyn FileSystem>,
    journal: Option<Arc<DeploymentJournal>>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for JournalWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournalWriter")
            .field("journal", &self.journal)
            .finish()
    }
}

impl JournalWriter {
    /// `journal` is `None` when no journal location is configured.
    pub fn new(
        fs: Arc<dyn FileSystem>,
        journal: Option<Arc<DeploymentJournal>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { fs, journal, clock }
    }

    pub fn journal(&self) -> Option<&Arc<DeploymentJournal>> {
        self.journal.as_ref()
    }

    /// Whether an entry would be written for `deployment` right now.
    pub fn should_write(&self, deployment: &RunningDeployment) -> bool {
        if deployment.skip_journal() {
            tracing::debug!("Journal skipped for this deployment");
            return false;
        }
        let has_package = deployment.package_file_path().is_some()
            || !deployment
                .variables()
                .get_indexes(known::PACKAGE_COLLECTION)
                .is_empty();
        if !has_package {
            tracing::debug!("No package involved; nothing to journal");
            return false;
        }
        if self.journal.is_none() {
            tracing::debug!("No deployment journal configured");
            return false;
        }
        let extracted = deployment
            .variables()
            .get_non_empty(known::ORIGINAL_PACKAGE_DIRECTORY_PATH)
            .map(Path::new)
            .is_some_and(|dir| self.fs.directory_exists(dir) && !self.fs.directory_is_empty(dir));
        if !extracted {
            tracing::debug!("Extraction directory is missing or empty; nothing to journal");
        }
        extracted
    }

    /// Write an entry if the deployment qualifies. Returns the entry written.
    pub async fn add_journal_entry(
        &self,
        deployment: &RunningDeployment,
        was_successful: bool,
    ) -> Result<Option<JournalEntry>, JournalError> {
        if !self.should_write(deployment) {
            return Ok(None);
        }
        let Some(journal) = &self.journal else {
            return Ok(None);
        };
        let entry = JournalEntry::from_deployment(deployment, was_successful, self.clock.now());
        journal.add_entry(entry.clone()).await?;
        Ok(Some(entry))
    }
}
