// ABOUTME: Deployment journal: the persisted ledger of package extractions.
// ABOUTME: Retention policy and journal writer build on it.

mod clock;
mod entry;
mod ledger;
mod retention;
mod writer;

pub use clock::{Clock, FixedClock, SystemClock};
pub use entry::JournalEntry;
pub use ledger::DeploymentJournal;
pub use retention::{RetentionPolicy, RetentionReport};
pub use writer::JournalWriter;

use std::path::PathBuf;

use crate::error::ErrorKind;
use crate::fs::FsError;
use crate::semaphore::SemaphoreError;

#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("could not lock the deployment journal: {0}")]
    Lock(#[from] SemaphoreError),

    #[error("deployment journal {path} could not be accessed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: FsError,
    },

    #[error("failed to serialize deployment journal: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl JournalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            JournalError::Lock(e) => e.kind(),
            JournalError::Io { .. } | JournalError::Serialize(_) => ErrorKind::Fatal,
        }
    }
}
