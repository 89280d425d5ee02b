// ABOUTME: Application-wide error types for deckhand.
// ABOUTME: Aggregates module errors and classifies them by ErrorKind.

use std::path::PathBuf;
use thiserror::Error;

use crate::extraction::ExtractionError;
use crate::fs::FsError;
use crate::journal::JournalError;
use crate::pipeline::PipelineError;
use crate::scripts::ScriptError;
use crate::semaphore::SemaphoreError;
use crate::variables::VariablesError;

/// How a caller should react to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Worth retrying: contention or a flaky external call.
    Transient,
    /// Terminal for the current deployment.
    Fatal,
    /// Log and continue; a cleanup step that may fail without consequence.
    BestEffort,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Fs(#[from] FsError),

    #[error(transparent)]
    Semaphore(#[from] SemaphoreError),

    #[error(transparent)]
    Journal(#[from] JournalError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Variables(#[from] VariablesError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Fs(e) => e.kind(),
            Error::Semaphore(e) => e.kind(),
            Error::Journal(e) => e.kind(),
            Error::Pipeline(e) => e.kind(),
            _ => ErrorKind::Fatal,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn lock_timeout_is_transient() {
        let err: Error = SemaphoreError::Timeout {
            name: "journal".to_string(),
            waited: Duration::from_secs(1),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Transient);
    }

    #[test]
    fn config_errors_are_fatal() {
        let err = Error::InvalidConfig("bad".to_string());
        assert_eq!(err.kind(), ErrorKind::Fatal);
    }
}
