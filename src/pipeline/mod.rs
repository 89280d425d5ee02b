// ABOUTME: Behaviour pipeline: ordered stages of pluggable deployment behaviours.
// ABOUTME: Fail-fast per stage, with a failure stage and compensating actions on error.

mod registry;
mod runner;
mod stage;

pub use registry::BehaviourRegistry;
pub use runner::Pipeline;
pub use stage::Stage;

use async_trait::async_trait;

use crate::deployment::RunningDeployment;
use crate::error::ErrorKind;
use crate::extraction::ExtractionError;
use crate::fs::FsError;
use crate::journal::JournalError;
use crate::scripts::ScriptError;

/// One unit of deployment work within a stage.
#[async_trait]
pub trait Behaviour: Send + Sync {
    /// Shown in logs and error messages.
    fn name(&self) -> &str;

    /// Pure predicate, evaluated right before the behaviour would run.
    fn is_enabled(&self, deployment: &RunningDeployment) -> bool;

    async fn execute(&self, deployment: &mut RunningDeployment) -> Result<(), BehaviourError>;
}

#[derive(Debug, thiserror::Error)]
pub enum BehaviourError {
    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Journal(#[from] JournalError),

    #[error(transparent)]
    Fs(#[from] FsError),

    #[error("{0}")]
    Failed(String),
}

impl BehaviourError {
    pub fn failed(message: impl Into<String>) -> Self {
        BehaviourError::Failed(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BehaviourError::Journal(e) => e.kind(),
            BehaviourError::Fs(e) => e.kind(),
            _ => ErrorKind::Fatal,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{stage} behaviour '{behaviour}' failed: {source}")]
    Behaviour {
        stage: Stage,
        behaviour: String,
        #[source]
        source: BehaviourError,
    },

    #[error("failed to write deployment journal: {0}")]
    Journal(#[from] JournalError),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Behaviour { source, .. } => source.kind(),
            PipelineError::Journal(e) => e.kind(),
        }
    }
}
