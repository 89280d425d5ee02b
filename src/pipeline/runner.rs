// ABOUTME: Runs registered behaviours stage by stage against one deployment.
// ABOUTME: Records failures, runs the failure stage once, and journals the outcome.

use std::sync::Arc;

use super::{BehaviourRegistry, PipelineError, Stage};
use crate::deployment::RunningDeployment;
use crate::diagnostics::Warning;
use crate::journal::JournalWriter;
use crate::variables::known;

#[derive(Debug)]
pub struct Pipeline {
    registry: BehaviourRegistry,
    journal_writer: Option<Arc<JournalWriter>>,
}

impl Pipeline {
    pub fn new(registry: BehaviourRegistry) -> Self {
        Self {
            registry,
            journal_writer: None,
        }
    }

    pub fn with_journal_writer(mut self, journal_writer: Arc<JournalWriter>) -> Self {
        self.journal_writer = Some(journal_writer);
        self
    }

    /// Run every stage in order.
    ///
    /// On the first failing behaviour the rest of the run is abandoned, the
    /// error is recorded on `deployment`, the `DeployFailed` stage runs once,
    /// compensating actions run, and an unsuccessful journal entry is written
    /// before the error is returned.
    pub async fn execute(&self, deployment: &mut RunningDeployment) -> Result<(), PipelineError> {
        match self.run_stages(deployment).await {
            Ok(()) => {
                self.write_journal(deployment, true).await?;
                Ok(())
            }
            Err(err) => {
                deployment.error(&err);
                tracing::error!("{}", err);
                self.run_failure_stage(deployment).await;
                deployment.run_compensating_actions();
                if let Err(journal_err) = self.write_journal(deployment, false).await {
                    tracing::warn!("Failed to journal the failed deployment: {}", journal_err);
                }
                Err(err)
            }
        }
    }

    async fn run_stages(&self, deployment: &mut RunningDeployment) -> Result<(), PipelineError> {
        for stage in Stage::SEQUENCE {
            for behaviour in self.registry.resolve(stage) {
                if !behaviour.is_enabled(deployment) {
                    tracing::debug!("{}: skipping {} (not enabled)", stage, behaviour.name());
                    continue;
                }

                tracing::debug!("{}: running {}", stage, behaviour.name());
                behaviour
                    .execute(deployment)
                    .await
                    .map_err(|source| PipelineError::Behaviour {
                        stage,
                        behaviour: behaviour.name().to_string(),
                        source,
                    })?;

                if deployment
                    .variables()
                    .get_flag(known::SKIP_REMAINING_CONVENTIONS, false)
                {
                    tracing::info!(
                        "{} requested that the remaining behaviours be skipped",
                        behaviour.name()
                    );
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    async fn run_failure_stage(&self, deployment: &mut RunningDeployment) {
        let behaviours = self.registry.resolve(Stage::DeployFailed);
        if behaviours.is_empty() {
            return;
        }

        tracing::info!("Running rollback behaviours...");
        for behaviour in behaviours {
            if !behaviour.is_enabled(deployment) {
                continue;
            }
            if let Err(e) = behaviour.execute(deployment).await {
                let message = format!(
                    "{} behaviour '{}' failed: {}",
                    Stage::DeployFailed,
                    behaviour.name(),
                    e
                );
                deployment
                    .diagnostics_mut()
                    .warn(Warning::rollback_failed(message));
            }
        }
    }

    async fn write_journal(
        &self,
        deployment: &RunningDeployment,
        was_successful: bool,
    ) -> Result<(), PipelineError> {
        if let Some(writer) = &self.journal_writer {
            writer.add_journal_entry(deployment, was_successful).await?;
        }
        Ok(())
    }
}
