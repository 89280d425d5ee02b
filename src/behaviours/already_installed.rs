// ABOUTME: Stops the run early when this exact package version is already installed.

use async_trait::async_trait;
use std::sync::Arc;

use super::package_identity;
use crate::deployment::RunningDeployment;
use crate::journal::DeploymentJournal;
use crate::pipeline::{Behaviour, BehaviourError};
use crate::variables::known;

pub struct AlreadyInstalledBehaviour {
    journal: Option<Arc<DeploymentJournal>>,
}

impl AlreadyInstalledBehaviour {
    pub fn new(journal: Option<Arc<DeploymentJournal>>) -> Self {
        Self { journal }
    }
}

#[async_trait]
impl Behaviour for AlreadyInstalledBehaviour {
    fn name(&self) -> &str {
        "AlreadyInstalled"
    }

    fn is_enabled(&self, deployment: &RunningDeployment) -> bool {
        self.journal.is_some()
            && deployment
                .variables()
                .get_flag(known::SKIP_IF_ALREADY_INSTALLED, false)
            && package_identity(deployment).is_some()
    }

    async fn execute(&self, deployment: &mut RunningDeployment) -> Result<(), BehaviourError> {
        let (Some(journal), Some((package_id, version))) =
            (&self.journal, package_identity(deployment))
        else {
            return Ok(());
        };
        let policy_set = deployment
            .variables()
            .get_or(known::RETENTION_POLICY_SET, "")
            .to_string();

        let installed = journal
            .latest_successful_installation(&package_id, &version, &policy_set)
            .await?;
        if let Some(entry) = installed {
            tracing::info!(
                "The package {} version {} has already been installed on this machine, so it will not be installed again",
                package_id,
                version
            );
            let vars = deployment.variables_mut();
            vars.set(known::SKIP_REMAINING_CONVENTIONS, "true");
            if let Some(dir) = &entry.extracted_to {
                vars.set(
                    known::ORIGINAL_PACKAGE_DIRECTORY_PATH,
                    dir.display().to_string(),
                );
            }
            deployment.set_skip_journal(true);
        }
        Ok(())
    }
}
