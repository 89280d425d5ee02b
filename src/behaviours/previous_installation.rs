// ABOUTME: Publishes details of the previous installation of this package as variables.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use super::package_identity;
use crate::deployment::RunningDeployment;
use crate::journal::{DeploymentJournal, JournalEntry};
use crate::pipeline::{Behaviour, BehaviourError};
use crate::variables::{Variables, known};

pub struct PreviousInstallationBehaviour {
    journal: Option<Arc<DeploymentJournal>>,
}

impl PreviousInstallationBehaviour {
    pub fn new(journal: Option<Arc<DeploymentJournal>>) -> Self {
        Self { journal }
    }
}

#[async_trait]
impl Behaviour for PreviousInstallationBehaviour {
    fn name(&self) -> &str {
        "PreviousInstallation"
    }

    fn is_enabled(&self, deployment: &RunningDeployment) -> bool {
        self.journal.is_some() && package_identity(deployment).is_some()
    }

    async fn execute(&self, deployment: &mut RunningDeployment) -> Result<(), BehaviourError> {
        let (Some(journal), Some((package_id, _))) = (&self.journal, package_identity(deployment))
        else {
            return Ok(());
        };
        let policy_set = deployment
            .variables()
            .get_or(known::RETENTION_POLICY_SET, "")
            .to_string();

        let previous = journal
            .latest_installation(&package_id, &policy_set, false)
            .await?;
        let previous_successful = journal
            .latest_installation(&package_id, &policy_set, true)
            .await?;

        let vars = deployment.variables_mut();
        match &previous {
            Some(entry) => {
                tracing::info!(
                    "The previous installation of {} was version {}",
                    package_id,
                    entry.package_version.as_deref().unwrap_or("unknown")
                );
                publish(
                    vars,
                    entry,
                    [
                        known::previous_installation::PACKAGE_VERSION,
                        known::previous_installation::PACKAGE_FILE_PATH,
                        known::previous_installation::ORIGINAL_INSTALLED_PATH,
                        known::previous_installation::CUSTOM_INSTALLATION_DIRECTORY,
                    ],
                );
            }
            None => tracing::info!(
                "No previous installation of package {} could be found",
                package_id
            ),
        }
        if let Some(entry) = &previous_successful {
            publish(
                vars,
                entry,
                [
                    known::previous_successful_installation::PACKAGE_VERSION,
                    known::previous_successful_installation::PACKAGE_FILE_PATH,
                    known::previous_successful_installation::ORIGINAL_INSTALLED_PATH,
                    known::previous_successful_installation::CUSTOM_INSTALLATION_DIRECTORY,
                ],
            );
        }
        Ok(())
    }
}

fn publish(
    vars: &mut Variables,
    entry: &JournalEntry,
    [version, file, installed, custom]: [&str; 4],
) {
    let path = |p: Option<&Path>| p.map(|p| p.display().to_string()).unwrap_or_default();
    vars.set(version, entry.package_version.clone().unwrap_or_default());
    vars.set(file, path(entry.extracted_from.as_deref()));
    vars.set(installed, path(entry.extracted_to.as_deref()));
    vars.set(custom, path(entry.custom_installation_directory.as_deref()));
}
