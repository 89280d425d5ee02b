// ABOUTME: Copies extracted package content to a custom installation directory.

use async_trait::async_trait;
use std::sync::Arc;

use crate::deployment::{RunningDeployment, WorkingDirectory};
use crate::fs::{FailureOptions, FileSystem};
use crate::pipeline::{Behaviour, BehaviourError};
use crate::variables::known;

pub struct CopyToCustomInstallationDirectoryBehaviour {
    fs: Arc<dyn FileSystem>,
}

impl CopyToCustomInstallationDirectoryBehaviour {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

#[async_trait]
impl Behaviour for CopyToCustomInstallationDirectoryBehaviour {
    fn name(&self) -> &str {
        "CopyToCustomInstallationDirectory"
    }

    fn is_enabled(&self, deployment: &RunningDeployment) -> bool {
        deployment.custom_installation_directory().is_some()
    }

    async fn execute(&self, deployment: &mut RunningDeployment) -> Result<(), BehaviourError> {
        let Some(custom) = deployment.custom_installation_directory() else {
            return Ok(());
        };
        if !custom.is_absolute() {
            return Err(BehaviourError::failed(format!(
                "The custom install directory '{}' is a relative path; please specify the path as an absolute path",
                custom.display()
            )));
        }

        let staging = deployment.staging_directory().to_path_buf();
        if staging == custom {
            tracing::debug!("Custom installation directory is the staging directory");
        } else {
            self.fs.create_directory(&custom)?;
            if deployment
                .variables()
                .get_flag(known::PURGE_CUSTOM_INSTALLATION_DIRECTORY, false)
            {
                tracing::info!("Purging the directory '{}'", custom.display());
                self.fs
                    .purge_directory(&custom, FailureOptions::ThrowOnFailure)?;
            }
            tracing::info!("Copying package contents to '{}'", custom.display());
            self.fs.copy_directory(&staging, &custom)?;
        }

        deployment.set_working_directory(WorkingDirectory::CustomInstallationDirectory);
        Ok(())
    }
}
