// ABOUTME: Extracts the deployment's package into a fresh versioned directory.
// ABOUTME: The directory becomes the deployment's staging directory.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::package_identity;
use crate::deployment::RunningDeployment;
use crate::extraction::PackageExtractor;
use crate::fs::FileSystem;
use crate::pipeline::{Behaviour, BehaviourError};
use crate::variables::known;

pub struct ExtractPackageBehaviour {
    fs: Arc<dyn FileSystem>,
    extractor: Arc<dyn PackageExtractor>,
    applications_root: PathBuf,
}

impl ExtractPackageBehaviour {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        extractor: Arc<dyn PackageExtractor>,
        applications_root: PathBuf,
    ) -> Self {
        Self {
            fs,
            extractor,
            applications_root,
        }
    }

    /// `<root>/<id>/<version>`, or the first free `<version>_<n>` sibling.
    fn target_directory(&self, root: &Path, package_id: &str, version: &str) -> PathBuf {
        let parent = root.join(package_id);
        let mut candidate = parent.join(version);
        let mut n = 1;
        while self.fs.directory_exists(&candidate) && !self.fs.directory_is_empty(&candidate) {
            candidate = parent.join(format!("{version}_{n}"));
            n += 1;
        }
        candidate
    }
}

#[async_trait]
impl Behaviour for ExtractPackageBehaviour {
    fn name(&self) -> &str {
        "ExtractPackage"
    }

    fn is_enabled(&self, deployment: &RunningDeployment) -> bool {
        deployment.package_file_path().is_some()
    }

    async fn execute(&self, deployment: &mut RunningDeployment) -> Result<(), BehaviourError> {
        let Some(package) = deployment.package_file_path().map(Path::to_path_buf) else {
            return Ok(());
        };
        let (package_id, version) = package_identity(deployment).ok_or_else(|| {
            BehaviourError::failed(format!(
                "Could not determine the package id and version of {}; set {} and {}",
                package.display(),
                known::PACKAGE_ID,
                known::PACKAGE_VERSION
            ))
        })?;

        let root = deployment
            .variables()
            .get_non_empty(known::APPLICATION_DIRECTORY_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|| self.applications_root.clone());
        let target = self.target_directory(&root, &package_id, &version);
        tracing::info!(
            "Extracting package {} {} to {}",
            package_id,
            version,
            target.display()
        );

        let extractor = self.extractor.clone();
        let destination = target.clone();
        tokio::task::spawn_blocking(move || extractor.extract(&package, &destination))
            .await
            .map_err(crate::extraction::ExtractionError::from)??;

        let vars = deployment.variables_mut();
        vars.set(known::PACKAGE_ID, package_id);
        vars.set(known::PACKAGE_VERSION, version);
        deployment.set_staging_directory(target);
        Ok(())
    }
}
