// ABOUTME: Built-in deployment behaviours and the standard stage layout.
// ABOUTME: Commands compose registries from these instead of discovering types at runtime.

mod already_installed;
mod custom_installation;
mod extract_package;
mod previous_installation;
mod run_script;
mod scripts;

pub use already_installed::AlreadyInstalledBehaviour;
pub use custom_installation::CopyToCustomInstallationDirectoryBehaviour;
pub use extract_package::ExtractPackageBehaviour;
pub use previous_installation::PreviousInstallationBehaviour;
pub use run_script::RunScriptBehaviour;
pub use scripts::{ConfiguredScriptBehaviour, PackagedScriptBehaviour};

use std::path::PathBuf;
use std::sync::Arc;

use crate::deployment::RunningDeployment;
use crate::extraction::{PackageExtractor, package_identity_from_file_name};
use crate::fs::FileSystem;
use crate::journal::DeploymentJournal;
use crate::pipeline::{BehaviourRegistry, Stage};
use crate::scripts::ScriptEngine;
use crate::variables::known;

/// Collaborators shared by the built-in behaviours.
#[derive(Clone)]
pub struct BehaviourServices {
    pub fs: Arc<dyn FileSystem>,
    pub scripts: Arc<dyn ScriptEngine>,
    pub extractor: Arc<dyn PackageExtractor>,
    pub journal: Option<Arc<DeploymentJournal>>,
    /// Root under which packages are extracted, `<root>/<id>/<version>`.
    pub applications_root: PathBuf,
}

impl std::fmt::Debug for BehaviourServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BehaviourServices")
            .field("journal", &self.journal)
            .field("applications_root", &self.applications_root)
            .finish()
    }
}

/// Stage layout for deploying a package.
pub fn deploy_package_registry(services: &BehaviourServices) -> BehaviourRegistry {
    let mut registry = BehaviourRegistry::new();
    let s = services.clone();
    registry.register(Stage::BeforePackageExtraction, move || {
        PreviousInstallationBehaviour::new(s.journal.clone())
    });
    let s = services.clone();
    registry.register(Stage::BeforePackageExtraction, move || {
        AlreadyInstalledBehaviour::new(s.journal.clone())
    });
    register_extraction(&mut registry, services);

    register_configured(&mut registry, services, Stage::PreDeploy);
    register_packaged(&mut registry, services, Stage::PreDeploy);
    let s = services.clone();
    registry.register(Stage::PreDeploy, move || {
        CopyToCustomInstallationDirectoryBehaviour::new(s.fs.clone())
    });

    for stage in [Stage::Deploy, Stage::PostDeploy, Stage::DeployFailed] {
        register_packaged(&mut registry, services, stage);
        register_configured(&mut registry, services, stage);
    }
    registry
}

/// Stage layout for running a single script, optionally from inside a package.
pub fn run_script_registry(services: &BehaviourServices, script: PathBuf) -> BehaviourRegistry {
    let mut registry = BehaviourRegistry::new();
    register_extraction(&mut registry, services);
    let engine = services.scripts.clone();
    registry.register(Stage::Deploy, move || {
        RunScriptBehaviour::new(script.clone(), engine.clone())
    });
    registry
}

fn register_extraction(registry: &mut BehaviourRegistry, services: &BehaviourServices) {
    let s = services.clone();
    registry.register(Stage::PackageExtraction, move || {
        ExtractPackageBehaviour::new(
            s.fs.clone(),
            s.extractor.clone(),
            s.applications_root.clone(),
        )
    });
}

fn register_packaged(
    registry: &mut BehaviourRegistry,
    services: &BehaviourServices,
    stage: Stage,
) {
    let s = services.clone();
    registry.register(stage, move || {
        PackagedScriptBehaviour::new(stage, s.fs.clone(), s.scripts.clone())
    });
}

fn register_configured(
    registry: &mut BehaviourRegistry,
    services: &BehaviourServices,
    stage: Stage,
) {
    let s = services.clone();
    registry.register(stage, move || {
        ConfiguredScriptBehaviour::new(stage, s.fs.clone(), s.scripts.clone())
    });
}

/// Package id and version from variables, else parsed from the package file name.
pub(crate) fn package_identity(deployment: &RunningDeployment) -> Option<(String, String)> {
    let vars = deployment.variables();
    if let (Some(id), Some(version)) = (
        vars.get_non_empty(known::PACKAGE_ID),
        vars.get_non_empty(known::PACKAGE_VERSION),
    ) {
        return Some((id.to_string(), version.to_string()));
    }
    deployment
        .package_file_path()
        .and_then(package_identity_from_file_name)
}
