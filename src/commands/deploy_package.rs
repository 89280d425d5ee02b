// ABOUTME: deploy-package command implementation.
// ABOUTME: Extracts a package and runs the full convention pipeline against it.

use super::{Host, load_variables};
use deckhand::behaviours::deploy_package_registry;
use deckhand::config::Config;
use deckhand::deployment::RunningDeployment;
use deckhand::error::Result;
use deckhand::extraction::ExtractionError;
use deckhand::output::Output;
use std::path::{Path, PathBuf};

pub async fn deploy_package(
    config: &Config,
    package: PathBuf,
    variables: Option<&Path>,
    mut output: Output,
) -> Result<()> {
    output.start_timer();
    if !package.is_file() {
        return Err(ExtractionError::PackageNotFound(package).into());
    }

    let variables = load_variables(variables)?;
    let host = Host::new(config, &variables)?;
    let pipeline = host.pipeline(deploy_package_registry(&host.services));

    output.progress(&format!("Deploying package {}", package.display()));
    let mut deployment = RunningDeployment::new(Some(package.clone()), variables);
    let result = pipeline.execute(&mut deployment).await;
    output.diagnostics(deployment.diagnostics());
    result?;

    output.success(&format!(
        "Deployed {} to {}",
        package.display(),
        deployment.current_directory().display()
    ));
    Ok(())
}
