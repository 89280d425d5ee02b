// ABOUTME: run-script command implementation.

use super::{Host, load_variables};
use deckhand::behaviours::run_script_registry;
use deckhand::config::Config;
use deckhand::deployment::RunningDeployment;
use deckhand::error::Result;
use deckhand::extraction::ExtractionError;
use deckhand::output::Output;
use std::path::{Path, PathBuf};

pub async fn run_script(
    config: &Config,
    script: PathBuf,
    package: Option<PathBuf>,
    variables: Option<&Path>,
    mut output: Output,
) -> Result<()> {
    output.start_timer();
    if let Some(package) = &package
        && !package.is_file()
    {
        return Err(ExtractionError::PackageNotFound(package.clone()).into());
    }

    let variables = load_variables(variables)?;
    let host = Host::new(config, &variables)?;
    let pipeline = host.pipeline(run_script_registry(&host.services, script.clone()));

    output.progress(&format!("Running script {}", script.display()));
    let mut deployment = RunningDeployment::new(package, variables);
    let result = pipeline.execute(&mut deployment).await;
    output.diagnostics(deployment.diagnostics());
    result?;

    output.success(&format!("Script {} completed", script.display()));
    Ok(())
}
