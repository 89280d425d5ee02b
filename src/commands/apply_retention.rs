// ABOUTME: apply-retention command implementation.
// ABOUTME: Purges journaled releases of one policy set that fall outside the window.

use super::{Host, load_variables};
use deckhand::config::Config;
use deckhand::error::Result;
use deckhand::journal::{RetentionPolicy, SystemClock};
use deckhand::output::Output;
use std::path::Path;
use std::sync::Arc;

pub async fn apply_retention(
    config: &Config,
    policy_set: &str,
    days: Option<u32>,
    releases: Option<u32>,
    variables: Option<&Path>,
    mut output: Output,
) -> Result<()> {
    output.start_timer();
    let variables = load_variables(variables)?;
    let host = Host::new(config, &variables)?;

    let Some(journal) = host.journal.clone() else {
        output.warning("No deployment journal is configured; nothing to clean up");
        return Ok(());
    };

    // Command-line window replaces the configured one as a whole
    let (days, releases) = if days.is_none() && releases.is_none() {
        (config.retention.days, config.retention.releases)
    } else {
        (days, releases)
    };

    let mut policy = RetentionPolicy::new(host.fs.clone(), journal, Arc::new(SystemClock));
    if let Some(cache) = &config.package_cache {
        policy = policy.with_package_cache(cache);
    }

    output.progress(&format!("Applying retention policy to {policy_set}"));
    let report = policy
        .apply_retention_policy(policy_set, days, releases)
        .await?;
    output.diagnostics(&report.diagnostics);

    output.success(&format!(
        "Purged {} release(s), kept {}",
        report.purged.len(),
        report.kept.len()
    ));
    Ok(())
}
