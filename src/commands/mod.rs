// ABOUTME: Command module aggregator for the deckhand CLI.
// ABOUTME: Wires config into the file system, lock, journal and behaviour services.

mod apply_retention;
mod deploy_package;
mod run_script;

pub use apply_retention::apply_retention;
pub use deploy_package::deploy_package;
pub use run_script::run_script;

use deckhand::behaviours::BehaviourServices;
use deckhand::config::Config;
use deckhand::error::Result;
use deckhand::extraction::GenericPackageExtractor;
use deckhand::fs::{FileSystem, PhysicalFileSystem};
use deckhand::journal::{DeploymentJournal, JournalWriter, SystemClock};
use deckhand::pipeline::{BehaviourRegistry, Pipeline};
use deckhand::scripts::ShellScriptEngine;
use deckhand::semaphore::{LockFileSemaphore, Semaphore};
use deckhand::variables::Variables;
use std::path::Path;
use std::sync::Arc;

/// Variables from `--variables`, or an empty set.
fn load_variables(path: Option<&Path>) -> Result<Variables> {
    match path {
        Some(path) => Ok(Variables::load_json_file(path)?),
        None => Ok(Variables::new()),
    }
}

/// Everything a command needs from the machine it runs on.
struct Host {
    fs: Arc<dyn FileSystem>,
    journal: Option<Arc<DeploymentJournal>>,
    services: BehaviourServices,
}

impl Host {
    fn new(config: &Config, variables: &Variables) -> Result<Self> {
        let fs: Arc<dyn FileSystem> = Arc::new(PhysicalFileSystem::new(config.file_retry.clone()));
        let semaphore: Arc<dyn Semaphore> = Arc::new(
            LockFileSemaphore::in_directory(fs.clone(), config.lock_directory())
                .with_abandon_after(config.lock_abandon_after),
        );

        let journal = match config.journal_path(variables)? {
            Some(path) => {
                tracing::debug!("Using deployment journal {}", path.display());
                let journal = DeploymentJournal::new(fs.clone(), semaphore, path)
                    .with_lock_timeout(config.lock_timeout);
                Some(Arc::new(journal))
            }
            None => {
                tracing::debug!("No deployment journal configured");
                None
            }
        };

        let services = BehaviourServices {
            fs: fs.clone(),
            scripts: Arc::new(ShellScriptEngine::new(config.shell.clone())),
            extractor: Arc::new(GenericPackageExtractor::default()),
            journal: journal.clone(),
            applications_root: config.applications_root(),
        };

        Ok(Self {
            fs,
            journal,
            services,
        })
    }

    fn pipeline(&self, registry: BehaviourRegistry) -> Pipeline {
        let writer = JournalWriter::new(
            self.fs.clone(),
            self.journal.clone(),
            Arc::new(SystemClock),
        );
        Pipeline::new(registry).with_journal_writer(Arc::new(writer))
    }
}
