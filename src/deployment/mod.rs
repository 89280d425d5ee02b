// ABOUTME: The unit of work for one deployment step: package, directories, variables.
// ABOUTME: Captures the failing error and holds compensating actions for rollback.

use std::path::{Path, PathBuf};

use crate::diagnostics::{Diagnostics, Warning};
use crate::pipeline::BehaviourError;
use crate::variables::{Variables, known};

/// Which directory behaviours should treat as the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkingDirectory {
    #[default]
    StagingDirectory,
    CustomInstallationDirectory,
}

/// The error that ended a deployment, kept for rollback behaviours and output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedError {
    pub message: String,
    /// The message plus every `source()` in the chain.
    pub detail: String,
}

impl CapturedError {
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let message = err.to_string();
        let mut detail = message.clone();
        let mut source = err.source();
        while let Some(cause) = source {
            detail.push_str("\n  caused by: ");
            detail.push_str(&cause.to_string());
            source = cause.source();
        }
        Self { message, detail }
    }
}

type CompensatingAction = Box<dyn FnOnce() -> Result<(), BehaviourError> + Send>;

pub struct RunningDeployment {
    package_file_path: Option<PathBuf>,
    variables: Variables,
    staging_directory: PathBuf,
    working_directory: WorkingDirectory,
    error: Option<CapturedError>,
    skip_journal: bool,
    compensating_actions: Vec<(String, CompensatingAction)>,
    diagnostics: Diagnostics,
}

impl std::fmt::Debug for RunningDeployment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunningDeployment")
            .field("package_file_path", &self.package_file_path)
            .field("staging_directory", &self.staging_directory)
            .field("working_directory", &self.working_directory)
            .field("error", &self.error)
            .field("skip_journal", &self.skip_journal)
            .field("compensating_actions", &self.compensating_actions.len())
            .field("diagnostics", &self.diagnostics)
            .finish()
    }
}

impl RunningDeployment {
    /// Staging directory defaults to the recorded original package directory, else `.`.
    pub fn new(package_file_path: Option<PathBuf>, variables: Variables) -> Self {
        let staging_directory = variables
            .get_non_empty(known::ORIGINAL_PACKAGE_DIRECTORY_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let skip_journal = variables.get_flag(known::SKIP_JOURNAL, false);
        Self {
            package_file_path,
            variables,
            staging_directory,
            working_directory: WorkingDirectory::default(),
            error: None,
            skip_journal,
            compensating_actions: Vec::new(),
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn package_file_path(&self) -> Option<&Path> {
        self.package_file_path.as_deref()
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    pub fn variables_mut(&mut self) -> &mut Variables {
        &mut self.variables
    }

    pub fn staging_directory(&self) -> &Path {
        &self.staging_directory
    }

    /// Also recorded as the original package directory for later steps.
    pub fn set_staging_directory(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        self.variables.set(
            known::ORIGINAL_PACKAGE_DIRECTORY_PATH,
            path.to_string_lossy().into_owned(),
        );
        self.staging_directory = path;
    }

    pub fn custom_installation_directory(&self) -> Option<PathBuf> {
        self.variables
            .get_non_empty(known::CUSTOM_INSTALLATION_DIRECTORY)
            .map(PathBuf::from)
    }

    pub fn working_directory(&self) -> WorkingDirectory {
        self.working_directory
    }

    pub fn set_working_directory(&mut self, kind: WorkingDirectory) {
        self.working_directory = kind;
    }

    /// The directory selected by [`working_directory`](Self::working_directory).
    /// Falls back to staging when no custom directory is configured.
    pub fn current_directory(&self) -> PathBuf {
        match self.working_directory {
            WorkingDirectory::StagingDirectory => self.staging_directory.clone(),
            WorkingDirectory::CustomInstallationDirectory => self
                .custom_installation_directory()
                .unwrap_or_else(|| self.staging_directory.clone()),
        }
    }

    /// Record the failure and publish it to the variables for later consumers.
    pub fn error(&mut self, err: &(dyn std::error::Error + 'static)) {
        let captured = CapturedError::from_error(err);
        self.variables
            .set(known::LAST_ERROR_MESSAGE, captured.message.clone());
        self.variables.set(known::LAST_ERROR, captured.detail.clone());
        self.error = Some(captured);
    }

    pub fn captured_error(&self) -> Option<&CapturedError> {
        self.error.as_ref()
    }

    pub fn skip_journal(&self) -> bool {
        self.skip_journal
    }

    pub fn set_skip_journal(&mut self, skip: bool) {
        self.skip_journal = skip;
    }

    /// Register an action that undoes an irreversible side effect if the run fails later.
    pub fn register_compensating_action(
        &mut self,
        description: impl Into<String>,
        action: impl FnOnce() -> Result<(), BehaviourError> + Send + 'static,
    ) {
        self.compensating_actions
            .push((description.into(), Box::new(action)));
    }

    /// Run registered compensating actions, most recent first. Failures are logged.
    pub fn run_compensating_actions(&mut self) {
        while let Some((description, action)) = self.compensating_actions.pop() {
            tracing::info!("Rolling back: {}", description);
            if let Err(e) = action() {
                self.diagnostics.warn(Warning::rollback_failed(format!(
                    "Rollback '{description}' failed: {e}"
                )));
            }
        }
    }

    pub fn has_compensating_actions(&self) -> bool {
        !self.compensating_actions.is_empty()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }
}
