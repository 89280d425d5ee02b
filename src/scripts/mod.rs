// ABOUTME: Script execution for deployment stages.
// ABOUTME: Runs shell scripts with deployment variables exported as DECKHAND_* variables.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::variables::Variables;

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("failed to start script {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("script {path} {}", describe_exit(.exit_code))]
    Failed {
        path: PathBuf,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("no script engine can run {0}")]
    Unsupported(PathBuf),
}

fn describe_exit(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exited with code {code}"),
        None => "was terminated by a signal".to_string(),
    }
}

/// Result of running a script.
#[derive(Debug)]
pub struct ScriptResult {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ScriptResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Turn a non-zero exit into an error.
    pub fn into_result(self, path: &Path) -> Result<Self, ScriptError> {
        if self.success() {
            Ok(self)
        } else {
            Err(ScriptError::Failed {
                path: path.to_path_buf(),
                exit_code: self.exit_code,
                stderr: self.stderr,
            })
        }
    }
}

#[async_trait]
pub trait ScriptEngine: Send + Sync {
    /// File extensions (without the dot) this engine runs.
    fn extensions(&self) -> &[&str];

    async fn execute(
        &self,
        script: &Path,
        working_directory: &Path,
        variables: &Variables,
    ) -> Result<ScriptResult, ScriptError>;
}

/// Runs `.sh` scripts through a POSIX shell.
#[derive(Debug, Clone)]
pub struct ShellScriptEngine {
    shell: PathBuf,
}

impl Default for ShellScriptEngine {
    fn default() -> Self {
        Self {
            shell: PathBuf::from("sh"),
        }
    }
}

impl ShellScriptEngine {
    pub fn new(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

#[async_trait]
impl ScriptEngine for ShellScriptEngine {
    fn extensions(&self) -> &[&str] {
        &["sh"]
    }

    async fn execute(
        &self,
        script: &Path,
        working_directory: &Path,
        variables: &Variables,
    ) -> Result<ScriptResult, ScriptError> {
        tracing::info!("Executing script {}", script.display());

        let output = Command::new(&self.shell)
            .arg(script)
            .current_dir(working_directory)
            .envs(script_environment(variables))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| ScriptError::Spawn {
                path: script.to_path_buf(),
                source,
            })?;

        let result = ScriptResult {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        for line in result.stdout.lines() {
            tracing::info!("{}", line);
        }
        for line in result.stderr.lines() {
            tracing::warn!("{}", line);
        }

        if result.success() {
            tracing::debug!("Script {} completed successfully", script.display());
        } else {
            tracing::warn!(
                "Script {} failed with exit code {:?}",
                script.display(),
                result.exit_code
            );
        }
        Ok(result)
    }
}

/// Variables as `DECKHAND_*` environment variables.
pub fn script_environment(variables: &Variables) -> HashMap<String, String> {
    variables
        .iter()
        .map(|(name, value)| (environment_name(name), value.to_string()))
        .collect()
}

/// `Deckhand.Action.Name` becomes `DECKHAND_ACTION_NAME`; `My.Var` becomes `DECKHAND_MY_VAR`.
pub fn environment_name(variable: &str) -> String {
    let trimmed = variable
        .get(..9)
        .filter(|head| head.eq_ignore_ascii_case("deckhand."))
        .map_or(variable, |_| &variable[9..]);
    let mut name = String::from("DECKHAND_");
    name.extend(trimmed.chars().map(|c| {
        if c.is_ascii_alphanumeric() {
            c.to_ascii_uppercase()
        } else {
            '_'
        }
    }));
    name
}
