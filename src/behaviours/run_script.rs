// ABOUTME: Runs one explicitly named script, resolved against the current directory.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use crate::deployment::RunningDeployment;
use crate::pipeline::{Behaviour, BehaviourError};
use crate::scripts::{ScriptEngine, ScriptError};

pub struct RunScriptBehaviour {
    script: PathBuf,
    engine: Arc<dyn ScriptEngine>,
}

impl RunScriptBehaviour {
    pub fn new(script: PathBuf, engine: Arc<dyn ScriptEngine>) -> Self {
        Self { script, engine }
    }

    fn resolve(&self, deployment: &RunningDeployment) -> PathBuf {
        if self.script.is_absolute() {
            self.script.clone()
        } else {
            let in_package = deployment.current_directory().join(&self.script);
            if deployment.package_file_path().is_some() && in_package.is_file() {
                in_package
            } else {
                self.script.clone()
            }
        }
    }
}

#[async_trait]
impl Behaviour for RunScriptBehaviour {
    fn name(&self) -> &str {
        "RunScript"
    }

    fn is_enabled(&self, _deployment: &RunningDeployment) -> bool {
        true
    }

    async fn execute(&self, deployment: &mut RunningDeployment) -> Result<(), BehaviourError> {
        let script = self.resolve(deployment);
        let supported = script
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.engine.extensions().contains(&ext));
        if !supported {
            return Err(ScriptError::Unsupported(script).into());
        }
        if !script.is_file() {
            return Err(BehaviourError::failed(format!(
                "Could not find script file: {}",
                script.display()
            )));
        }

        let working_directory = deployment.current_directory();
        self.engine
            .execute(&script, &working_directory, deployment.variables())
            .await?
            .into_result(&script)?;
        Ok(())
    }
}
