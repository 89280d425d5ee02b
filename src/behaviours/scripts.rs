// ABOUTME: Stage scripts shipped inside the package or supplied through variables.
// ABOUTME: PreDeploy.sh, Deploy.sh, PostDeploy.sh and DeployFailed.sh by convention.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use crate::deployment::RunningDeployment;
use crate::fs::{FailureOptions, FileSystem};
use crate::pipeline::{Behaviour, BehaviourError, Stage};
use crate::scripts::ScriptEngine;
use crate::variables::known;

/// Runs `<Stage>.<ext>` from the current directory when the package ships one.
pub struct PackagedScriptBehaviour {
    stage: Stage,
    name: String,
    fs: Arc<dyn FileSystem>,
    engine: Arc<dyn ScriptEngine>,
}

impl PackagedScriptBehaviour {
    pub fn new(stage: Stage, fs: Arc<dyn FileSystem>, engine: Arc<dyn ScriptEngine>) -> Self {
        Self {
            stage,
            name: format!("PackagedScript({stage})"),
            fs,
            engine,
        }
    }

    fn script(&self, deployment: &RunningDeployment) -> Option<PathBuf> {
        let dir = deployment.current_directory();
        self.engine
            .extensions()
            .iter()
            .map(|ext| dir.join(format!("{}.{}", self.stage, ext)))
            .find(|path| self.fs.file_exists(path))
    }
}

#[async_trait]
impl Behaviour for PackagedScriptBehaviour {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self, deployment: &RunningDeployment) -> bool {
        self.script(deployment).is_some()
    }

    async fn execute(&self, deployment: &mut RunningDeployment) -> Result<(), BehaviourError> {
        let Some(script) = self.script(deployment) else {
            return Ok(());
        };
        let working_directory = deployment.current_directory();
        self.engine
            .execute(&script, &working_directory, deployment.variables())
            .await?
            .into_result(&script)?;
        Ok(())
    }
}

/// Runs a script body from `Deckhand.Action.CustomScripts.<Stage>.<ext>`.
pub struct ConfiguredScriptBehaviour {
    stage: Stage,
    name: String,
    fs: Arc<dyn FileSystem>,
    engine: Arc<dyn ScriptEngine>,
}

impl ConfiguredScriptBehaviour {
    pub fn new(stage: Stage, fs: Arc<dyn FileSystem>, engine: Arc<dyn ScriptEngine>) -> Self {
        Self {
            stage,
            name: format!("ConfiguredScript({stage})"),
            fs,
            engine,
        }
    }

    /// Extension and body of the first configured script for this stage.
    fn body(&self, deployment: &RunningDeployment) -> Option<(String, String)> {
        self.engine.extensions().iter().find_map(|ext| {
            let variable = format!("{}{}.{}", known::CUSTOM_SCRIPTS_PREFIX, self.stage, ext);
            deployment
                .variables()
                .get_non_empty(&variable)
                .map(|body| (ext.to_string(), body.to_string()))
        })
    }
}

#[async_trait]
impl Behaviour for ConfiguredScriptBehaviour {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self, deployment: &RunningDeployment) -> bool {
        self.body(deployment).is_some()
    }

    async fn execute(&self, deployment: &mut RunningDeployment) -> Result<(), BehaviourError> {
        let Some((ext, body)) = self.body(deployment) else {
            return Ok(());
        };
        let working_directory = deployment.current_directory();
        let script = working_directory.join(format!("{}.configured.{}", self.stage, ext));
        self.fs.create_directory(&working_directory)?;
        self.fs.write_all_text(&script, &body)?;

        let result = self
            .engine
            .execute(&script, &working_directory, deployment.variables())
            .await;
        self.fs.delete_file(&script, FailureOptions::IgnoreFailure)?;
        result?.into_result(&script)?;
        Ok(())
    }
}
