// ABOUTME: One journal record per deployment attempt that touched a package.
// ABOUTME: Serialized as camelCase JSON with ISO-8601 timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::deployment::RunningDeployment;
use crate::variables::known;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default)]
    pub retention_policy_set: String,
    #[serde(default)]
    pub package_id: Option<String>,
    #[serde(default)]
    pub package_version: Option<String>,
    #[serde(default)]
    pub extracted_from: Option<PathBuf>,
    #[serde(default)]
    pub extracted_to: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_installation_directory: Option<PathBuf>,
    pub installed_on: DateTime<Utc>,
    /// Entries written before this field existed were all successful.
    #[serde(default = "default_true")]
    pub was_successful: bool,
}

fn default_true() -> bool {
    true
}

impl JournalEntry {
    /// Describe `deployment` as it stands now.
    pub fn from_deployment(
        deployment: &RunningDeployment,
        was_successful: bool,
        installed_on: DateTime<Utc>,
    ) -> Self {
        let vars = deployment.variables();
        let owned = |name: &str| vars.get_non_empty(name).map(str::to_string);

        let (package_id, package_version) = match owned(known::PACKAGE_ID) {
            Some(id) => (Some(id), owned(known::PACKAGE_VERSION)),
            None => first_indexed_package(deployment),
        };

        Self {
            id: Uuid::new_v4().to_string(),
            environment_id: owned(known::ENVIRONMENT_ID),
            tenant_id: owned(known::TENANT_ID),
            project_id: owned(known::PROJECT_ID),
            retention_policy_set: vars.get_or(known::RETENTION_POLICY_SET, "").to_string(),
            package_id,
            package_version,
            extracted_from: deployment.package_file_path().map(PathBuf::from),
            extracted_to: vars
                .get_non_empty(known::ORIGINAL_PACKAGE_DIRECTORY_PATH)
                .map(PathBuf::from),
            custom_installation_directory: deployment.custom_installation_directory(),
            installed_on,
            was_successful,
        }
    }

    pub fn is_package(&self, package_id: &str) -> bool {
        self.package_id.as_deref() == Some(package_id)
    }
}

fn first_indexed_package(deployment: &RunningDeployment) -> (Option<String>, Option<String>) {
    let vars = deployment.variables();
    for index in vars.get_indexes(known::PACKAGE_COLLECTION) {
        let id = vars.get_non_empty(&format!("{}[{}].PackageId", known::PACKAGE_COLLECTION, index));
        if let Some(id) = id {
            let version = vars
                .get_non_empty(&format!(
                    "{}[{}].PackageVersion",
                    known::PACKAGE_COLLECTION,
                    index
                ))
                .map(str::to_string);
            return (Some(id.to_string()), version);
        }
    }
    (None, None)
}
