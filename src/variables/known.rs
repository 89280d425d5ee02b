// ABOUTME: Names of variables deckhand reads or writes.

pub const PACKAGE_ID: &str = "Deckhand.Action.Package.PackageId";
pub const PACKAGE_VERSION: &str = "Deckhand.Action.Package.PackageVersion";
pub const PACKAGE_FILE_PATH: &str = "Deckhand.Action.Package.FilePath";
/// Collection of indexed package references, `Deckhand.Action.Package[<name>].PackageId`.
pub const PACKAGE_COLLECTION: &str = "Deckhand.Action.Package";
pub const ORIGINAL_PACKAGE_DIRECTORY_PATH: &str = "Deckhand.Action.Package.OriginalDirectoryPath";
pub const CUSTOM_INSTALLATION_DIRECTORY: &str =
    "Deckhand.Action.Package.CustomInstallationDirectory";
pub const PURGE_CUSTOM_INSTALLATION_DIRECTORY: &str =
    "Deckhand.Action.Package.CustomInstallationDirectoryShouldBePurgedBeforeDeployment";
pub const SKIP_IF_ALREADY_INSTALLED: &str = "Deckhand.Package.SkipIfAlreadyInstalled";

pub const ENVIRONMENT_ID: &str = "Deckhand.Environment.Id";
pub const TENANT_ID: &str = "Deckhand.Deployment.Tenant.Id";
pub const PROJECT_ID: &str = "Deckhand.Project.Id";
pub const RETENTION_POLICY_SET: &str = "Deckhand.RetentionPolicySet";

pub const SKIP_REMAINING_CONVENTIONS: &str = "Deckhand.Action.SkipRemainingConventions";
pub const SKIP_JOURNAL: &str = "Deckhand.Action.SkipJournal";
pub const JOURNAL_PATH: &str = "Deckhand.Agent.JournalPath";
pub const APPLICATION_DIRECTORY_PATH: &str = "Deckhand.Agent.ApplicationDirectoryPath";

pub const LAST_ERROR: &str = "Deckhand.LastError";
pub const LAST_ERROR_MESSAGE: &str = "Deckhand.LastErrorMessage";

/// Prefix of configured script bodies, e.g. `Deckhand.Action.CustomScripts.PreDeploy.sh`.
pub const CUSTOM_SCRIPTS_PREFIX: &str = "Deckhand.Action.CustomScripts.";

pub mod previous_installation {
    pub const PACKAGE_VERSION: &str = "Deckhand.PreviousInstallation.PackageVersion";
    pub const PACKAGE_FILE_PATH: &str = "Deckhand.PreviousInstallation.PackageFilePath";
    pub const ORIGINAL_INSTALLED_PATH: &str = "Deckhand.PreviousInstallation.OriginalInstalledPath";
    pub const CUSTOM_INSTALLATION_DIRECTORY: &str =
        "Deckhand.PreviousInstallation.CustomInstallationDirectory";
}

pub mod previous_successful_installation {
    pub const PACKAGE_VERSION: &str = "Deckhand.PreviousSuccessfulInstallation.PackageVersion";
    pub const PACKAGE_FILE_PATH: &str = "Deckhand.PreviousSuccessfulInstallation.PackageFilePath";
    pub const ORIGINAL_INSTALLED_PATH: &str =
        "Deckhand.PreviousSuccessfulInstallation.OriginalInstalledPath";
    pub const CUSTOM_INSTALLATION_DIRECTORY: &str =
        "Deckhand.PreviousSuccessfulInstallation.CustomInstallationDirectory";
}
