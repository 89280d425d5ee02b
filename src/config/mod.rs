// ABOUTME: Machine configuration for deckhand, read from deckhand.yml.
// ABOUTME: Locates the journal, lock directory, extraction root and retry budget.

mod deserialize;
mod env_value;

pub use env_value::EnvValue;

use crate::error::{Error, Result};
use crate::retry::RetrySettings;
use crate::variables::{Variables, known};
use deserialize::deserialize_optional_path;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "deckhand.yml";
pub const CONFIG_FILENAME_ALT: &str = "deckhand.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".deckhand/config.yml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    /// Journal file; journaling is disabled when absent.
    #[serde(default)]
    pub journal: Option<EnvValue>,

    #[serde(default, deserialize_with = "deserialize_optional_path")]
    pub lock_directory: Option<PathBuf>,

    #[serde(default = "default_lock_timeout", with = "humantime_serde")]
    pub lock_timeout: Duration,

    #[serde(default = "default_lock_abandon_after", with = "humantime_serde")]
    pub lock_abandon_after: Duration,

    #[serde(default, deserialize_with = "deserialize_optional_path")]
    pub package_cache: Option<PathBuf>,

    #[serde(default, deserialize_with = "deserialize_optional_path")]
    pub applications_directory: Option<PathBuf>,

    #[serde(default = "default_shell")]
    pub shell: PathBuf,

    #[serde(default)]
    pub file_retry: RetrySettings,

    #[serde(default)]
    pub retention: RetentionDefaults,
}

/// Retention applied when a command does not name its own window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RetentionDefaults {
    #[serde(default)]
    pub days: Option<u32>,
    #[serde(default)]
    pub releases: Option<u32>,
}

fn default_lock_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_lock_abandon_after() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_shell() -> PathBuf {
    PathBuf::from("sh")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            journal: None,
            lock_directory: None,
            lock_timeout: default_lock_timeout(),
            lock_abandon_after: default_lock_abandon_after(),
            package_cache: None,
            applications_directory: None,
            shell: default_shell(),
            file_retry: RetrySettings::default(),
            retention: RetentionDefaults::default(),
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document means "all defaults".
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Find the first config file in `dir`, checking each known name in order.
    pub fn discover(dir: &Path) -> Result<Self> {
        for name in [CONFIG_FILENAME, CONFIG_FILENAME_ALT, CONFIG_FILENAME_DIR] {
            let path = dir.join(name);
            if path.exists() {
                tracing::debug!("Using configuration {}", path.display());
                return Self::load(&path);
            }
        }
        Err(Error::ConfigNotFound(dir.join(CONFIG_FILENAME)))
    }

    /// Like [`Config::discover`], but a directory without a config yields defaults.
    pub fn discover_or_default(dir: &Path) -> Result<Self> {
        match Self::discover(dir) {
            Err(Error::ConfigNotFound(_)) => {
                tracing::debug!("No configuration in {}, using defaults", dir.display());
                Ok(Self::default())
            }
            other => other,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.lock_timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "lock_timeout must be greater than zero".to_string(),
            ));
        }
        if self.lock_abandon_after.is_zero() {
            return Err(Error::InvalidConfig(
                "lock_abandon_after must be greater than zero".to_string(),
            ));
        }
        if self.shell.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("shell cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Journal location for a deployment. A non-empty journal path variable
    /// wins over the configured value. Always absolute, since the journal's
    /// lock is named after it.
    pub fn journal_path(&self, variables: &Variables) -> Result<Option<PathBuf>> {
        let path = match (variables.get_non_empty(known::JOURNAL_PATH), &self.journal) {
            (Some(path), _) => PathBuf::from(path),
            (None, Some(value)) => value.resolve_path()?,
            (None, None) => return Ok(None),
        };
        Ok(Some(std::path::absolute(path)?))
    }

    pub fn lock_directory(&self) -> PathBuf {
        self.lock_directory
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("deckhand").join("locks"))
    }

    /// Default extraction root; a deployment variable may still override it.
    pub fn applications_root(&self) -> PathBuf {
        self.applications_directory
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("deckhand").join("Applications"))
    }
}
