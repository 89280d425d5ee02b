// ABOUTME: Custom serde deserializers for config paths.
// ABOUTME: Expands a leading ~ to the home directory and rejects empty paths.

use serde::Deserialize;
use std::path::PathBuf;

pub fn deserialize_optional_path<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt {
        None => Ok(None),
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Err(serde::de::Error::custom("path cannot be empty"));
            }
            Ok(Some(expand_home(trimmed)))
        }
    }
}

pub(super) fn expand_home(raw: &str) -> PathBuf {
    let Some(home) = std::env::var_os("HOME") else {
        return PathBuf::from(raw);
    };
    if raw == "~" {
        return PathBuf::from(home);
    }
    match raw.strip_prefix("~/") {
        Some(rest) => PathBuf::from(home).join(rest),
        None => PathBuf::from(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_paths_are_untouched() {
        assert_eq!(expand_home("/srv/apps"), PathBuf::from("/srv/apps"));
        assert_eq!(expand_home("relative/dir"), PathBuf::from("relative/dir"));
    }

    #[test]
    fn tilde_expands_to_home() {
        temp_env::with_var("HOME", Some("/home/deploy"), || {
            assert_eq!(expand_home("~/locks"), PathBuf::from("/home/deploy/locks"));
            assert_eq!(expand_home("~"), PathBuf::from("/home/deploy"));
        });
    }
}
