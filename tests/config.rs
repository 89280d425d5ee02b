// ABOUTME: Integration tests for machine configuration parsing and discovery.
// ABOUTME: Tests YAML parsing, defaults, env var indirection and file discovery.

use deckhand::config::*;
use deckhand::error::Error;
use deckhand::retry::{IntervalSettings, RetrySettings};
use deckhand::variables::{Variables, known};
use std::path::PathBuf;
use std::time::Duration;

mod parsing {
    use super::*;

    #[test]
    fn parse_full_config() {
        let yaml = r#"
journal: /var/lib/deckhand/DeploymentJournal.json
lock_directory: /var/lib/deckhand/locks
lock_timeout: 2m
lock_abandon_after: 10m
package_cache: /var/cache/deckhand/packages
applications_directory: /srv/applications
shell: /bin/bash

file_retry:
  max_retries: 20
  time_limit: 30s
  interval:
    kind: linear
    base: 50ms

retention:
  releases: 3
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(
            config.journal,
            Some(EnvValue::Literal(
                "/var/lib/deckhand/DeploymentJournal.json".to_string()
            ))
        );
        assert_eq!(config.lock_directory(), PathBuf::from("/var/lib/deckhand/locks"));
        assert_eq!(config.lock_timeout, Duration::from_secs(120));
        assert_eq!(config.lock_abandon_after, Duration::from_secs(600));
        assert_eq!(
            config.package_cache,
            Some(PathBuf::from("/var/cache/deckhand/packages"))
        );
        assert_eq!(config.applications_root(), PathBuf::from("/srv/applications"));
        assert_eq!(config.shell, PathBuf::from("/bin/bash"));
        assert_eq!(config.file_retry.max_retries, Some(20));
        assert_eq!(
            config.file_retry.interval,
            IntervalSettings::Linear {
                base: Duration::from_millis(50)
            }
        );
        assert_eq!(config.retention.releases, Some(3));
        assert_eq!(config.retention.days, None);
    }

    #[test]
    fn defaults_apply_to_missing_fields() {
        let config = Config::from_yaml("shell: sh\n").unwrap();
        assert_eq!(config.journal, None);
        assert_eq!(config.lock_timeout, Duration::from_secs(60));
        assert_eq!(config.lock_abandon_after, Duration::from_secs(300));
        assert_eq!(config.file_retry, RetrySettings::file_operations());
        assert_eq!(
            config.lock_directory(),
            std::env::temp_dir().join("deckhand").join("locks")
        );
        assert_eq!(
            config.applications_root(),
            std::env::temp_dir().join("deckhand").join("Applications")
        );
    }

    #[test]
    fn invalid_duration_is_an_error() {
        let result = Config::from_yaml("lock_timeout: soon\n");
        assert!(matches!(result, Err(Error::Yaml(_))));
    }

    #[test]
    fn empty_path_is_rejected() {
        let result = Config::from_yaml("package_cache: \"  \"\n");
        assert!(result.is_err());
    }

    #[test]
    fn zero_abandon_threshold_is_invalid() {
        let result = Config::from_yaml("lock_abandon_after: 0s\n");
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }
}

mod journal_location {
    use super::*;

    #[test]
    fn journal_from_environment_variable() {
        let config = Config::from_yaml(
            r#"
journal:
  env: DECKHAND_TEST_JOURNAL
  default: /var/lib/deckhand/journal.json
"#,
        )
        .unwrap();

        temp_env::with_var("DECKHAND_TEST_JOURNAL", Some("/data/journal.json"), || {
            assert_eq!(
                config.journal_path(&Variables::new()).unwrap(),
                Some(PathBuf::from("/data/journal.json"))
            );
        });
        temp_env::with_var_unset("DECKHAND_TEST_JOURNAL", || {
            assert_eq!(
                config.journal_path(&Variables::new()).unwrap(),
                Some(PathBuf::from("/var/lib/deckhand/journal.json"))
            );
        });
    }

    #[test]
    fn missing_journal_env_without_default_fails() {
        let config = Config::from_yaml("journal:\n  env: DECKHAND_TEST_NO_JOURNAL\n").unwrap();
        temp_env::with_var_unset("DECKHAND_TEST_NO_JOURNAL", || {
            let err = config.journal_path(&Variables::new()).unwrap_err();
            assert!(
                matches!(err, Error::MissingEnvVar(ref name) if name == "DECKHAND_TEST_NO_JOURNAL")
            );
        });
    }

    #[test]
    fn deployment_variable_wins() {
        let config = Config::from_yaml("journal: /configured.json\n").unwrap();
        let mut vars = Variables::new();
        vars.set(known::JOURNAL_PATH, "/from-variable.json");
        assert_eq!(
            config.journal_path(&vars).unwrap(),
            Some(PathBuf::from("/from-variable.json"))
        );
    }

    #[test]
    fn home_relative_paths_expand() {
        temp_env::with_var("HOME", Some("/home/agent"), || {
            let config = Config::from_yaml("lock_directory: ~/locks\n").unwrap();
            assert_eq!(config.lock_directory(), PathBuf::from("/home/agent/locks"));
        });
    }
}

mod discovery {
    use super::*;
    use std::fs;

    #[test]
    fn discovers_primary_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), "lock_timeout: 5s\n").unwrap();

        let config = Config::discover(dir.path()).unwrap();
        assert_eq!(config.lock_timeout, Duration::from_secs(5));
    }

    #[test]
    fn discovers_alternate_and_directory_files() {
        let alt = tempfile::tempdir().unwrap();
        fs::write(alt.path().join(CONFIG_FILENAME_ALT), "lock_timeout: 6s\n").unwrap();
        assert_eq!(
            Config::discover(alt.path()).unwrap().lock_timeout,
            Duration::from_secs(6)
        );

        let nested = tempfile::tempdir().unwrap();
        fs::create_dir_all(nested.path().join(".deckhand")).unwrap();
        fs::write(nested.path().join(CONFIG_FILENAME_DIR), "lock_timeout: 7s\n").unwrap();
        assert_eq!(
            Config::discover(nested.path()).unwrap().lock_timeout,
            Duration::from_secs(7)
        );
    }

    #[test]
    fn primary_file_wins_over_alternate() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), "lock_timeout: 1s\n").unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME_ALT), "lock_timeout: 2s\n").unwrap();
        assert_eq!(
            Config::discover(dir.path()).unwrap().lock_timeout,
            Duration::from_secs(1)
        );
    }

    #[test]
    fn missing_config_is_reported_or_defaulted() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Config::discover(dir.path()),
            Err(Error::ConfigNotFound(_))
        ));
        assert_eq!(
            Config::discover_or_default(dir.path()).unwrap(),
            Config::default()
        );
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load(&dir.path().join("elsewhere.yml"));
        assert!(matches!(result, Err(Error::ConfigNotFound(_))));
    }
}
