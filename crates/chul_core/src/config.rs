//! Process configuration for the registry tools.
//!
//! Settings come from the environment (optionally seeded from `.env`). The
//! resulting struct is passed explicitly to whatever needs it; nothing reads
//! the environment after [`AppConfig::load`].

use crate::bootstrap::BootstrapConfig;
use crate::logging::{default_log_level, normalize_level};
use std::env;
use std::path::PathBuf;
use thiserror::Error;

pub const ENV_DATABASE_PATH: &str = "CHUL_DATABASE_PATH";
pub const ENV_BASE_DIR: &str = "CHUL_BASE_DIR";
pub const ENV_LOG_LEVEL: &str = "CHUL_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "CHUL_LOG_DIR";
pub const ENV_BOOTSTRAP_FILES: &str = "CHUL_BOOTSTRAP_FILES";

const DEFAULT_DATABASE_PATH: &str = "chul.db";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub logging: LoggingConfig,
    pub bootstrap: BootstrapConfig,
}

/// Logging controls. `log_dir = None` logs to stderr instead of rolling files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: &'static str,
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must not be empty")]
    EmptyValue { key: &'static str },
    #[error("{key}: {message}")]
    InvalidLogLevel { key: &'static str, message: String },
    #[error("{key} must be an absolute path, got `{}`", .path.display())]
    RelativeLogDir { key: &'static str, path: PathBuf },
    #[error("failed to resolve current directory: {0}")]
    CurrentDir(#[from] std::io::Error),
}

impl AppConfig {
    /// Loads `.env` when present, then reads the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_path = match lookup(ENV_DATABASE_PATH) {
            Some(value) => PathBuf::from(non_empty(ENV_DATABASE_PATH, value)?),
            None => PathBuf::from(DEFAULT_DATABASE_PATH),
        };

        let base_dir = match lookup(ENV_BASE_DIR) {
            Some(value) => PathBuf::from(non_empty(ENV_BASE_DIR, value)?),
            None => env::current_dir()?,
        };

        let level = match lookup(ENV_LOG_LEVEL) {
            Some(value) => normalize_level(&value).map_err(|message| {
                ConfigError::InvalidLogLevel {
                    key: ENV_LOG_LEVEL,
                    message,
                }
            })?,
            None => default_log_level(),
        };

        let log_dir = match lookup(ENV_LOG_DIR) {
            Some(value) if !value.trim().is_empty() => {
                let path = PathBuf::from(value.trim());
                if !path.is_absolute() {
                    return Err(ConfigError::RelativeLogDir {
                        key: ENV_LOG_DIR,
                        path,
                    });
                }
                Some(path)
            }
            _ => None,
        };

        let mut bootstrap = BootstrapConfig::new(base_dir);
        if let Some(value) = lookup(ENV_BOOTSTRAP_FILES) {
            let files = value
                .split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>();
            if files.is_empty() {
                return Err(ConfigError::EmptyValue {
                    key: ENV_BOOTSTRAP_FILES,
                });
            }
            bootstrap = bootstrap.with_files(files);
        }

        Ok(Self {
            database_path,
            logging: LoggingConfig { level, log_dir },
            bootstrap,
        })
    }
}

fn non_empty(key: &'static str, value: String) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyValue { key });
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::DEFAULT_BOOTSTRAP_FILES;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        move |key| values.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = AppConfig::from_lookup(lookup_from(&[(ENV_BASE_DIR, "/srv/mfl")])).unwrap();
        assert_eq!(config.database_path, PathBuf::from("chul.db"));
        assert_eq!(config.bootstrap.base_dir, PathBuf::from("/srv/mfl"));
        assert_eq!(config.bootstrap.files.len(), DEFAULT_BOOTSTRAP_FILES.len());
        assert_eq!(config.logging.level, default_log_level());
        assert!(config.logging.log_dir.is_none());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = AppConfig::from_lookup(lookup_from(&[
            (ENV_DATABASE_PATH, "/var/lib/chul.db"),
            (ENV_BASE_DIR, "/srv/mfl"),
            (ENV_LOG_LEVEL, "WARNING"),
            (ENV_BOOTSTRAP_FILES, "data/a.json, data/*.json ,"),
        ]))
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/var/lib/chul.db"));
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.bootstrap.files, vec!["data/a.json", "data/*.json"]);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[
            (ENV_BASE_DIR, "/srv/mfl"),
            (ENV_LOG_LEVEL, "loud"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLogLevel { .. }));

        let err = AppConfig::from_lookup(lookup_from(&[
            (ENV_BASE_DIR, "/srv/mfl"),
            (ENV_LOG_DIR, "logs"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::RelativeLogDir { .. }));

        let err = AppConfig::from_lookup(lookup_from(&[(ENV_DATABASE_PATH, " ")])).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyValue { key } if key == ENV_DATABASE_PATH));
    }
}
