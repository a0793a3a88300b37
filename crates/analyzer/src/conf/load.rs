//! Load: config loading from file and environment variables.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use super::model::AnalyzerConfig;
use crate::parser::model::{ParserKind, ParserRole};

pub const CONFIG_FILE_ENV: &str = "MAALOGS_CONFIG_FILE";
pub const DEFAULT_CONFIG_FILE: &str = "maalogs.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl AnalyzerConfig {
    /// Load from an explicit path, which must exist, or from
    /// `MAALOGS_CONFIG_FILE` / `maalogs.toml` when present.
    /// Priority: Environment Variables > Config File > Defaults
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                info!("Loading configuration from: {}", path.display());
                Self::from_file(path)?
            }
            None => {
                let default_path = std::env::var(CONFIG_FILE_ENV)
                    .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
                let default_path = Path::new(&default_path);
                if default_path.exists() {
                    info!("Loading configuration from: {}", default_path.display());
                    Self::from_file(default_path)?
                } else {
                    info!("Config file not found at {}, using defaults", default_path.display());
                    Self::default()
                }
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply `MAALOGS_*` overrides read through `lookup`.
    /// Unparseable values are reported and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup("MAALOGS_TIME_WINDOW_MS") {
            match raw.trim().parse::<u64>() {
                Ok(window) => self.correlation.time_window_ms = window,
                Err(_) => warn!("Ignoring MAALOGS_TIME_WINDOW_MS={:?}: not a non-negative integer", raw),
            }
        }
        if let Some(raw) = lookup("MAALOGS_METRICS_ENABLED") {
            self.metrics.enabled = parse_flag(&raw);
        }
        if let Some(raw) = lookup("MAALOGS_PROJECT") {
            match raw.parse::<ParserKind>() {
                Ok(kind) => self.parsers.preferred_project = Some(kind),
                Err(e) => warn!("Ignoring MAALOGS_PROJECT: {}", e),
            }
        }
    }

    /// Validate that configuration values are coherent
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(kind) = self.parsers.preferred_project {
            if kind.role() != ParserRole::Project {
                return Err(ConfigError::Invalid(format!(
                    "parsers.preferred_project must be a project parser, got {}",
                    kind.as_str()
                )));
            }
            if self.parsers.disabled.contains(&kind) {
                return Err(ConfigError::Invalid(format!(
                    "parsers.preferred_project {} is also disabled",
                    kind.as_str()
                )));
            }
        }
        Ok(())
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_overrides_applied() {
        let mut config = AnalyzerConfig::default();
        config.apply_overrides(lookup(&[
            ("MAALOGS_TIME_WINDOW_MS", "1200"),
            ("MAALOGS_METRICS_ENABLED", "no"),
            ("MAALOGS_PROJECT", "loguru"),
        ]));

        assert_eq!(config.correlation.time_window_ms, 1200);
        assert!(!config.metrics.enabled);
        assert_eq!(config.parsers.preferred_project, Some(ParserKind::LoguruProject));
    }

    #[test]
    fn test_invalid_overrides_ignored() {
        let mut config = AnalyzerConfig::default();
        config.apply_overrides(lookup(&[
            ("MAALOGS_TIME_WINDOW_MS", "-5"),
            ("MAALOGS_PROJECT", "syslog"),
        ]));

        assert_eq!(config.correlation.time_window_ms, 5000);
        assert_eq!(config.parsers.preferred_project, None);
    }

    #[test]
    fn test_flag_values() {
        assert!(parse_flag("1"));
        assert!(parse_flag("TRUE"));
        assert!(parse_flag(" yes "));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("off"));
    }

    #[test]
    fn test_validate_rejects_aux_preferred_project() {
        let mut config = AnalyzerConfig::default();
        config.parsers.preferred_project = Some(ParserKind::LoguruAux);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_disabled_preferred_project() {
        let mut config = AnalyzerConfig::default();
        config.parsers.preferred_project = Some(ParserKind::MaaEndProject);
        config.parsers.disabled = vec![ParserKind::MaaEndProject];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_errors() {
        let missing = Path::new("/nonexistent/maalogs.toml");
        assert!(matches!(AnalyzerConfig::from_file(missing), Err(ConfigError::Io { .. })));

        let dir = std::env::temp_dir().join(format!("maalogs-conf-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let bad = dir.join("bad.toml");
        std::fs::write(&bad, "[correlation]\ntime_window_ms = \"soon\"").unwrap();
        assert!(matches!(AnalyzerConfig::from_file(&bad), Err(ConfigError::Toml { .. })));

        let good = dir.join("good.toml");
        std::fs::write(&good, "[correlation]\ntime_window_ms = 10").unwrap();
        assert_eq!(AnalyzerConfig::from_file(&good).unwrap().correlation.time_window_ms, 10);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
