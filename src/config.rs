//! Runtime configuration: optional JSON file plus environment overrides

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming the JSON config file
pub const CONFIG_ENV: &str = "PADDOCK_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the raw CSV tables
    pub data_dir: PathBuf,
    /// Directory holding the model artifacts
    pub model_dir: PathBuf,
    pub host: String,
    pub port: u16,
    /// Year the active-entity window ends at; latest race year when unset
    pub reference_year: Option<i32>,
    pub active_window_years: i32,
    /// Feature season reused for championship predictions; latest when unset
    pub snapshot_season: Option<i32>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            model_dir: PathBuf::from("models"),
            host: "127.0.0.1".to_string(),
            port: 8080,
            reference_year: None,
            active_window_years: 5,
            snapshot_season: None,
        }
    }
}

impl AppConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// File named by `PADDOCK_CONFIG` (or defaults), then environment overrides
    pub fn from_env() -> Result<Self, ConfigError> {
        let lookup = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
        let mut config = match lookup(CONFIG_ENV) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(lookup)?;
        Ok(config)
    }

    /// Override fields from `HOST`, `PORT`, `DATA_DIR`, `MODEL_DIR`,
    /// `REFERENCE_YEAR` and `SNAPSHOT_SEASON`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.port = parse_value("PORT", port)?;
        }
        if let Some(dir) = lookup("DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("MODEL_DIR") {
            self.model_dir = PathBuf::from(dir);
        }
        if let Some(year) = lookup("REFERENCE_YEAR") {
            self.reference_year = Some(parse_value("REFERENCE_YEAR", year)?);
        }
        if let Some(season) = lookup("SNAPSHOT_SEASON") {
            self.snapshot_season = Some(parse_value("SNAPSHOT_SEASON", season)?);
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.active_window_years, 5);
        assert!(config.reference_year.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(lookup_from(&[
                ("PORT", "9000"),
                ("MODEL_DIR", "/tmp/models"),
                ("REFERENCE_YEAR", "2024"),
            ]))
            .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.model_dir, PathBuf::from("/tmp/models"));
        assert_eq!(config.reference_year, Some(2024));
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    fn test_invalid_override() {
        let mut config = AppConfig::default();
        let err = config
            .apply_overrides(lookup_from(&[("PORT", "eighty")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "PORT", .. }));
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paddock.json");
        fs::write(&path, r#"{"data_dir": "/srv/f1", "snapshot_season": 2023}"#).unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/f1"));
        assert_eq!(config.snapshot_season, Some(2023));
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paddock.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            AppConfig::from_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
