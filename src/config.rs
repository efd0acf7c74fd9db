//! Configuration loading and management.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Project-level config file, relative to the working directory.
const PROJECT_CONFIG: &str = "chantier/config.yaml";

/// User-level config directory under the home directory.
const USER_CONFIG_DIR: &str = ".chantier";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub stats: StatsConfig,
}

/// HTTP server and storage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origin. `None` allows any origin.
    #[serde(default)]
    pub cors_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            host: default_host(),
            port: default_port(),
            cors_origin: None,
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("chantier/chantier.db")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Log filter and destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `0` (off), `1` (stdout), `2` (stderr) or a file path.
    #[serde(default = "default_log_output")]
    pub output: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            output: default_log_output(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_output() -> String {
    "2".to_string()
}

/// Stats propagation settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Also recompute the affected teams on every task mutation.
    #[serde(default)]
    pub cascade_team: bool,
}

impl Config {
    /// Load configuration from file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Resolve the configuration for a run.
    ///
    /// An explicit path must load. Otherwise the project file, then the user
    /// file, then built-in defaults are tried in turn. Environment overrides
    /// are applied last.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => Self::load_or_default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from default locations or return defaults.
    pub fn load_or_default() -> Self {
        let mut candidates = vec![PathBuf::from(PROJECT_CONFIG)];
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join(USER_CONFIG_DIR).join("config.yaml"));
        }

        for path in candidates {
            if !path.exists() {
                continue;
            }
            match Self::load(&path) {
                Ok(config) => return config,
                Err(e) => warn!("Ignoring config {}: {:#}", path.display(), e),
            }
        }

        Self::default()
    }

    /// Apply `CHANTIER_*` overrides read through `var`.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn apply_env_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db_path) = var("CHANTIER_DB_PATH") {
            self.server.db_path = PathBuf::from(db_path);
        }

        if let Some(host) = var("CHANTIER_HOST") {
            self.server.host = host;
        }

        if let Some(port) = var("CHANTIER_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!("Ignoring invalid CHANTIER_PORT: {}", port),
            }
        }

        if let Some(cascade) = var("CHANTIER_CASCADE_TEAM") {
            match parse_bool(&cascade) {
                Some(cascade) => self.stats.cascade_team = cascade,
                None => warn!("Ignoring invalid CHANTIER_CASCADE_TEAM: {}", cascade),
            }
        }
    }

    /// Ensure the database directory exists.
    pub fn ensure_db_dir(&self) -> Result<()> {
        if let Some(parent) = self.server.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "server:\n  port: 9000\nstats:\n  cascade_team: true\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.db_path, PathBuf::from("chantier/chantier.db"));
        assert_eq!(config.logging, LoggingConfig::default());
        assert!(config.stats.cascade_team);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::resolve(Some(&dir.path().join("absent.yaml"))).is_err());
    }

    #[test]
    fn env_overrides_win_and_bad_values_are_ignored() {
        let vars: HashMap<&str, &str> = [
            ("CHANTIER_DB_PATH", "/tmp/site.db"),
            ("CHANTIER_PORT", "not-a-port"),
            ("CHANTIER_HOST", "0.0.0.0"),
            ("CHANTIER_CASCADE_TEAM", "yes"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.db_path, PathBuf::from("/tmp/site.db"));
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert!(config.stats.cascade_team);
    }

    #[test]
    fn ensure_db_dir_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.server.db_path = dir.path().join("nested/data/site.db");

        config.ensure_db_dir().unwrap();
        assert!(dir.path().join("nested/data").is_dir());
    }
}
