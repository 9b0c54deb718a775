//! Configuration file support.
//!
//! Settings are read from an `omp.toml` file and passed explicitly to the
//! code that needs them.
//!
//! ```toml
//! [repository]
//! type = "local"
//!
//! [postgres]
//! database_url = "postgres://omp@localhost/omp"
//! max_connections = 10
//!
//! [telescopes.jcmt]
//! ut_start_hour = 3
//! ut_end_hour = 17
//! ec_queue = "EC"
//!
//! [staff]
//! salt = "omp"
//! password_digest = "..."
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::db::repo_config::{PostgresSettings, RepositorySettings};
use crate::db::repository::RepositoryError;
use crate::models::{Telescope, EC_QUEUE};

/// Per-telescope settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelescopeSettings {
    /// First UT hour of the nightly observing window
    #[serde(default = "default_ut_start")]
    pub ut_start_hour: u32,
    /// Last UT hour of the nightly observing window (inclusive)
    #[serde(default = "default_ut_end")]
    pub ut_end_hour: u32,
    /// Queue name of the Engineering & Calibration queue
    #[serde(default = "default_ec_queue")]
    pub ec_queue: String,
}

fn default_ut_start() -> u32 {
    4
}

fn default_ut_end() -> u32 {
    18
}

fn default_ec_queue() -> String {
    EC_QUEUE.to_string()
}

impl Default for TelescopeSettings {
    fn default() -> Self {
        Self {
            ut_start_hour: default_ut_start(),
            ut_end_hour: default_ut_end(),
            ec_queue: default_ec_queue(),
        }
    }
}

impl TelescopeSettings {
    /// Observing window clamped to valid hours, with start never after end.
    pub fn ut_window(&self) -> (u32, u32) {
        let start = self.ut_start_hour.min(23);
        let end = self.ut_end_hour.min(23).max(start);
        (start, end)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelescopesConfig {
    #[serde(default)]
    pub jcmt: TelescopeSettings,
    #[serde(default)]
    pub ukirt: TelescopeSettings,
}

/// Credentials for staff-only operations such as confirming a night.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffSettings {
    #[serde(default)]
    pub salt: String,
    /// Hex SHA-256 of salt + password. Without one, staff operations are refused.
    #[serde(default)]
    pub password_digest: Option<String>,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OmpConfig {
    #[serde(default)]
    pub repository: RepositorySettings,
    #[serde(default)]
    pub postgres: PostgresSettings,
    #[serde(default)]
    pub telescopes: TelescopesConfig,
    #[serde(default)]
    pub staff: StaffSettings,
}

impl OmpConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, RepositoryError> {
        toml::from_str(content).map_err(|e| {
            RepositoryError::configuration(format!("Failed to parse config file: {}", e))
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RepositoryError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            RepositoryError::configuration(format!("Failed to read config file: {}", e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Searches for `omp.toml` in:
    /// 1. Current directory
    /// 2. `rust_backend/` directory
    /// 3. Parent directory
    ///
    /// Returns `Ok(None)` when no file exists.
    pub fn from_default_location() -> Result<Option<Self>, RepositoryError> {
        let search_paths = [
            PathBuf::from("omp.toml"),
            PathBuf::from("rust_backend/omp.toml"),
            PathBuf::from("../omp.toml"),
        ];

        for path in search_paths {
            if path.exists() {
                return Self::from_file(&path).map(Some);
            }
        }
        Ok(None)
    }

    pub fn telescope(&self, telescope: Telescope) -> &TelescopeSettings {
        match telescope {
            Telescope::Jcmt => &self.telescopes.jcmt,
            Telescope::Ukirt => &self.telescopes.ukirt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = OmpConfig::from_toml_str("").unwrap();
        assert_eq!(config.repository.repo_type, "local");
        assert_eq!(config.telescope(Telescope::Jcmt).ut_window(), (4, 18));
        assert_eq!(config.telescope(Telescope::Ukirt).ec_queue, "EC");
        assert!(config.staff.password_digest.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[repository]
type = "postgres"

[postgres]
database_url = "postgres://omp@localhost/omp"
max_connections = 4

[telescopes.ukirt]
ut_start_hour = 5
ut_end_hour = 16
ec_queue = "ENG"

[staff]
salt = "abc"
password_digest = "00ff"
"#;
        let config = OmpConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.postgres.max_connections, 4);
        assert_eq!(config.telescope(Telescope::Ukirt).ut_window(), (5, 16));
        assert_eq!(config.telescope(Telescope::Ukirt).ec_queue, "ENG");
        assert_eq!(config.telescope(Telescope::Jcmt), &TelescopeSettings::default());
        assert_eq!(config.staff.password_digest.as_deref(), Some("00ff"));
    }

    #[test]
    fn test_window_is_clamped() {
        let settings = TelescopeSettings {
            ut_start_hour: 30,
            ut_end_hour: 2,
            ec_queue: "EC".to_string(),
        };
        assert_eq!(settings.ut_window(), (23, 23));
    }

    #[test]
    fn test_invalid_toml_is_configuration_error() {
        let err = OmpConfig::from_toml_str("[repository\n").unwrap_err();
        assert!(matches!(err, RepositoryError::ConfigurationError { .. }));
    }
}
