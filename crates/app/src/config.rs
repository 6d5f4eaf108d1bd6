//! Application configuration
//!
//! Loaded once at startup from `SEATPLAN_CONFIG` or the platform config
//! directory. A missing file means defaults everywhere.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use seatplan_core::{BoardConfig, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "SEATPLAN_CONFIG";

const CONFIG_FILE: &str = "seatplan.toml";
const DATABASE_FILE: &str = "seatplan.db";

/// Where to find a store server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// `host:port`; without it the board runs against an in-process store
    pub addr: Option<String>,
}

/// Store server settings for `seatplan serve`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub database: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: seatplan_net::DEFAULT_PORT,
            database: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub board: BoardConfig,
    pub remote: RemoteConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    /// Load from the configured location
    pub fn load() -> Result<Self> {
        let path = match std::env::var_os(CONFIG_ENV) {
            Some(path) => PathBuf::from(path),
            None => project_dirs()?.config_dir().join(CONFIG_FILE),
        };
        Self::load_from(&path)
    }

    /// Load from a file, defaults if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Store server database, in the platform data dir unless configured
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.server.database {
            Some(path) => Ok(path.clone()),
            None => Ok(project_dirs()?.data_dir().join(DATABASE_FILE)),
        }
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "onyx", "seatplan").ok_or_else(|| {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine config directory",
        ))
    })
}
