//! Settings file management

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::errors::HookError;
use crate::logs::LogLevel;

/// One registered repository. Immutable after load; keyed by the identifier
/// the triggering request supplies (webhook `repository.name` or the manual
/// `repo` parameter).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoConfig {
    /// Working directory the deploy command runs in
    pub path: PathBuf,

    /// Branch whose pushes trigger a deployment
    pub branch: String,

    /// Opaque shell pipeline (pull, install, build, restart)
    pub deploy_cmd: String,
}

/// Agent settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerSettings,

    /// Deploy journal configuration
    #[serde(default)]
    pub journal: JournalSettings,

    /// Shared deployment secret. May also arrive via DEPLOY_SECRET; startup
    /// fails when neither is set.
    #[serde(default)]
    pub secret: Option<String>,

    /// Deploy command timeout in seconds
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,

    /// Registered repositories, keyed by identifier
    #[serde(default)]
    pub repos: BTreeMap<String, RepoConfig>,
}

fn default_command_timeout_secs() -> u64 {
    600
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            server: ServerSettings::default(),
            journal: JournalSettings::default(),
            secret: None,
            command_timeout_secs: default_command_timeout_secs(),
            repos: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Read settings from a JSON file
    pub async fn load(path: &Path) -> Result<Self, HookError> {
        let contents = fs::read_to_string(path).await.map_err(|e| {
            HookError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let settings = serde_json::from_str(&contents).map_err(|e| {
            HookError::ConfigError(format!("cannot parse {}: {}", path.display(), e))
        })?;
        Ok(settings)
    }

    /// Apply environment overrides (PORT, DEPLOY_SECRET)
    pub fn apply_env(&mut self) -> Result<(), HookError> {
        if let Ok(port) = std::env::var("PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| HookError::ConfigError(format!("invalid PORT value: {}", port)))?;
        }
        if let Ok(secret) = std::env::var("DEPLOY_SECRET") {
            self.secret = Some(secret);
        }
        Ok(())
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3005
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Deploy journal settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalSettings {
    /// Journal file path
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    /// Maximum retained lines; oldest are dropped past this
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,
}

fn default_log_file() -> PathBuf {
    PathBuf::from("/var/log/hookd/deploy.log")
}

fn default_max_lines() -> usize {
    5000
}

impl Default for JournalSettings {
    fn default() -> Self {
        Self {
            log_file: default_log_file(),
            max_lines: default_max_lines(),
        }
    }
}
