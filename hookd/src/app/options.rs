//! Application configuration options

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::HookError;
use crate::settings::{RepoConfig, Settings};

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Server configuration
    pub server: ServerOptions,

    /// Deploy journal configuration
    pub journal: JournalOptions,

    /// Command runner configuration
    pub runner: RunnerOptions,

    /// Shared deployment secret
    pub secret: String,

    /// Registered repositories
    pub repos: BTreeMap<String, RepoConfig>,

    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl AppOptions {
    /// Build options from loaded settings. Fails when no deployment secret is
    /// configured; there is deliberately no built-in fallback.
    pub fn from_settings(settings: &Settings) -> Result<Self, HookError> {
        let secret = settings
            .secret
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                HookError::ConfigError(
                    "no deployment secret configured; set `secret` in the settings file or DEPLOY_SECRET"
                        .to_string(),
                )
            })?;

        Ok(Self {
            server: ServerOptions {
                host: settings.server.host.clone(),
                port: settings.server.port,
            },
            journal: JournalOptions {
                log_file: settings.journal.log_file.clone(),
                max_lines: settings.journal.max_lines,
            },
            runner: RunnerOptions {
                command_timeout: Duration::from_secs(settings.command_timeout_secs),
            },
            secret,
            repos: settings.repos.clone(),
            max_shutdown_delay: Duration::from_secs(30),
        })
    }
}

/// HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3005,
        }
    }
}

/// Deploy journal options
#[derive(Debug, Clone)]
pub struct JournalOptions {
    /// Journal file path
    pub log_file: PathBuf,

    /// Maximum retained lines
    pub max_lines: usize,
}

impl Default for JournalOptions {
    fn default() -> Self {
        Self {
            log_file: PathBuf::from("/var/log/hookd/deploy.log"),
            max_lines: 5000,
        }
    }
}

/// Command runner options
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Deploy command timeout; the child is force-killed past this
    pub command_timeout: Duration,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_secs(600),
        }
    }
}
