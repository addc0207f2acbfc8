//! Error types for hookd

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for hookd
#[derive(Error, Debug)]
pub enum HookError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Display text is user-visible inside DeploymentResult messages, so these
    // variants carry no category prefix.
    #[error("Directory {} does not exist", .0.display())]
    MissingDirectory(PathBuf),

    #[error("{0}")]
    ExecError(String),

    #[error("command timed out after {0:?}")]
    Timeout(Duration),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),
}
