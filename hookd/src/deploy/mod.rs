//! Deployment execution

pub mod orchestrator;
pub mod runner;

pub use orchestrator::{Deployer, DeploymentResult};
pub use runner::{CommandRunner, ShellRunner};
