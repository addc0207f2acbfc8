//! Deployment orchestrator

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::fs;
use tokio::sync::Mutex;
use tracing::info;

use crate::deploy::runner::CommandRunner;
use crate::errors::HookError;
use crate::journal::Journal;
use crate::settings::RepoConfig;

/// Outcome of one deployment attempt
#[derive(Debug, Clone)]
pub struct DeploymentResult {
    pub success: bool,
    pub message: String,
}

/// Runs deployments for registered repositories.
///
/// Deployments for the same repository key serialize on a per-key lock so two
/// overlapping triggers never run shell commands concurrently in the same
/// working directory. Different keys deploy concurrently.
pub struct Deployer {
    runner: Arc<dyn CommandRunner>,
    journal: Arc<Journal>,
    locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Deployer {
    pub fn new(runner: Arc<dyn CommandRunner>, journal: Arc<Journal>) -> Self {
        Self {
            runner,
            journal,
            locks: StdMutex::new(HashMap::new()),
        }
    }

    /// Deploy one repository. Never errors outward: every failure is absorbed
    /// into a `DeploymentResult` with a human-readable message.
    pub async fn deploy(&self, repo_key: &str, config: &RepoConfig) -> DeploymentResult {
        let lock = self.repo_lock(repo_key);
        let _guard = lock.lock().await;

        self.journal
            .record(&format!("Starting deployment for {}", repo_key))
            .await;

        match self.run(config).await {
            Ok(_) => {
                self.journal
                    .record(&format!("Deployment completed successfully for {}", repo_key))
                    .await;
                DeploymentResult {
                    success: true,
                    message: format!("Deployment completed for {}", repo_key),
                }
            }
            Err(e) => {
                let message = format!("Deployment failed for {}: {}", repo_key, e);
                self.journal.record(&message).await;
                DeploymentResult {
                    success: false,
                    message,
                }
            }
        }
    }

    async fn run(&self, config: &RepoConfig) -> Result<(), HookError> {
        let is_dir = fs::metadata(&config.path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(HookError::MissingDirectory(config.path.clone()));
        }

        info!("running deploy command in {}", config.path.display());
        self.runner.execute(&config.deploy_cmd, &config.path).await?;
        Ok(())
    }

    fn repo_lock(&self, repo_key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().expect("repo lock map poisoned");
        locks
            .entry(repo_key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
