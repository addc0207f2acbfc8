//! Server state

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::deploy::Deployer;
use crate::journal::Journal;
use crate::settings::RepoConfig;

/// Server state shared across handlers
pub struct ServerState {
    pub repos: BTreeMap<String, RepoConfig>,
    pub secret: String,
    pub journal: Arc<Journal>,
    pub deployer: Arc<Deployer>,
}

impl ServerState {
    pub fn new(
        repos: BTreeMap<String, RepoConfig>,
        secret: String,
        journal: Arc<Journal>,
        deployer: Arc<Deployer>,
    ) -> Self {
        Self {
            repos,
            secret,
            journal,
            deployer,
        }
    }

    /// Registered repository keys, in map order
    pub fn repo_keys(&self) -> Vec<String> {
        self.repos.keys().cloned().collect()
    }
}
