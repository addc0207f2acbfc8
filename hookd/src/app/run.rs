//! Main application run loop

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::app::options::AppOptions;
use crate::deploy::{Deployer, ShellRunner};
use crate::errors::HookError;
use crate::journal::Journal;
use crate::server::serve::serve;
use crate::server::state::ServerState;

/// Run the hookd agent
pub async fn run(
    options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), HookError> {
    info!("Initializing hookd...");

    // Create shutdown channel
    let (shutdown_tx, _shutdown_rx): (broadcast::Sender<()>, _) = broadcast::channel(1);
    let mut shutdown_manager =
        ShutdownManager::new(shutdown_tx.clone(), options.max_shutdown_delay);

    if let Err(e) = init(&options, &shutdown_tx, &mut shutdown_manager).await {
        error!("Failed to start hookd: {}", e);
        shutdown_manager.shutdown().await?;
        return Err(e);
    }

    tokio::select! {
        _ = shutdown_signal => {
            info!("Shutdown signal received, shutting down...");
        }
    }

    drop(shutdown_tx);
    shutdown_manager.shutdown().await
}

async fn init(
    options: &AppOptions,
    shutdown_tx: &broadcast::Sender<()>,
    shutdown_manager: &mut ShutdownManager,
) -> Result<(), HookError> {
    let journal = Arc::new(Journal::new(
        options.journal.log_file.clone(),
        options.journal.max_lines,
    ));
    journal.init().await?;

    let runner = Arc::new(ShellRunner::new(
        journal.clone(),
        options.runner.command_timeout,
    ));
    let deployer = Arc::new(Deployer::new(runner, journal.clone()));

    let state = Arc::new(ServerState::new(
        options.repos.clone(),
        options.secret.clone(),
        journal.clone(),
        deployer,
    ));

    let mut shutdown_rx = shutdown_tx.subscribe();
    let server_handle = serve(&options.server, state, async move {
        let _ = shutdown_rx.recv().await;
    })
    .await?;
    shutdown_manager.with_server_handle(server_handle)?;

    journal
        .record(&format!(
            "Deploy hook server listening on port {}",
            options.server.port
        ))
        .await;

    Ok(())
}

// ================================= SHUTDOWN ===================================== //

struct ShutdownManager {
    shutdown_tx: broadcast::Sender<()>,
    max_shutdown_delay: Duration,
    server_handle: Option<JoinHandle<Result<(), HookError>>>,
}

impl ShutdownManager {
    fn new(shutdown_tx: broadcast::Sender<()>, max_shutdown_delay: Duration) -> Self {
        Self {
            shutdown_tx,
            max_shutdown_delay,
            server_handle: None,
        }
    }

    fn with_server_handle(
        &mut self,
        handle: JoinHandle<Result<(), HookError>>,
    ) -> Result<(), HookError> {
        if self.server_handle.is_some() {
            return Err(HookError::ShutdownError("server_handle already set".to_string()));
        }
        self.server_handle = Some(handle);
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), HookError> {
        let _ = self.shutdown_tx.send(());

        match tokio::time::timeout(self.max_shutdown_delay, self.shutdown_impl()).await {
            Ok(result) => result,
            Err(_) => {
                error!(
                    "Shutdown timed out after {:?}, forcing shutdown...",
                    self.max_shutdown_delay
                );
                std::process::exit(1);
            }
        }
    }

    async fn shutdown_impl(&mut self) -> Result<(), HookError> {
        info!("Shutting down hookd...");

        if let Some(handle) = self.server_handle.take() {
            handle
                .await
                .map_err(|e| HookError::ShutdownError(e.to_string()))??;
        }

        info!("Shutdown complete");
        Ok(())
    }
}
