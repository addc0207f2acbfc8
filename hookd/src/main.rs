//! hookd - Entry Point
//!
//! A webhook deploy agent. Listens for GitHub push webhooks or manual trigger
//! calls and runs the matching repository's shell deploy pipeline.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use hookd::app::options::AppOptions;
use hookd::app::run::run;
use hookd::logs::{init_logging, LogOptions};
use hookd::settings::Settings;
use hookd::utils::version_info;

use tracing::{error, info};

const DEFAULT_SETTINGS_PATH: &str = "/etc/hookd/settings.json";

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    if cli_args.contains_key("version") {
        println!(
            "{}",
            serde_json::to_string_pretty(&version_info()).expect("version info serializes")
        );
        return;
    }

    // Load the settings file
    let settings_path = cli_args
        .get("config")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH));
    let mut settings = match Settings::load(&settings_path).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Unable to read settings file: {}", e);
            std::process::exit(1);
        }
    };

    // Environment overrides: PORT, DEPLOY_SECRET
    if let Err(e) = settings.apply_env() {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        ..Default::default()
    };
    if let Err(e) = init_logging(log_options) {
        println!("Failed to initialize logging: {e}");
    }

    // There is no fallback secret: refuse to start without one.
    let options = match AppOptions::from_settings(&settings) {
        Ok(options) => options,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Running hookd with {} registered repositories",
        options.repos.len()
    );
    let result = run(options, await_shutdown_signal()).await;
    if let Err(e) = result {
        error!("Failed to run hookd: {e}");
        std::process::exit(1);
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("sigterm handler");
        let mut sigint = signal(SignalKind::interrupt()).expect("sigint handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        info!("Ctrl+C received, shutting down...");
    }
}
