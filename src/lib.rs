pub mod client;
pub mod config;
pub mod daemon;
pub mod errors;
pub mod models;
pub mod protocol;
pub mod service;
pub mod store;

use crate::config::DaemonConfig;
use crate::daemon::Daemon;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;

/// Entry point for the hidden `daemon` sub-command. Never returns: the
/// process exits once the daemon has drained.
pub fn run_daemon() -> ! {
    let log_guard = match init_daemon_tracing(&config::log_dir()) {
        Ok(guard) => Some(guard),
        Err(error) => {
            eprintln!("failed to initialise logging: {}", error);
            None
        }
    };

    let code = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => {
            let code = match runtime.block_on(Daemon::new(DaemonConfig::default()).run()) {
                Ok(reason) => {
                    tracing::info!(reason = reason.as_str(), "daemon terminated");
                    0
                }
                Err(error) => {
                    tracing::error!(error = %error, "daemon failed to start");
                    1
                }
            };
            runtime.shutdown_background();
            code
        }
        Err(error) => {
            tracing::error!(error = %error, "failed to build runtime");
            1
        }
    };

    // Flush buffered log lines; exit skips destructors.
    drop(log_guard);
    std::process::exit(code);
}

fn init_daemon_tracing(log_dir: &Path) -> Result<WorkerGuard, String> {
    std::fs::create_dir_all(log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "daemon.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())?;
    Ok(guard)
}

pub fn init_client_tracing() -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .compact()
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| error.to_string())
}
