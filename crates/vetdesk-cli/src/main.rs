//! Vetdesk - a command-line client for the clinic and store management API.
//!
//! Every command goes through the shared authenticated client, so an expired
//! access token is refreshed transparently; when the session cannot be
//! recovered the user is asked to log in again.

mod app;
mod cli;

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;
use cli::Cli;

/// Directory for rolling log files; file logging is off when unset
const LOG_DIR_ENV: &str = "VETDESK_LOG_DIR";

const LOG_FILE_PREFIX: &str = "vetdesk.log";

/// Initialize the tracing subscriber for logging.
/// The returned guard must be held until exit so buffered file logs are flushed.
fn init_tracing(verbose: bool) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let (file_layer, guard) = match std::env::var_os(LOG_DIR_ENV) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(PathBuf::from(dir), LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.verbose);
    info!("vetdesk starting");

    let mut app = App::new(cli.api_url, cli.format)?;
    let result = app.run(cli.command).await;

    if let Err(ref e) = result {
        info!(error = %e, "Command failed");
    }
    result
}
