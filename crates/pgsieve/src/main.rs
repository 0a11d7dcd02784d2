//! pgsieve - builds an anonymization dictionary for a PostgreSQL database.
//!
//! Configuration comes from `PGSIEVE_CONFIG` when set, otherwise from the
//! default config location, with `PGSIEVE_*` environment overrides applied.
//! The process exits with 0 when the dictionary was written and 1 otherwise.

use anyhow::Context;
use pgsieve_core::{AppConfig, ResultCode};
use pgsieve_db::PgBackend;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

/// Initialize tracing subscriber for logging
fn init_tracing(debug: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

fn load_config() -> anyhow::Result<AppConfig> {
    let path = std::env::var_os("PGSIEVE_CONFIG").map(PathBuf::from);

    match path {
        Some(path) => AppConfig::load_with_env(Some(&path))
            .with_context(|| format!("failed to load configuration from {}", path.display())),
        None => AppConfig::load_with_env(None).context("failed to load configuration"),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = load_config();
    init_tracing(config.as_ref().is_ok_and(|config| config.general.debug));

    info!("Starting pgsieve v{}", env!("CARGO_PKG_VERSION"));

    let code = match config {
        Ok(config) => {
            info!(
                host = %config.database.host,
                port = config.database.port,
                database = %config.database.name,
                workers = config.scanning.workers,
                "Scanning database"
            );
            let backend = Arc::new(PgBackend::from_config(&config.database));
            pgsieve_scanner::run(&config, backend).await
        }
        Err(e) => {
            error!("{e:#}");
            ResultCode::Fail
        }
    };

    info!(result = %code, "pgsieve finished");
    ExitCode::from(code.exit_code())
}
