//! Database connection management.
//!
//! Builds connect options from configuration and provides `ScanPool`, the
//! connection pool an execution unit owns exclusively for its lifetime.

use crate::error::{DatabaseError, Result};
use pgsieve_core::DatabaseConfig;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Pool, Postgres};
use std::time::Duration;

/// Application name reported in `pg_stat_activity`.
const APPLICATION_NAME: &str = "pgsieve";

/// Build connect options for the scanned database.
#[must_use]
pub fn connect_options(config: &DatabaseConfig) -> PgConnectOptions {
    let options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .database(&config.name)
        .username(&config.user)
        .application_name(APPLICATION_NAME);

    match &config.password {
        Some(password) => options.password(password),
        None => options,
    }
}

/// Fixed-size connection pool owned by one execution unit.
///
/// Pools are never shared between units; each unit opens its own and closes
/// it when its chunk is finished or has failed.
#[derive(Debug)]
pub struct ScanPool {
    pool: Pool<Postgres>,
    size: u32,
}

impl ScanPool {
    /// Open a pool holding exactly `size` connections.
    ///
    /// # Errors
    /// Returns `DatabaseError::Connect` if the first connection cannot be established.
    pub async fn connect(
        options: PgConnectOptions,
        size: u32,
        acquire_timeout: Duration,
    ) -> Result<Self> {
        let size = size.max(1);

        let pool = PgPoolOptions::new()
            .min_connections(size)
            .max_connections(size)
            .acquire_timeout(acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|e| DatabaseError::Connect(format!("failed to open scan pool: {e}")))?;

        tracing::debug!(size, "scan pool opened");

        Ok(Self { pool, size })
    }

    /// Get a reference to the underlying `SQLx` pool.
    #[must_use]
    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }

    /// Close the connection pool gracefully.
    ///
    /// Waits for checked-out connections to be returned before closing them.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::debug!(size = self.size, "scan pool closed");
    }
}
