//! Backend traits consumed by the scanner, and their PostgreSQL implementation.
//!
//! The scanner only talks to a database through [`ScanBackend`] (catalog
//! access, opening samplers) and [`ColumnSampler`] (per-unit sampling).

use crate::catalog;
use crate::connection::ScanPool;
use crate::error::Result;
use crate::sample;
use async_trait::async_trait;
use pgsieve_core::{ColumnDescriptor, DatabaseConfig, SequenceBorder};
use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, PgConnection};
use std::time::Duration;

/// Access to the scanned database.
///
/// Implementations must be shareable across execution units; each unit calls
/// [`ScanBackend::open_sampler`] once to get its own exclusive sampler.
#[async_trait]
pub trait ScanBackend: Send + Sync {
    /// Enumerate scan-eligible columns.
    async fn eligible_columns(&self) -> Result<Vec<ColumnDescriptor>>;

    /// Enumerate sequence-backed columns with their current maximum value.
    async fn sequence_borders(&self) -> Result<Vec<SequenceBorder>>;

    /// Open a sampler backed by a private pool of `pool_size` connections.
    async fn open_sampler(&self, pool_size: u32) -> Result<Box<dyn ColumnSampler>>;
}

/// Per-unit column sampler.
#[async_trait]
pub trait ColumnSampler: Send + Sync {
    /// Fetch up to `limit` distinct values of `column` as text.
    async fn sample(&self, column: &ColumnDescriptor, limit: u32) -> Result<Vec<Option<String>>>;

    /// Release the sampler's connections.
    async fn close(&self);
}

/// `ScanBackend` over a live PostgreSQL server.
#[derive(Debug, Clone)]
pub struct PgBackend {
    options: PgConnectOptions,
    connect_timeout: Duration,
}

impl PgBackend {
    /// Create a backend from explicit connect options.
    #[must_use]
    pub fn new(options: PgConnectOptions, connect_timeout: Duration) -> Self {
        Self {
            options,
            connect_timeout,
        }
    }

    /// Create a backend from configuration.
    #[must_use]
    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self::new(
            crate::connection::connect_options(config),
            config.connect_timeout(),
        )
    }

    async fn connect(&self) -> Result<PgConnection> {
        let conn = PgConnection::connect_with(&self.options).await?;
        Ok(conn)
    }
}

#[async_trait]
impl ScanBackend for PgBackend {
    async fn eligible_columns(&self) -> Result<Vec<ColumnDescriptor>> {
        let mut conn = self.connect().await?;
        let columns = catalog::eligible_columns(&mut conn).await?;
        conn.close().await?;
        Ok(columns)
    }

    async fn sequence_borders(&self) -> Result<Vec<SequenceBorder>> {
        let mut conn = self.connect().await?;
        let borders = catalog::sequence_borders(&mut conn).await?;
        conn.close().await?;
        Ok(borders)
    }

    async fn open_sampler(&self, pool_size: u32) -> Result<Box<dyn ColumnSampler>> {
        let pool = ScanPool::connect(self.options.clone(), pool_size, self.connect_timeout).await?;
        Ok(Box::new(PgSampler { pool }))
    }
}

/// `ColumnSampler` over a unit-owned [`ScanPool`].
#[derive(Debug)]
pub struct PgSampler {
    pool: ScanPool,
}

#[async_trait]
impl ColumnSampler for PgSampler {
    async fn sample(&self, column: &ColumnDescriptor, limit: u32) -> Result<Vec<Option<String>>> {
        sample::sample_column(self.pool.pool(), column, limit).await
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
