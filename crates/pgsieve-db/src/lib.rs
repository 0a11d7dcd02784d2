//! pgsieve Database Layer
//!
//! Read-only PostgreSQL access for the discovery engine, built on `SQLx`.
//!
//! # Architecture
//!
//! - **Catalog**: enumerates scan-eligible columns and sequence borders from `pg_catalog`
//! - **Sampling**: bounded `SELECT DISTINCT ... LIMIT n` per column, values rendered as text
//! - **Connection Pooling**: every execution unit owns a private fixed-size [`ScanPool`]
//! - **Backends**: the scanner talks to the database through [`ScanBackend`] and
//!   [`ColumnSampler`], with [`PgBackend`] as the live implementation
//!
//! # Example
//!
//! ```ignore
//! use pgsieve_db::{PgBackend, ScanBackend};
//!
//! let backend = PgBackend::from_config(&config.database);
//! let columns = backend.eligible_columns().await?;
//! let sampler = backend.open_sampler(4).await?;
//! let values = sampler.sample(&columns[0], 10_000).await?;
//! sampler.close().await;
//! ```
//!
//! Nothing in this crate writes to the scanned database.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod backend;
pub mod catalog;
pub mod connection;
pub mod error;
pub mod sample;

// Re-export commonly used types
pub use backend::{ColumnSampler, PgBackend, PgSampler, ScanBackend};
pub use connection::{connect_options, ScanPool};
pub use error::{DatabaseError, Result};
