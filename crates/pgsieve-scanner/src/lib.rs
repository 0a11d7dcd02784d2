//! pgsieve Scanner - Sensitive column discovery orchestration.
//!
//! This crate turns the candidate column list into an anonymization
//! dictionary. It partitions columns across isolated execution units, samples
//! and classifies them under a bounded in-flight window, and merges every
//! match into one deterministic document.
//!
//! # Features
//!
//! - One OS thread with its own single-threaded runtime and connection pool per unit
//! - Sliding admission window of at most `workers` column scans per unit
//! - Fail-fast units: the first column error aborts the unit and fails the run
//! - Optional unit timeout that drops the unit's results without failing the run
//! - Order-independent aggregation and atomic dictionary output
//!
//! # Example
//!
//! ```rust,ignore
//! use pgsieve_core::AppConfig;
//! use pgsieve_db::PgBackend;
//! use pgsieve_scanner::create_dictionary;
//! use std::sync::Arc;
//!
//! let config = AppConfig::load_with_env(None)?;
//! let backend = Arc::new(PgBackend::from_config(&config.database));
//! let summary = create_dictionary(&config, backend).await?;
//! println!("{} tables written to {}", summary.tables, summary.output_path.display());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod aggregator;
pub mod distributor;
#[allow(missing_docs)]
pub mod error;
pub mod orchestrator;
pub mod pipeline;
pub mod worker;
pub mod writer;

// Re-export commonly used types
pub use aggregator::{AnonymizationRule, OutputDictionary, RuleAggregator, TransformTemplate};
pub use distributor::chunkify;
pub use error::{Result, ScanError};
pub use orchestrator::{ScanOrchestrator, ScanReport, UnitReport};
pub use pipeline::{create_dictionary, run, RunSummary};
pub use worker::{scan_chunk, scan_column, ScanSettings, UnitMessage, UnitOutcome};
pub use writer::DictionaryWriter;
