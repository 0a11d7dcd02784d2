//! pgsieve Core - Foundation crate for the pgsieve discovery engine.
//!
//! This crate provides shared types, error handling and configuration
//! management that all other pgsieve crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Core error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Column descriptors, object ids, match records and result codes
//!
//! # Example
//!
//! ```rust
//! use pgsieve_core::{AppConfig, ColumnDescriptor};
//!
//! let config = AppConfig::default();
//! assert_eq!(config.scanning.workers, 4);
//!
//! let column = ColumnDescriptor::new("public", "users", "email", "text");
//! assert_eq!(column.qualified_name(), "public.users.email");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{AppConfig, DatabaseConfig, GeneralConfig, PathsConfig, ScanningConfig};
pub use error::{ConfigError, ConfigResult};
pub use types::{
    ColumnDescriptor, ColumnMatch, MatchReason, ObjectId, ResultCode, SequenceBorder,
};
