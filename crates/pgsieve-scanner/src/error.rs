use pgsieve_core::ConfigError;
use pgsieve_db::DatabaseError;
use pgsieve_discovery::RuleError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("rule configuration error: {0}")]
    Rules(#[from] RuleError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("no columns to scan")]
    NoColumns,

    #[error("catalog error: {0}")]
    Database(#[from] DatabaseError),

    #[error("scan unit {unit} could not open its connection pool: {source}")]
    SamplerOpen {
        unit: usize,
        source: DatabaseError,
    },

    #[error("failed to scan column {column}: {source}")]
    ColumnScan {
        column: String,
        source: DatabaseError,
    },

    #[error("failed to start scan unit {unit}: {source}")]
    UnitSpawn {
        unit: usize,
        source: std::io::Error,
    },

    #[error("failed to build runtime for scan unit {unit}: {source}")]
    UnitRuntime {
        unit: usize,
        source: std::io::Error,
    },

    #[error("scan unit {unit} panicked")]
    UnitPanicked { unit: usize },

    #[error("failed to write dictionary {path}: {source}")]
    Output {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to serialize dictionary: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ScanError>;
