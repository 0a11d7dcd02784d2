//! Error types for rule loading.

use thiserror::Error;

/// Errors raised while loading and compiling a rule document.
#[derive(Error, Debug)]
pub enum RuleError {
    /// Rule document could not be read
    #[error("failed to read rule document {path}: {source}")]
    Read {
        /// Path to the rule document
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Rule document is not valid JSON or TOML
    #[error("failed to parse rule document {path}: {reason}")]
    Parse {
        /// Path to the rule document
        path: String,
        /// Parser message
        reason: String,
    },

    /// A pattern failed to compile
    #[error("invalid pattern in {section}: {pattern:?}: {source}")]
    InvalidPattern {
        /// Section holding the pattern
        section: &'static str,
        /// Pattern source text
        pattern: String,
        /// Regex compile error
        #[source]
        source: regex::Error,
    },
}

/// Result type for rule operations.
pub type Result<T> = std::result::Result<T, RuleError>;
