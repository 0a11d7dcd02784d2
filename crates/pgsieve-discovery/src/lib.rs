//! pgsieve Discovery Module
//!
//! Rule loading and sensitive-data matching: field-name filtering and
//! two-stage detection over sampled column content.

pub mod detector;
pub mod error;
pub mod name_filter;
pub mod rules;

// Re-export main types
pub use detector::{tokenize, SensitiveValueDetector};
pub use error::{Result, RuleError};
pub use name_filter::{filter_by_name, match_field_name, NameFilterOutcome};
pub use rules::{RuleDocument, RuleFormat, RuleSet};
