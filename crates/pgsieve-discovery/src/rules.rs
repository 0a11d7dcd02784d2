//! Rule document loading and compilation.
//!
//! A rule document has three sections:
//!
//! ```json
//! {
//!     "field_rules": ["^ssn$", "passport"],
//!     "data_constants": ["secret", "confidential"],
//!     "data_regex": ["\\b\\d{3}-\\d{2}-\\d{4}\\b"]
//! }
//! ```
//!
//! The same sections are accepted from a `.toml` file. Every pattern is
//! compiled once into a [`RuleSet`], which is immutable afterwards and shared
//! read-only by all execution units.

use crate::error::{Result, RuleError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

/// Raw rule document as written on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleDocument {
    /// Patterns matched against column names
    pub field_rules: Vec<String>,
    /// Tokens matched case-insensitively against sampled words
    pub data_constants: Vec<String>,
    /// Patterns matched against sampled values
    pub data_regex: Vec<String>,
}

/// Supported rule document encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleFormat {
    /// JSON object
    Json,
    /// TOML table
    Toml,
}

impl RuleFormat {
    /// Pick the format from a file extension; anything but `.toml` is JSON.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Json,
        }
    }
}

impl RuleDocument {
    /// Parse a rule document from text.
    ///
    /// `origin` only labels errors.
    pub fn parse(contents: &str, format: RuleFormat, origin: &str) -> Result<Self> {
        let parsed = match format {
            RuleFormat::Json => serde_json::from_str(contents).map_err(|e| e.to_string()),
            RuleFormat::Toml => toml::from_str(contents).map_err(|e| e.to_string()),
        };

        parsed.map_err(|reason| RuleError::Parse {
            path: origin.to_string(),
            reason,
        })
    }
}

/// Compiled, immutable detection rules.
#[derive(Debug, Clone)]
pub struct RuleSet {
    field_name_rules: Vec<Regex>,
    value_constants: HashSet<String>,
    value_rules: Vec<Regex>,
}

impl RuleSet {
    /// Load and compile the rule document at `path`.
    ///
    /// # Errors
    /// Returns `RuleError` if the file cannot be read, does not parse, or a
    /// pattern fails to compile.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| RuleError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let document = RuleDocument::parse(
            &contents,
            RuleFormat::from_path(path),
            &path.display().to_string(),
        )?;
        let rules = Self::compile(&document)?;

        info!(
            path = %path.display(),
            field_rules = rules.field_name_rules.len(),
            data_constants = rules.value_constants.len(),
            data_regex = rules.value_rules.len(),
            "loaded rule document"
        );

        Ok(rules)
    }

    /// Compile a parsed document.
    ///
    /// Constants are lower-cased; pattern order is preserved.
    pub fn compile(document: &RuleDocument) -> Result<Self> {
        Ok(Self {
            field_name_rules: compile_patterns("field_rules", &document.field_rules)?,
            value_constants: document
                .data_constants
                .iter()
                .map(|c| c.to_lowercase())
                .collect(),
            value_rules: compile_patterns("data_regex", &document.data_regex)?,
        })
    }

    /// Patterns tested against column names, in document order.
    #[must_use]
    pub fn field_name_rules(&self) -> &[Regex] {
        &self.field_name_rules
    }

    /// Lower-cased constant tokens.
    #[must_use]
    pub fn value_constants(&self) -> &HashSet<String> {
        &self.value_constants
    }

    /// Patterns tested against sampled values, in document order.
    #[must_use]
    pub fn value_rules(&self) -> &[Regex] {
        &self.value_rules
    }
}

fn compile_patterns(section: &'static str, patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|source| RuleError::InvalidPattern {
                section,
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}
