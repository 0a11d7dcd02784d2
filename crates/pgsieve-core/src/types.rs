//! Shared types used across the pgsieve workspace.
//!
//! This module defines the column descriptors produced by catalog enumeration,
//! the match records produced by name filtering and value scanning, and the
//! terminal result code of a run.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Deterministic fingerprint of a `schema.table.column` triple.
///
/// Object ids are hex-encoded SHA-256 digests, so the same column produces
/// the same id on every run and on every host.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(String);

impl ObjectId {
    /// Fingerprint a column by its qualified name.
    #[must_use]
    pub fn from_parts(schema: &str, table: &str, column: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(schema.as_bytes());
        hasher.update(b".");
        hasher.update(table.as_bytes());
        hasher.update(b".");
        hasher.update(column.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A scan-eligible column enumerated from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Owning schema
    pub schema: String,
    /// Owning table
    pub table: String,
    /// Column name
    pub column: String,
    /// Declared type as rendered by `format_type` (e.g. `numeric(10,2)`)
    pub declared_type: String,
    /// Fingerprint of `schema.table.column`
    pub object_id: ObjectId,
}

impl ColumnDescriptor {
    /// Build a descriptor, deriving the object id from the qualified name.
    #[must_use]
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
        declared_type: impl Into<String>,
    ) -> Self {
        let schema = schema.into();
        let table = table.into();
        let column = column.into();
        let object_id = ObjectId::from_parts(&schema, &table, &column);

        Self {
            schema,
            table,
            column,
            declared_type: declared_type.into(),
            object_id,
        }
    }

    /// `schema.table.column`, unquoted, for log output.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}.{}.{}", self.schema, self.table, self.column)
    }
}

impl fmt::Display for ColumnDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{} ({})",
            self.schema, self.table, self.column, self.declared_type
        )
    }
}

/// A sequence-backed column together with its observed maximum value.
///
/// Captured for bounded re-scans; the matching decision does not use it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceBorder {
    /// The sequence-owned column
    pub column: ColumnDescriptor,
    /// `max(column)` at capture time, `None` for an empty table
    pub max_value: Option<i64>,
}

/// Why a column was flagged as sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum MatchReason {
    /// The column name matched a field-name rule
    FieldName {
        /// Source text of the matching rule
        rule: String,
    },
    /// Sampled tokens intersected the constants set
    Constant {
        /// Intersecting tokens, sorted
        tokens: Vec<String>,
    },
    /// A sampled value matched a value rule
    Pattern {
        /// Source text of the matching rule
        rule: String,
    },
}

impl fmt::Display for MatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldName { rule } => write!(f, "field name rule {rule}"),
            Self::Constant { tokens } => write!(f, "constants {}", tokens.join(", ")),
            Self::Pattern { rule } => write!(f, "value rule {rule}"),
        }
    }
}

/// One flagged column. Exactly one record exists per flagged column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMatch {
    /// The flagged column
    pub column: ColumnDescriptor,
    /// What flagged it
    pub reason: MatchReason,
}

/// Terminal result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResultCode {
    /// The dictionary was written
    Done,
    /// The run aborted; no dictionary was written
    Fail,
}

impl ResultCode {
    /// Process exit code for this result.
    #[must_use]
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Done => 0,
            Self::Fail => 1,
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done => write!(f, "DONE"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}
