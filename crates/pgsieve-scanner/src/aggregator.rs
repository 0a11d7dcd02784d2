//! Merges matches into the anonymization dictionary.
//!
//! Matches are keyed by `(schema, table)` and then by column name, so the
//! resulting dictionary does not depend on the order in which units delivered
//! their results or on how columns were partitioned between them.

use pgsieve_core::{ColumnMatch, ObjectId};
use pgsieve_db::sample::quote_ident;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Salt word embedded in hash transforms.
pub const HASH_SALT: &str = "salt_word";

/// Noise ratio applied to numeric columns.
pub const NUMERIC_NOISE_RATIO: u32 = 10;

/// Noise interval applied to timestamp columns.
pub const TIMESTAMP_NOISE_INTERVAL: &str = "6 month";

/// Anonymization transform chosen for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformTemplate {
    /// One-way salted hash
    SaltedHash,
    /// Proportional noise on numbers
    NumericNoise,
    /// Interval noise on timestamps
    IntervalNoise,
}

impl TransformTemplate {
    /// Pick the template for a declared column type.
    ///
    /// `numeric` wins over `timestamp`; anything else is hashed.
    #[must_use]
    pub fn for_type(declared_type: &str) -> Self {
        let declared_type = declared_type.to_lowercase();
        if declared_type.contains("numeric") {
            Self::NumericNoise
        } else if declared_type.contains("timestamp") {
            Self::IntervalNoise
        } else {
            Self::SaltedHash
        }
    }

    /// Render the transform expression for a column.
    #[must_use]
    pub fn expression(self, column: &str) -> String {
        let column = quote_ident(column);
        match self {
            Self::SaltedHash => format!("anon_funcs.digest({column}, '{HASH_SALT}', 'md5')"),
            Self::NumericNoise => format!("anon_funcs.noise({column}, {NUMERIC_NOISE_RATIO})"),
            Self::IntervalNoise => {
                format!("anon_funcs.dnoise({column}, interval '{TIMESTAMP_NOISE_INTERVAL}')")
            }
        }
    }
}

/// Transforms for the flagged columns of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnonymizationRule {
    /// Owning schema
    pub schema: String,
    /// Table name
    pub table: String,
    /// Column name to transform expression
    pub fields: BTreeMap<String, String>,
}

/// The output document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDictionary {
    /// One group per table, ordered by schema then table
    pub dictionary: Vec<AnonymizationRule>,
}

impl OutputDictionary {
    /// Number of flagged columns across all tables.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.dictionary.iter().map(|rule| rule.fields.len()).sum()
    }
}

/// Accumulates matches into per-table rules.
#[derive(Debug, Default)]
pub struct RuleAggregator {
    groups: BTreeMap<(String, String), BTreeMap<String, String>>,
    seen: HashSet<ObjectId>,
}

impl RuleAggregator {
    /// Create an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one match.
    ///
    /// Returns `false` when the column was already added; the first entry is kept.
    pub fn add(&mut self, record: &ColumnMatch) -> bool {
        let column = &record.column;
        if !self.seen.insert(column.object_id.clone()) {
            tracing::warn!(
                column = %column.qualified_name(),
                object_id = %column.object_id,
                "Column matched more than once, keeping the first match"
            );
            return false;
        }

        let template = TransformTemplate::for_type(&column.declared_type);

        self.groups
            .entry((column.schema.clone(), column.table.clone()))
            .or_default()
            .insert(column.column.clone(), template.expression(&column.column));
        true
    }

    /// Add every match from an iterator.
    pub fn extend<'a, I>(&mut self, records: I)
    where
        I: IntoIterator<Item = &'a ColumnMatch>,
    {
        for record in records {
            self.add(record);
        }
    }

    /// Finish aggregation.
    #[must_use]
    pub fn into_dictionary(self) -> OutputDictionary {
        let dictionary = self
            .groups
            .into_iter()
            .map(|((schema, table), fields)| AnonymizationRule {
                schema,
                table,
                fields,
            })
            .collect();

        OutputDictionary { dictionary }
    }
}
