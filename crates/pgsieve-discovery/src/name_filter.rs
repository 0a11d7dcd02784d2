//! Name-based column filtering.
//!
//! Columns whose name matches a field-name rule are flagged immediately and
//! never reach value sampling.

use crate::rules::RuleSet;
use pgsieve_core::{ColumnDescriptor, ColumnMatch, MatchReason};
use regex::Regex;
use tracing::debug;

/// Result of splitting candidates by name.
#[derive(Debug, Clone, Default)]
pub struct NameFilterOutcome {
    /// Columns that still need value sampling, in input order
    pub remaining: Vec<ColumnDescriptor>,
    /// Columns flagged by name
    pub matches: Vec<ColumnMatch>,
}

/// First field-name rule matching `column_name`, if any.
#[must_use]
pub fn match_field_name<'r>(rules: &'r RuleSet, column_name: &str) -> Option<&'r Regex> {
    rules
        .field_name_rules()
        .iter()
        .find(|rule| rule.is_match(column_name))
}

/// Split candidate columns into name matches and columns left to sample.
#[must_use]
pub fn filter_by_name(columns: Vec<ColumnDescriptor>, rules: &RuleSet) -> NameFilterOutcome {
    let mut outcome = NameFilterOutcome::default();

    for column in columns {
        match match_field_name(rules, &column.column) {
            Some(rule) => {
                debug!(
                    column = %column.qualified_name(),
                    rule = rule.as_str(),
                    "column matched by name, skipping sampling"
                );
                outcome.matches.push(ColumnMatch {
                    column,
                    reason: MatchReason::FieldName {
                        rule: rule.as_str().to_string(),
                    },
                });
            }
            None => outcome.remaining.push(column),
        }
    }

    outcome
}
