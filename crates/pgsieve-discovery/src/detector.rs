//! Content-based detection over a column sample.
//!
//! Detection runs in two stages. Sampled values are tokenized and the token
//! set is intersected with the rule constants; only when that finds nothing
//! are the raw values tested against the value patterns, stopping at the
//! first hit.

use crate::rules::RuleSet;
use pgsieve_core::MatchReason;
use std::collections::HashSet;

/// Tokens must be longer than this many characters to be kept.
pub const MIN_TOKEN_CHARS: usize = 3;

/// Collect the lower-cased whitespace tokens longer than [`MIN_TOKEN_CHARS`].
///
/// `None` values are skipped.
#[must_use]
pub fn tokenize<'a, I>(values: I) -> HashSet<String>
where
    I: IntoIterator<Item = &'a Option<String>>,
{
    values
        .into_iter()
        .flatten()
        .flat_map(|value| value.split_whitespace())
        .filter(|word| word.chars().count() > MIN_TOKEN_CHARS)
        .map(str::to_lowercase)
        .collect()
}

/// Classifies column samples against a [`RuleSet`].
#[derive(Debug, Clone, Copy)]
pub struct SensitiveValueDetector<'r> {
    rules: &'r RuleSet,
}

impl<'r> SensitiveValueDetector<'r> {
    /// Create a detector over a rule set.
    #[must_use]
    pub fn new(rules: &'r RuleSet) -> Self {
        Self { rules }
    }

    /// Classify a sample; `None` means the column is not sensitive.
    #[must_use]
    pub fn detect(&self, values: &[Option<String>]) -> Option<MatchReason> {
        self.match_constants(values)
            .or_else(|| self.match_patterns(values))
    }

    fn match_constants(&self, values: &[Option<String>]) -> Option<MatchReason> {
        let constants = self.rules.value_constants();
        if constants.is_empty() {
            return None;
        }

        let mut tokens: Vec<String> = tokenize(values)
            .into_iter()
            .filter(|token| constants.contains(token))
            .collect();

        if tokens.is_empty() {
            return None;
        }

        tokens.sort();
        Some(MatchReason::Constant { tokens })
    }

    fn match_patterns(&self, values: &[Option<String>]) -> Option<MatchReason> {
        let rules = self.rules.value_rules();
        if rules.is_empty() {
            return None;
        }

        values.iter().flatten().find_map(|value| {
            rules
                .iter()
                .find(|rule| rule.is_match(value))
                .map(|rule| MatchReason::Pattern {
                    rule: rule.as_str().to_string(),
                })
        })
    }
}
