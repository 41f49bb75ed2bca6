//! Cross-record references
//!
//! A reference points one desired-record field at another resource. The
//! caller expresses it as exactly one of: a literal value (written
//! directly into the parameter bag), an explicit named reference, or a
//! label selector. After resolution the literal value lands in the
//! parameter bag and the matched reference is remembered on the binding,
//! so later cycles re-resolve idempotently.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A named pointer at another record of the reference's target kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRef {
    /// Name of the referenced record.
    pub name: String,
}

impl RecordRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A label predicate for finding a referenced record without naming it.
///
/// A candidate matches when every selector label is present on it with the
/// same value. An empty selector matches every candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selector {
    /// Labels the candidate must carry.
    pub match_labels: BTreeMap<String, String>,
}

impl Selector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style label constraint.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.match_labels.insert(key.into(), value.into());
        self
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.match_labels
            .iter()
            .all(|(k, v)| labels.get(k) == Some(v))
    }
}

/// The caller-declared half of a reference field, kept on the record per
/// field name. The resolved literal value itself lives in the parameter
/// bag under the same field name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReferenceBinding {
    /// A single-valued reference field.
    Single {
        /// Explicit named reference, or the remembered match after a
        /// selector resolution.
        reference: Option<RecordRef>,
        /// Selector used when no value and no explicit reference is given.
        selector: Option<Selector>,
    },
    /// A list-valued reference field with a shared selector.
    Multi {
        /// Explicit named references, one per list position.
        references: Vec<RecordRef>,
        /// Selector used when no explicit references are given.
        selector: Option<Selector>,
    },
}

impl ReferenceBinding {
    /// Single-valued binding naming its target directly.
    pub fn to_record(name: impl Into<String>) -> Self {
        Self::Single {
            reference: Some(RecordRef::new(name)),
            selector: None,
        }
    }

    /// Single-valued binding that selects its target by labels.
    pub fn to_selector(selector: Selector) -> Self {
        Self::Single {
            reference: None,
            selector: Some(selector),
        }
    }

    /// List-valued binding naming each target directly.
    pub fn to_records<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Multi {
            references: names.into_iter().map(RecordRef::new).collect(),
            selector: None,
        }
    }

    /// List-valued binding that selects all matching targets by labels.
    pub fn to_all_matching(selector: Selector) -> Self {
        Self::Multi {
            references: Vec::new(),
            selector: Some(selector),
        }
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, Self::Multi { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_selector_subset_matching() {
        let selector = Selector::new().with_label("env", "prod");
        assert!(selector.matches(&labels(&[("env", "prod"), ("team", "net")])));
        assert!(!selector.matches(&labels(&[("env", "dev")])));
        assert!(!selector.matches(&labels(&[])));
    }

    #[test]
    fn test_empty_selector_matches_everything() {
        let selector = Selector::new();
        assert!(selector.matches(&labels(&[])));
        assert!(selector.matches(&labels(&[("env", "prod")])));
    }
}
