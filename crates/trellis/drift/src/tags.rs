//! Tag set reconciliation
//!
//! Computes the minimal add/remove edits that converge an observed tag set
//! with a desired one. The remote tag APIs are add/remove oriented, so a
//! changed value is expressed as a removal of the old entry plus an
//! addition of the new one, never an in-place update.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use trellis_types::TagSet;

/// The edits that converge an observed tag set with a desired one.
///
/// Applying `remove` and then `add` to the observed set yields exactly the
/// desired set. Removal must come first: a key whose value changes appears
/// in both lists, and adding before removing would drop the new value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagDelta {
    /// Entries to add or re-add with their desired values.
    pub add: BTreeMap<String, String>,

    /// Keys to remove from the observed set.
    pub remove: BTreeSet<String>,
}

impl TagDelta {
    /// Whether the two sets already agree.
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }

    /// The keys to remove, in the form the provider tag APIs take.
    pub fn removed_keys(&self) -> Vec<String> {
        self.remove.iter().cloned().collect()
    }

    /// The entries to add, as a tag set for the provider tag APIs.
    pub fn added_tags(&self) -> TagSet {
        self.add
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Apply the delta to an observed set, removals before additions.
    pub fn apply_to(&self, observed: &TagSet) -> TagSet {
        let mut result = observed.clone();
        for key in &self.remove {
            result.remove(key);
        }
        for (key, value) in &self.add {
            result.insert(key.clone(), value.clone());
        }
        result
    }
}

impl fmt::Display for TagDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let added: Vec<&str> = self.add.keys().map(String::as_str).collect();
        let removed: Vec<&str> = self.remove.iter().map(String::as_str).collect();
        write!(
            f,
            "add [{}], remove [{}]",
            added.join(", "),
            removed.join(", ")
        )
    }
}

/// Compute the edits that converge `observed` with `desired`.
///
/// Every observed key that is absent from `desired` or carries a different
/// value is marked for removal; every desired entry missing from
/// `observed` (by key or by value) is marked for addition. Identical
/// entries are untouched.
pub fn diff_tags(desired: &TagSet, observed: &TagSet) -> TagDelta {
    let mut add: BTreeMap<String, String> = desired
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let mut remove = BTreeSet::new();
    for (key, value) in observed.iter() {
        if add.get(key) == Some(value) {
            add.remove(key);
            continue;
        }
        remove.insert(key.clone());
    }

    TagDelta { add, remove }
}
