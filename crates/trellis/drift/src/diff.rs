//! Structural up-to-date comparison
//!
//! Walks a kind's field groups in schema order and stops at the first
//! group where desired and observed state disagree, so the caller gets an
//! actionable, minimal delta rather than a full dump. Collection groups
//! compare order-insensitively; scalar groups can treat an unset side and
//! a provider-defaulted empty value as equal.

use crate::tags::diff_tags;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use trellis_types::{
    ComparePolicy, DesiredRecord, FieldGroup, FieldName, FieldValue, KindSchema, ObservedRecord,
};

/// Group name under which tag drift is reported.
pub const TAG_GROUP: &str = "tags";

/// The first difference found between a desired and an observed record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDiff {
    /// The field group that differs.
    pub group: FieldName,

    /// What differs, rendered for the status message.
    pub detail: String,
}

impl fmt::Display for FieldDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.group, self.detail)
    }
}

/// Verdict of one up-to-date comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffOutcome {
    /// Whether the observed resource matches the declaration.
    pub up_to_date: bool,

    /// The first mismatching group, when not up to date.
    pub difference: Option<FieldDiff>,
}

impl DiffOutcome {
    fn in_sync() -> Self {
        Self {
            up_to_date: true,
            difference: None,
        }
    }

    fn differs(diff: FieldDiff) -> Self {
        Self {
            up_to_date: false,
            difference: Some(diff),
        }
    }
}

/// Compare a desired record against an observation of it.
///
/// Field groups are scanned in schema order and the scan stops at the
/// first mismatch. Groups restricted to other sub-types are skipped. The
/// tag set is always compared last, through the tag reconciler, so a zero
/// add/remove delta and an up-to-date verdict are the same fact.
pub fn is_up_to_date(
    schema: &KindSchema,
    desired: &DesiredRecord,
    observed: &ObservedRecord,
) -> DiffOutcome {
    // The declared sub-type wins; fall back to the observed one before
    // late initialization has persisted it.
    let sub_type = schema
        .sub_type_of(&desired.parameters)
        .or_else(|| schema.sub_type_of(&observed.parameters));

    for group in &schema.field_groups {
        if !group.applies_to(sub_type) {
            continue;
        }
        let desired_value = desired.parameters.get(&group.name);
        let observed_value = observed.parameters.get(&group.name);
        if let Some(diff) = compare_group(group, desired_value, observed_value) {
            return DiffOutcome::differs(diff);
        }
    }

    let delta = diff_tags(&desired.tags, &observed.tags);
    if !delta.is_empty() {
        return DiffOutcome::differs(FieldDiff {
            group: TAG_GROUP.to_string(),
            detail: delta.to_string(),
        });
    }

    DiffOutcome::in_sync()
}

fn compare_group(
    group: &FieldGroup,
    desired: Option<&FieldValue>,
    observed: Option<&FieldValue>,
) -> Option<FieldDiff> {
    match &group.policy {
        ComparePolicy::Scalar { empty_equals_unset } => {
            compare_scalar(group, desired, observed, *empty_equals_unset)
        }
        ComparePolicy::UnorderedList => {
            let desired_sorted = canonical_list(desired);
            let observed_sorted = canonical_list(observed);
            (desired_sorted != observed_sorted).then(|| FieldDiff {
                group: group.name.clone(),
                detail: format!(
                    "desired [{}], observed [{}]",
                    desired_sorted.join(", "),
                    observed_sorted.join(", ")
                ),
            })
        }
        ComparePolicy::UnorderedMapList => {
            let desired_sorted = canonical_map_list(desired);
            let observed_sorted = canonical_map_list(observed);
            (desired_sorted != observed_sorted).then(|| FieldDiff {
                group: group.name.clone(),
                detail: format!(
                    "desired [{}], observed [{}]",
                    desired_sorted.join(", "),
                    observed_sorted.join(", ")
                ),
            })
        }
    }
}

fn compare_scalar(
    group: &FieldGroup,
    desired: Option<&FieldValue>,
    observed: Option<&FieldValue>,
    empty_equals_unset: bool,
) -> Option<FieldDiff> {
    let equal = match (desired, observed) {
        (None, None) => true,
        (Some(d), Some(o)) => d == o,
        (None, Some(o)) => empty_equals_unset && o.is_empty_default(),
        (Some(d), None) => empty_equals_unset && d.is_empty_default(),
    };
    (!equal).then(|| FieldDiff {
        group: group.name.clone(),
        detail: format!("desired {}, observed {}", render(desired), render(observed)),
    })
}

fn render(value: Option<&FieldValue>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "unset".to_string(),
    }
}

/// Canonical order-insensitive form of a list value. Absent and empty are
/// both the empty form.
fn canonical_list(value: Option<&FieldValue>) -> Vec<String> {
    let mut items = match value {
        None => Vec::new(),
        Some(FieldValue::List(items)) => items.clone(),
        Some(other) => vec![other.to_string()],
    };
    items.sort();
    items
}

/// Canonical form of a structured list: each element keyed by its sorted
/// entries, elements sorted by that composite key.
fn canonical_map_list(value: Option<&FieldValue>) -> Vec<String> {
    let empty: Vec<BTreeMap<String, String>> = Vec::new();
    let elements = match value {
        None => &empty,
        Some(FieldValue::MapList(items)) => items,
        Some(_) => return canonical_list(value),
    };
    let mut keys: Vec<String> = elements
        .iter()
        .map(|entry| {
            entry
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(";")
        })
        .collect();
    keys.sort();
    keys
}
