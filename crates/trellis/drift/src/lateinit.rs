//! Late initialization
//!
//! Fills caller-unset parameters from observed state so the declaration
//! converges on what the provider actually defaulted, without ever
//! overwriting explicit caller intent. A present-but-empty collection is
//! explicit intent ("no members") and is left alone; only an absent field
//! is filled.

use trellis_types::{FieldName, ParamSet};

/// Copy observed values into every unset desired parameter.
///
/// Returns the names of the fields that were filled; an empty list means
/// the desired parameters are unchanged. Set fields are never touched,
/// whatever the observed value is: a disagreement there is drift, which is
/// the diff engine's to report.
pub fn late_initialize(desired: &mut ParamSet, observed: &ParamSet) -> Vec<FieldName> {
    let mut filled = Vec::new();
    for (name, value) in observed.iter() {
        if desired.contains(name) {
            continue;
        }
        desired.set(name.clone(), value.clone());
        filled.push(name.clone());
    }
    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_types::FieldValue;

    #[test]
    fn test_fills_only_unset_fields() {
        let mut desired = ParamSet::new().with("scheme", FieldValue::str("internal"));
        let observed = ParamSet::new()
            .with("scheme", FieldValue::str("internet-facing"))
            .with("ip_address_type", FieldValue::str("ipv4"));

        let filled = late_initialize(&mut desired, &observed);

        assert_eq!(filled, vec!["ip_address_type".to_string()]);
        // Explicit caller intent survives, even when it mismatches.
        assert_eq!(
            desired.get("scheme"),
            Some(&FieldValue::str("internal"))
        );
        assert_eq!(
            desired.get("ip_address_type"),
            Some(&FieldValue::str("ipv4"))
        );
    }

    #[test]
    fn test_absent_collection_is_filled() {
        let mut desired = ParamSet::new();
        let observed = ParamSet::new().with("security_groups", FieldValue::list(["sg-1"]));

        let filled = late_initialize(&mut desired, &observed);
        assert_eq!(filled, vec!["security_groups".to_string()]);
        assert_eq!(
            desired.get("security_groups"),
            Some(&FieldValue::list(["sg-1"]))
        );
    }

    #[test]
    fn test_explicitly_empty_collection_is_kept() {
        let mut desired = ParamSet::new().with("security_groups", FieldValue::List(vec![]));
        let observed = ParamSet::new().with("security_groups", FieldValue::list(["sg-1"]));

        let filled = late_initialize(&mut desired, &observed);
        assert!(filled.is_empty());
        assert_eq!(
            desired.get("security_groups"),
            Some(&FieldValue::List(vec![]))
        );
    }

    #[test]
    fn test_nothing_observed_changes_nothing() {
        let mut desired = ParamSet::new().with("scheme", FieldValue::str("internal"));
        let filled = late_initialize(&mut desired, &ParamSet::new());
        assert!(filled.is_empty());
        assert_eq!(desired.len(), 1);
    }
}
