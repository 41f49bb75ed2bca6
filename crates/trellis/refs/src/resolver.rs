//! The resolution pass
//!
//! For each reference-typed field of a record's kind, the first of these
//! that applies wins: a literal value already in the parameter bag (never
//! overwritten once set), an explicit named reference, then a label
//! selector. Every field is computed before any is written back, so a
//! failure on one field leaves the whole record untouched.

use crate::error::{ResolveError, Result};
use crate::source::CandidateSource;
use std::sync::Arc;
use trellis_types::{
    DesiredRecord, FieldName, FieldValue, KindSchema, RecordRef, ReferenceBinding, ReferenceSpec,
    Selector,
};

/// One staged field resolution, held back until every field has resolved.
struct Resolved {
    value: FieldValue,
    matched: Vec<RecordRef>,
}

/// Resolves the reference fields of desired records against a candidate
/// source.
pub struct Resolver {
    source: Arc<dyn CandidateSource>,
}

impl Resolver {
    pub fn new(source: Arc<dyn CandidateSource>) -> Self {
        Self { source }
    }

    /// Resolve every reference field of `record`: write resolved values
    /// into its parameter bag and remember the matched references on the
    /// bindings. Returns the fields whose value changed; re-running a
    /// successful resolution changes nothing.
    pub async fn resolve_record(
        &self,
        schema: &KindSchema,
        record: &mut DesiredRecord,
    ) -> Result<Vec<FieldName>> {
        // 1. Compute every resolution without touching the record, so a
        //    failure in a later field leaves earlier fields unwritten.
        let mut staged = Vec::new();
        for spec in &schema.references {
            let resolved = if spec.multi {
                self.resolve_multi(spec, record).await?
            } else {
                self.resolve_single(spec, record).await?
            };
            if let Some(resolved) = resolved {
                staged.push((spec.field.clone(), resolved));
            }
        }

        // 2. Apply the staged values and remember the matches.
        let mut changed = Vec::new();
        for (field, resolved) in staged {
            if record.parameters.get(&field) != Some(&resolved.value) {
                changed.push(field.clone());
            }
            record.parameters.set(field.clone(), resolved.value);
            if let Some(binding) = record.references.get_mut(&field) {
                match binding {
                    ReferenceBinding::Single { reference, .. } => {
                        *reference = resolved.matched.into_iter().next();
                    }
                    ReferenceBinding::Multi { references, .. } => {
                        *references = resolved.matched;
                    }
                }
            }
        }
        Ok(changed)
    }

    async fn resolve_single(
        &self,
        spec: &ReferenceSpec,
        record: &DesiredRecord,
    ) -> Result<Option<Resolved>> {
        if has_scalar_value(record, &spec.field) {
            return Ok(None);
        }

        let (reference, selector) = match record.references.get(&spec.field) {
            Some(ReferenceBinding::Single {
                reference,
                selector,
            }) => (reference, selector),
            _ => return Ok(None),
        };

        if let Some(reference) = reference {
            let value = self.value_of(spec, &reference.name).await?;
            return Ok(Some(Resolved {
                value: FieldValue::Str(value),
                matched: vec![reference.clone()],
            }));
        }

        if let Some(selector) = selector {
            let mut matches = self.matching_candidates(spec, selector).await?;
            match matches.len() {
                0 => Err(ResolveError::NoMatchingCandidate {
                    field: spec.field.clone(),
                    kind: spec.target_kind.clone(),
                }),
                1 => {
                    let (name, value) = matches.remove(0);
                    Ok(Some(Resolved {
                        value: FieldValue::Str(value),
                        matched: vec![RecordRef::new(name)],
                    }))
                }
                n => Err(ResolveError::AmbiguousSelector {
                    field: spec.field.clone(),
                    kind: spec.target_kind.clone(),
                    matches: n,
                }),
            }
        } else {
            Ok(None)
        }
    }

    async fn resolve_multi(
        &self,
        spec: &ReferenceSpec,
        record: &DesiredRecord,
    ) -> Result<Option<Resolved>> {
        if has_list_value(record, &spec.field) {
            return Ok(None);
        }

        let (references, selector) = match record.references.get(&spec.field) {
            Some(ReferenceBinding::Multi {
                references,
                selector,
            }) => (references, selector),
            _ => return Ok(None),
        };

        if !references.is_empty() {
            // One value per declared reference, in declaration order.
            let mut values = Vec::with_capacity(references.len());
            for reference in references {
                values.push(self.value_of(spec, &reference.name).await?);
            }
            return Ok(Some(Resolved {
                value: FieldValue::List(values),
                matched: references.clone(),
            }));
        }

        if let Some(selector) = selector {
            let matches = self.matching_candidates(spec, selector).await?;
            if matches.is_empty() {
                return Err(ResolveError::NoMatchingCandidate {
                    field: spec.field.clone(),
                    kind: spec.target_kind.clone(),
                });
            }
            let matched = matches
                .iter()
                .map(|(name, _)| RecordRef::new(name.clone()))
                .collect();
            let values = matches.into_iter().map(|(_, value)| value).collect();
            Ok(Some(Resolved {
                value: FieldValue::List(values),
                matched,
            }))
        } else {
            Ok(None)
        }
    }

    /// The referenced value of the named candidate. A candidate that does
    /// not exist and one that cannot provide its value yet resolve the
    /// same way: not found.
    async fn value_of(&self, spec: &ReferenceSpec, name: &str) -> Result<String> {
        let value = self
            .source
            .get(&spec.target_kind, name)
            .await?
            .and_then(|candidate| spec.extract.apply(&candidate));
        value.ok_or_else(|| ResolveError::ReferenceNotFound {
            field: spec.field.clone(),
            kind: spec.target_kind.clone(),
            name: name.to_string(),
        })
    }

    /// Selector matches that can already provide a value, sorted by name.
    async fn matching_candidates(
        &self,
        spec: &ReferenceSpec,
        selector: &Selector,
    ) -> Result<Vec<(String, String)>> {
        let mut matches: Vec<(String, String)> = self
            .source
            .list(&spec.target_kind)
            .await?
            .into_iter()
            .filter(|candidate| selector.matches(&candidate.labels))
            .filter_map(|candidate| {
                spec.extract
                    .apply(&candidate)
                    .map(|value| (candidate.name, value))
            })
            .collect();
        matches.sort();
        Ok(matches)
    }
}

fn has_scalar_value(record: &DesiredRecord, field: &str) -> bool {
    record
        .parameters
        .get(field)
        .and_then(FieldValue::as_str)
        .is_some_and(|value| !value.is_empty())
}

fn has_list_value(record: &DesiredRecord, field: &str) -> bool {
    record
        .parameters
        .get(field)
        .and_then(FieldValue::as_list)
        .is_some_and(|values| !values.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemoryCandidateSource;
    use trellis_types::{ExternalId, KindName, ValueExtractor};

    fn network_schema() -> KindSchema {
        KindSchema::new(KindName::new("load_balancer"))
            .with_reference(ReferenceSpec::single(
                "vpc_id",
                KindName::new("vpc"),
                ValueExtractor::ExternalId,
            ))
            .with_reference(ReferenceSpec::multi(
                "subnet_ids",
                KindName::new("subnet"),
                ValueExtractor::ExternalId,
            ))
    }

    fn candidate(kind: &str, name: &str, external_id: Option<&str>) -> DesiredRecord {
        let mut record = DesiredRecord::new(KindName::new(kind), name);
        if let Some(id) = external_id {
            record.assign_external_id(ExternalId::new(id)).unwrap();
        }
        record
    }

    fn resolver_with(records: Vec<DesiredRecord>) -> Resolver {
        let source = InMemoryCandidateSource::new();
        for record in records {
            source.insert(record);
        }
        Resolver::new(Arc::new(source))
    }

    #[tokio::test]
    async fn test_literal_value_wins() {
        // The explicit reference points nowhere, but the literal value is
        // already set, so resolution never looks at it.
        let resolver = resolver_with(vec![]);
        let mut record = DesiredRecord::new(KindName::new("load_balancer"), "edge")
            .with_parameter("vpc_id", FieldValue::str("vpc-explicit"))
            .with_reference("vpc_id", ReferenceBinding::to_record("missing"));

        let changed = resolver
            .resolve_record(&network_schema(), &mut record)
            .await
            .unwrap();

        assert!(changed.is_empty());
        assert_eq!(
            record.parameters.get("vpc_id"),
            Some(&FieldValue::str("vpc-explicit"))
        );
    }

    #[tokio::test]
    async fn test_explicit_reference_resolves() {
        let resolver = resolver_with(vec![candidate("vpc", "main", Some("vpc-123"))]);
        let mut record = DesiredRecord::new(KindName::new("load_balancer"), "edge")
            .with_reference("vpc_id", ReferenceBinding::to_record("main"));

        let changed = resolver
            .resolve_record(&network_schema(), &mut record)
            .await
            .unwrap();

        assert_eq!(changed, vec!["vpc_id".to_string()]);
        assert_eq!(
            record.parameters.get("vpc_id"),
            Some(&FieldValue::str("vpc-123"))
        );
    }

    #[tokio::test]
    async fn test_missing_reference_fails() {
        let resolver = resolver_with(vec![]);
        let mut record = DesiredRecord::new(KindName::new("load_balancer"), "edge")
            .with_reference("vpc_id", ReferenceBinding::to_record("missing"));

        let err = resolver
            .resolve_record(&network_schema(), &mut record)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ResolveError::ReferenceNotFound { field, name, .. }
                if field == "vpc_id" && name == "missing"
        ));
    }

    #[tokio::test]
    async fn test_reference_to_uncreated_candidate_fails() {
        // The record exists but carries no external identifier yet, so it
        // cannot provide a value.
        let resolver = resolver_with(vec![candidate("vpc", "main", None)]);
        let mut record = DesiredRecord::new(KindName::new("load_balancer"), "edge")
            .with_reference("vpc_id", ReferenceBinding::to_record("main"));

        let err = resolver
            .resolve_record(&network_schema(), &mut record)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::ReferenceNotFound { .. }));
    }

    #[tokio::test]
    async fn test_failure_leaves_record_untouched() {
        // The vpc field would resolve, but the subnet field fails; nothing
        // may be written.
        let resolver = resolver_with(vec![candidate("vpc", "main", Some("vpc-123"))]);
        let mut record = DesiredRecord::new(KindName::new("load_balancer"), "edge")
            .with_reference("vpc_id", ReferenceBinding::to_record("main"))
            .with_reference("subnet_ids", ReferenceBinding::to_records(["absent"]));

        let err = resolver
            .resolve_record(&network_schema(), &mut record)
            .await
            .unwrap_err();

        assert!(matches!(err, ResolveError::ReferenceNotFound { .. }));
        assert!(record.parameters.get("vpc_id").is_none());
    }

    #[tokio::test]
    async fn test_selector_needs_exactly_one_match() {
        let selector = Selector::new().with_label("env", "prod");

        let resolver = resolver_with(vec![candidate("vpc", "main", Some("vpc-123"))]);
        let mut record = DesiredRecord::new(KindName::new("load_balancer"), "edge")
            .with_reference("vpc_id", ReferenceBinding::to_selector(selector.clone()));
        let err = resolver
            .resolve_record(&network_schema(), &mut record)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::NoMatchingCandidate { .. }));

        let resolver = resolver_with(vec![
            candidate("vpc", "a", Some("vpc-a")).with_label("env", "prod"),
            candidate("vpc", "b", Some("vpc-b")).with_label("env", "prod"),
        ]);
        let mut record = DesiredRecord::new(KindName::new("load_balancer"), "edge")
            .with_reference("vpc_id", ReferenceBinding::to_selector(selector));
        let err = resolver
            .resolve_record(&network_schema(), &mut record)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::AmbiguousSelector { matches: 2, .. }
        ));
    }

    #[tokio::test]
    async fn test_selector_skips_candidates_without_a_value() {
        // Both carry the label, but only one has an identifier to offer.
        let resolver = resolver_with(vec![
            candidate("vpc", "ready", Some("vpc-123")).with_label("env", "prod"),
            candidate("vpc", "pending", None).with_label("env", "prod"),
        ]);
        let mut record = DesiredRecord::new(KindName::new("load_balancer"), "edge")
            .with_reference(
                "vpc_id",
                ReferenceBinding::to_selector(Selector::new().with_label("env", "prod")),
            );

        let changed = resolver
            .resolve_record(&network_schema(), &mut record)
            .await
            .unwrap();

        assert_eq!(changed, vec!["vpc_id".to_string()]);
        assert_eq!(
            record.parameters.get("vpc_id"),
            Some(&FieldValue::str("vpc-123"))
        );
    }

    #[tokio::test]
    async fn test_selector_match_is_remembered() {
        let resolver = resolver_with(vec![
            candidate("vpc", "main", Some("vpc-123")).with_label("env", "prod")
        ]);
        let mut record = DesiredRecord::new(KindName::new("load_balancer"), "edge")
            .with_reference(
                "vpc_id",
                ReferenceBinding::to_selector(Selector::new().with_label("env", "prod")),
            );

        resolver
            .resolve_record(&network_schema(), &mut record)
            .await
            .unwrap();

        match record.references.get("vpc_id") {
            Some(ReferenceBinding::Single {
                reference: Some(reference),
                selector: Some(_),
            }) => assert_eq!(reference.name, "main"),
            other => panic!("unexpected binding after resolution: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_multi_explicit_preserves_declaration_order() {
        let resolver = resolver_with(vec![
            candidate("subnet", "alpha", Some("subnet-a")),
            candidate("subnet", "beta", Some("subnet-b")),
        ]);
        let mut record = DesiredRecord::new(KindName::new("load_balancer"), "edge")
            .with_reference("subnet_ids", ReferenceBinding::to_records(["beta", "alpha"]));

        let changed = resolver
            .resolve_record(&network_schema(), &mut record)
            .await
            .unwrap();

        assert_eq!(changed, vec!["subnet_ids".to_string()]);
        assert_eq!(
            record.parameters.get("subnet_ids"),
            Some(&FieldValue::list(["subnet-b", "subnet-a"]))
        );
    }

    #[tokio::test]
    async fn test_multi_selector_collects_matches_sorted() {
        let resolver = resolver_with(vec![
            candidate("subnet", "zone-b", Some("subnet-b")).with_label("tier", "private"),
            candidate("subnet", "zone-a", Some("subnet-a")).with_label("tier", "private"),
            candidate("subnet", "zone-c", Some("subnet-c")).with_label("tier", "public"),
        ]);
        let mut record = DesiredRecord::new(KindName::new("load_balancer"), "edge")
            .with_reference(
                "subnet_ids",
                ReferenceBinding::to_all_matching(Selector::new().with_label("tier", "private")),
            );

        resolver
            .resolve_record(&network_schema(), &mut record)
            .await
            .unwrap();

        assert_eq!(
            record.parameters.get("subnet_ids"),
            Some(&FieldValue::list(["subnet-a", "subnet-b"]))
        );
        match record.references.get("subnet_ids") {
            Some(ReferenceBinding::Multi { references, .. }) => {
                let names: Vec<&str> =
                    references.iter().map(|r| r.name.as_str()).collect();
                assert_eq!(names, vec!["zone-a", "zone-b"]);
            }
            other => panic!("unexpected binding after resolution: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_multi_selector_with_no_matches_fails() {
        let resolver = resolver_with(vec![]);
        let mut record = DesiredRecord::new(KindName::new("load_balancer"), "edge")
            .with_reference(
                "subnet_ids",
                ReferenceBinding::to_all_matching(Selector::new().with_label("tier", "private")),
            );

        let err = resolver
            .resolve_record(&network_schema(), &mut record)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::NoMatchingCandidate { field, .. } if field == "subnet_ids"
        ));
    }

    #[tokio::test]
    async fn test_re_resolution_reports_no_change() {
        let resolver = resolver_with(vec![candidate("vpc", "main", Some("vpc-123"))]);
        let mut record = DesiredRecord::new(KindName::new("load_balancer"), "edge")
            .with_reference("vpc_id", ReferenceBinding::to_record("main"));

        let first = resolver
            .resolve_record(&network_schema(), &mut record)
            .await
            .unwrap();
        assert_eq!(first.len(), 1);

        let second = resolver
            .resolve_record(&network_schema(), &mut record)
            .await
            .unwrap();
        assert!(second.is_empty());
    }
}
