//! Kind schemas
//!
//! A [`KindSchema`] is the static, declarative half of a resource kind's
//! capability: which field groups are compared and how, which fields
//! reference other resources, how provider status codes classify into
//! ready states, and where the external identifier comes from. The
//! imperative half (the provider client) is registered alongside it.

use crate::condition::ReadyClass;
use crate::ids::{FieldName, KindName};
use crate::record::DesiredRecord;
use crate::value::ParamSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a field group is compared between desired and observed state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparePolicy {
    /// Direct equality. With `empty_equals_unset`, an unset side equals an
    /// empty-default value on the other side (for providers that silently
    /// default unset fields).
    Scalar { empty_equals_unset: bool },
    /// Equality ignoring element order, natural string order as the sort
    /// key. Absent and empty collections are equal.
    UnorderedList,
    /// Equality ignoring element order for structured elements, with a
    /// composite key built from each element's sorted entries. Absent and
    /// empty collections are equal.
    UnorderedMapList,
}

/// One comparable field group of a kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldGroup {
    /// Parameter field this group covers.
    pub name: FieldName,

    /// Equality policy for the group.
    pub policy: ComparePolicy,

    /// Sub-types this group applies to; `None` means all. A restricted
    /// group is skipped entirely for records of any other sub-type.
    pub sub_types: Option<Vec<String>>,
}

impl FieldGroup {
    /// Scalar group compared by direct equality.
    pub fn scalar(name: impl Into<FieldName>) -> Self {
        Self {
            name: name.into(),
            policy: ComparePolicy::Scalar {
                empty_equals_unset: false,
            },
            sub_types: None,
        }
    }

    /// Scalar group for a field the provider silently defaults when unset.
    pub fn scalar_defaulted(name: impl Into<FieldName>) -> Self {
        Self {
            name: name.into(),
            policy: ComparePolicy::Scalar {
                empty_equals_unset: true,
            },
            sub_types: None,
        }
    }

    /// Order-insensitive string list group.
    pub fn unordered_list(name: impl Into<FieldName>) -> Self {
        Self {
            name: name.into(),
            policy: ComparePolicy::UnorderedList,
            sub_types: None,
        }
    }

    /// Order-insensitive structured list group.
    pub fn unordered_map_list(name: impl Into<FieldName>) -> Self {
        Self {
            name: name.into(),
            policy: ComparePolicy::UnorderedMapList,
            sub_types: None,
        }
    }

    /// Restrict this group to the given sub-types.
    pub fn only_for<I, S>(mut self, sub_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sub_types = Some(sub_types.into_iter().map(Into::into).collect());
        self
    }

    /// Whether the group applies to a record of `sub_type`. A restricted
    /// group never applies when the record's sub-type is unknown.
    pub fn applies_to(&self, sub_type: Option<&str>) -> bool {
        match &self.sub_types {
            None => true,
            Some(allowed) => {
                sub_type.is_some_and(|value| allowed.iter().any(|s| s == value))
            }
        }
    }
}

/// How a referenced candidate yields the value written into the referring
/// field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueExtractor {
    /// The candidate's external identifier.
    ExternalId,
    /// The candidate's record name.
    Name,
    /// A string parameter of the candidate.
    ParamField(FieldName),
    /// A string status field of the candidate.
    StatusField(FieldName),
}

impl ValueExtractor {
    /// Derive the referenced value from a candidate record, if the
    /// candidate can provide it yet.
    pub fn apply(&self, candidate: &DesiredRecord) -> Option<String> {
        match self {
            Self::ExternalId => candidate.external_id().map(|id| id.as_str().to_string()),
            Self::Name => Some(candidate.name.clone()),
            Self::ParamField(field) => candidate
                .parameters
                .get(field)
                .and_then(|v| v.as_str())
                .map(str::to_string),
            Self::StatusField(field) => candidate
                .status
                .fields
                .get(field)
                .and_then(|v| v.as_str())
                .map(str::to_string),
        }
        .filter(|value| !value.is_empty())
    }
}

/// A reference-typed field of a kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceSpec {
    /// Parameter field holding the resolved value(s).
    pub field: FieldName,

    /// Kind of the referenced resource.
    pub target_kind: KindName,

    /// Whether the field holds a list of values.
    pub multi: bool,

    /// How a matched candidate yields the field value.
    pub extract: ValueExtractor,
}

impl ReferenceSpec {
    pub fn single(
        field: impl Into<FieldName>,
        target_kind: KindName,
        extract: ValueExtractor,
    ) -> Self {
        Self {
            field: field.into(),
            target_kind,
            multi: false,
            extract,
        }
    }

    pub fn multi(
        field: impl Into<FieldName>,
        target_kind: KindName,
        extract: ValueExtractor,
    ) -> Self {
        Self {
            field: field.into(),
            target_kind,
            multi: true,
            extract,
        }
    }
}

/// The static description of one resource kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KindSchema {
    /// Kind name, the registry key.
    pub kind: KindName,

    /// Parameter field carrying the record's sub-type, when the kind has
    /// sub-type-restricted field groups.
    pub sub_type_field: Option<FieldName>,

    /// Comparable field groups, scanned in order by the diff engine.
    pub field_groups: Vec<FieldGroup>,

    /// Reference-typed fields.
    pub references: Vec<ReferenceSpec>,

    /// Provider status code classification.
    pub state_codes: BTreeMap<String, ReadyClass>,

    /// Whether the external identifier is the caller-chosen record name
    /// rather than provider-generated.
    pub external_id_from_name: bool,
}

impl KindSchema {
    pub fn new(kind: KindName) -> Self {
        Self {
            kind,
            sub_type_field: None,
            field_groups: Vec::new(),
            references: Vec::new(),
            state_codes: BTreeMap::new(),
            external_id_from_name: false,
        }
    }

    /// Builder-style sub-type field.
    pub fn with_sub_type_field(mut self, field: impl Into<FieldName>) -> Self {
        self.sub_type_field = Some(field.into());
        self
    }

    /// Builder-style field group.
    pub fn with_group(mut self, group: FieldGroup) -> Self {
        self.field_groups.push(group);
        self
    }

    /// Builder-style reference spec.
    pub fn with_reference(mut self, spec: ReferenceSpec) -> Self {
        self.references.push(spec);
        self
    }

    /// Builder-style status-code classification entry.
    pub fn with_state_code(mut self, code: impl Into<String>, class: ReadyClass) -> Self {
        self.state_codes.insert(code.into(), class);
        self
    }

    /// Adopt the record name as the external identifier.
    pub fn with_name_as_external_id(mut self) -> Self {
        self.external_id_from_name = true;
        self
    }

    /// Classify a provider status code; unmapped codes stay `Unknown`.
    pub fn classify_state(&self, code: &str) -> ReadyClass {
        self.state_codes
            .get(code)
            .copied()
            .unwrap_or(ReadyClass::Unknown)
    }

    /// Read the sub-type value out of a parameter bag.
    pub fn sub_type_of<'a>(&self, params: &'a ParamSet) -> Option<&'a str> {
        let field = self.sub_type_field.as_ref()?;
        params.get(field).and_then(|v| v.as_str())
    }

    /// The reference spec for a field, if the field is reference-typed.
    pub fn reference_for(&self, field: &str) -> Option<&ReferenceSpec> {
        self.references.iter().find(|spec| spec.field == field)
    }
}
