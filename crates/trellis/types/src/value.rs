//! Field values and parameter bags
//!
//! A [`ParamSet`] maps field names to typed values. A field that is absent
//! from the bag is *unset*, which is a different fact from a field holding
//! an empty collection: an absent list can be late-initialized from
//! observed state, an explicitly empty list means "no members".

use crate::ids::FieldName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single typed field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    /// Boolean flag.
    Bool(bool),
    /// Integer scalar (counts, ports, sizes).
    Int(i64),
    /// String scalar.
    Str(String),
    /// Ordered list of strings (membership lists, attachments).
    List(Vec<String>),
    /// List of string-to-string maps (structured elements such as
    /// zone/subnet mappings).
    MapList(Vec<BTreeMap<String, String>>),
}

impl FieldValue {
    /// Convenience constructor for string scalars.
    pub fn str(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }

    /// Convenience constructor for string lists.
    pub fn list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(values.into_iter().map(Into::into).collect())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map_list(&self) -> Option<&[BTreeMap<String, String>]> {
        match self {
            Self::MapList(items) => Some(items),
            _ => None,
        }
    }

    /// Whether this value is a collection (list-shaped) value.
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::List(_) | Self::MapList(_))
    }

    /// Whether this value equals the empty default a provider substitutes
    /// for an unset field: `false`, `0`, `""`, or an empty collection.
    pub fn is_empty_default(&self) -> bool {
        match self {
            Self::Bool(b) => !b,
            Self::Int(i) => *i == 0,
            Self::Str(s) => s.is_empty(),
            Self::List(items) => items.is_empty(),
            Self::MapList(items) => items.is_empty(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Str(s) => write!(f, "{}", s),
            Self::List(items) => write!(f, "[{}]", items.join(", ")),
            Self::MapList(items) => {
                let rendered: Vec<String> = items
                    .iter()
                    .map(|entry| {
                        let pairs: Vec<String> =
                            entry.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                        format!("{{{}}}", pairs.join(", "))
                    })
                    .collect();
                write!(f, "[{}]", rendered.join(", "))
            }
        }
    }
}

/// A bag of named field values.
///
/// Holds the caller-controlled parameters of a desired record, the
/// provider-shaped parameters of an observed record, and narrow update
/// payloads. Absence of a name means the field is unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamSet {
    fields: BTreeMap<FieldName, FieldValue>,
}

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion.
    pub fn with(mut self, name: impl Into<FieldName>, value: FieldValue) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn set(&mut self, name: impl Into<FieldName>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    /// Remove a field, returning it to the unset state.
    pub fn clear(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldName, &FieldValue)> {
        self.fields.iter()
    }
}

impl FromIterator<(FieldName, FieldValue)> for ParamSet {
    fn from_iter<I: IntoIterator<Item = (FieldName, FieldValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
