
use crate::types::{RecordId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ulid::Ulid;

///
/// Value
///
/// Dynamic field value stored in a document.
///
/// Null → the field is explicitly null.
/// Map  → nested sub-document; keys are field names.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Ulid(Ulid),
    Timestamp(Timestamp),
    /// Ordered list of values; order is preserved.
    List(Vec<Self>),
    /// Nested document.
    Map(BTreeMap<String, Self>),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Equality with document-store semantics: a stored value matches a
    /// candidate when equal, or when it is a list containing the candidate.
    #[must_use]
    pub fn matches_eq(&self, candidate: &Self) -> bool {
        if self == candidate {
            return true;
        }

        match self {
            Self::List(items) => items.iter().any(|item| item == candidate),
            _ => false,
        }
    }

    /// Collect every record identifier held by this value.
    /// Text values are accepted when they parse as a ULID.
    #[must_use]
    pub fn record_ids(&self) -> Vec<RecordId> {
        let mut out = Vec::new();
        self.collect_record_ids(&mut out);
        out
    }

    fn collect_record_ids(&self, out: &mut Vec<RecordId>) {
        match self {
            Self::Ulid(ulid) => out.push(RecordId::from_ulid(*ulid)),
            Self::Text(text) => {
                if let Ok(id) = text.parse::<RecordId>() {
                    out.push(id);
                }
            }
            Self::List(items) => {
                for item in items {
                    item.collect_record_ids(out);
                }
            }
            _ => {}
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Ulid> for Value {
    fn from(v: Ulid) -> Self {
        Self::Ulid(v)
    }
}

impl From<RecordId> for Value {
    fn from(v: RecordId) -> Self {
        Self::Ulid(v.as_ulid())
    }
}

impl From<Timestamp> for Value {
    fn from(v: Timestamp) -> Self {
        Self::Timestamp(v)
    }
}

impl<T: Into<Self>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}
