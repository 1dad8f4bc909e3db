use crate::{record::Record, value::Value};
use std::ops::{BitAnd, BitOr};

///
/// Filter
///
/// Schema-agnostic predicate handed to the persistence layer.
///
/// Equality follows document-store semantics: a stored list matches a
/// candidate it contains, and `Eq(path, Null)` also matches a missing path.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    True,
    False,
    And(Vec<Self>),
    Or(Vec<Self>),
    Not(Box<Self>),
    Eq { path: String, value: Value },
    Ne { path: String, value: Value },
    In { path: String, values: Vec<Value> },
    Exists { path: String },
}

impl Filter {
    #[must_use]
    pub const fn and(filters: Vec<Self>) -> Self {
        Self::And(filters)
    }

    #[must_use]
    pub const fn or(filters: Vec<Self>) -> Self {
        Self::Or(filters)
    }

    #[expect(clippy::should_implement_trait)]
    #[must_use]
    pub fn not(filter: Self) -> Self {
        Self::Not(Box::new(filter))
    }

    #[must_use]
    pub fn eq(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            path: path.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn ne(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Ne {
            path: path.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn in_<I, V>(path: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::In {
            path: path.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn exists(path: impl Into<String>) -> Self {
        Self::Exists { path: path.into() }
    }

    /// Whether this filter constrains `path` anywhere in its tree.
    #[must_use]
    pub fn mentions(&self, path: &str) -> bool {
        match self {
            Self::True | Self::False => false,
            Self::And(filters) | Self::Or(filters) => filters.iter().any(|f| f.mentions(path)),
            Self::Not(inner) => inner.mentions(path),
            Self::Eq { path: p, .. }
            | Self::Ne { path: p, .. }
            | Self::In { path: p, .. }
            | Self::Exists { path: p } => p == path,
        }
    }

    /// Evaluate against one record.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Self::True => true,
            Self::False => false,
            Self::And(filters) => filters.iter().all(|f| f.matches(record)),
            Self::Or(filters) => filters.iter().any(|f| f.matches(record)),
            Self::Not(inner) => !inner.matches(record),
            Self::Eq { path, value } => eq_matches(record, path, value),
            Self::Ne { path, value } => !eq_matches(record, path, value),
            Self::In { path, values } => values.iter().any(|v| eq_matches(record, path, v)),
            Self::Exists { path } => !record.resolve(path).is_empty(),
        }
    }
}

fn eq_matches(record: &Record, path: &str, candidate: &Value) -> bool {
    let resolved = record.resolve(path);
    if resolved.is_empty() {
        return candidate.is_null();
    }

    resolved.iter().any(|stored| stored.matches_eq(candidate))
}

impl BitAnd for Filter {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self::And(vec![self, rhs])
    }
}

impl BitOr for Filter {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self::Or(vec![self, rhs])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        record::{DELETED_PATH, Document, ID_PATH},
        types::RecordId,
    };

    fn post(tags: Vec<&str>) -> Record {
        Record::new(
            "Post",
            Document::new().with("title", "hello").with("tags", tags),
        )
        .with_id(RecordId::generate())
    }

    #[test]
    fn eq_matches_list_members() {
        let record = post(vec!["rust", "db"]);

        assert!(Filter::eq("tags", "db").matches(&record));
        assert!(!Filter::eq("tags", "go").matches(&record));
        assert!(Filter::ne("tags", "go").matches(&record));
    }

    #[test]
    fn null_equality_matches_missing_paths() {
        let record = post(vec![]);

        assert!(Filter::eq("subtitle", Value::Null).matches(&record));
        assert!(!Filter::exists("subtitle").matches(&record));
        assert!(Filter::exists("title").matches(&record));
    }

    #[test]
    fn reserved_paths_are_addressable() {
        let record = post(vec![]);
        let id = record.id().expect("fixture has an id");

        assert!(Filter::eq(ID_PATH, id).matches(&record));
        assert!(Filter::eq(DELETED_PATH, false).matches(&record));
        assert!(Filter::in_(DELETED_PATH, [true, false]).matches(&record));
    }

    #[test]
    fn boolean_composition() {
        let record = post(vec!["rust"]);
        let both = Filter::eq("title", "hello") & Filter::eq("tags", "rust");
        let either = Filter::eq("title", "nope") | Filter::eq("tags", "rust");

        assert!(both.matches(&record));
        assert!(either.matches(&record));
        assert!(!Filter::not(both).matches(&record));
        assert!(!Filter::Or(Vec::new()).matches(&record));
        assert!(Filter::And(Vec::new()).matches(&record));
    }

    #[test]
    fn mentions_walks_the_whole_tree() {
        let filter = Filter::eq("a", 1) & Filter::not(Filter::exists(DELETED_PATH));

        assert!(filter.mentions(DELETED_PATH));
        assert!(filter.mentions("a"));
        assert!(!filter.mentions("b"));
    }
}
