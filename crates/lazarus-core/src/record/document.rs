use crate::value::Value;
use derive_more::{Deref, IntoIterator};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

///
/// Document
///
/// User-visible fields of one record, keyed by field name.
/// Dotted paths descend through nested maps; a list met on the way is
/// fanned out so each element is descended into.
///

#[derive(Clone, Debug, Default, Deref, Deserialize, IntoIterator, PartialEq, Serialize)]
#[into_iterator(owned, ref)]
#[serde(transparent)]
pub struct Document(BTreeMap<String, Value>);

impl Document {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of a top-level field.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    /// Resolve a dotted path to every value it reaches.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Vec<&Value> {
        let mut segments = path.split('.');
        let Some(first) = segments.next() else {
            return Vec::new();
        };

        let mut current: Vec<&Value> = self.0.get(first).into_iter().collect();
        for segment in segments {
            let mut next = Vec::new();
            for value in current {
                descend(value, segment, &mut next);
            }
            current = next;
        }

        current
    }

    /// Set a dotted path, creating intermediate maps as needed.
    pub fn set_path(&mut self, path: &str, value: Value) {
        let mut segments: Vec<&str> = path.split('.').collect();
        let Some(leaf) = segments.pop() else {
            return;
        };

        let mut map = &mut self.0;
        for segment in segments {
            let slot = map
                .entry(segment.to_string())
                .or_insert_with(|| Value::Map(BTreeMap::new()));
            if !matches!(slot, Value::Map(_)) {
                *slot = Value::Map(BTreeMap::new());
            }
            let Value::Map(inner) = slot else {
                return;
            };
            map = inner;
        }

        map.insert(leaf.to_string(), value);
    }

    /// Remove a dotted path if it is reachable through maps.
    pub fn unset_path(&mut self, path: &str) {
        let mut segments: Vec<&str> = path.split('.').collect();
        let Some(leaf) = segments.pop() else {
            return;
        };

        let mut map = &mut self.0;
        for segment in segments {
            match map.get_mut(segment) {
                Some(Value::Map(inner)) => map = inner,
                _ => return,
            }
        }

        map.remove(leaf);
    }

    /// Keep only the named top-level fields (the first segment of each path).
    #[must_use]
    pub fn project(&self, fields: &[String]) -> Self {
        let keep: Vec<&str> = fields
            .iter()
            .map(|f| f.split('.').next().unwrap_or(f))
            .collect();

        Self(
            self.0
                .iter()
                .filter(|(name, _)| keep.contains(&name.as_str()))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

fn descend<'a>(value: &'a Value, segment: &str, out: &mut Vec<&'a Value>) {
    match value {
        Value::Map(map) => {
            if let Some(child) = map.get(segment) {
                out.push(child);
            }
        }
        Value::List(items) => {
            for item in items {
                descend(item, segment, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> Document {
        let line = |sku: &str| {
            Value::Map(BTreeMap::from([("sku".to_string(), Value::from(sku))]))
        };

        Document::new()
            .with("lines", Value::List(vec![line("a"), line("b")]))
            .with(
                "meta",
                Value::Map(BTreeMap::from([("tag".to_string(), Value::from("x"))])),
            )
    }

    #[test]
    fn resolve_fans_out_through_lists() {
        let doc = order();

        assert_eq!(
            doc.resolve("lines.sku"),
            vec![&Value::from("a"), &Value::from("b")]
        );
        assert_eq!(doc.resolve("meta.tag"), vec![&Value::from("x")]);
        assert!(doc.resolve("meta.none").is_empty());
    }

    #[test]
    fn set_and_unset_nested_paths() {
        let mut doc = order();
        doc.set_path("meta.flag", Value::Bool(true));
        doc.set_path("fresh.deep.leaf", Value::Int(1));

        assert_eq!(doc.resolve("meta.flag"), vec![&Value::Bool(true)]);
        assert_eq!(doc.resolve("fresh.deep.leaf"), vec![&Value::Int(1)]);

        doc.unset_path("meta.tag");
        assert!(doc.resolve("meta.tag").is_empty());
    }

    #[test]
    fn project_keeps_named_roots() {
        let doc = order().project(&["meta.tag".to_string()]);

        assert!(doc.get("meta").is_some());
        assert!(doc.get("lines").is_none());
    }
}
