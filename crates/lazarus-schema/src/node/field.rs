use serde::{Deserialize, Serialize};

///
/// FieldDef
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldDef {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

///
/// FieldKind
///
/// Declared shape of one field. Only reference fields carry graph meaning;
/// scalar kinds are kept so path validation can tell a reference from data.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    Bool,
    Int,
    Float,
    Text,
    Ulid,
    Timestamp,

    /// Closed set of text values.
    Enum(Vec<String>),

    /// Reference to a record of another type.
    Reference(RefTarget),

    List(Box<Self>),
    Object(Vec<FieldDef>),
}

impl FieldKind {
    #[must_use]
    pub fn reference(target: impl Into<String>) -> Self {
        Self::Reference(RefTarget::Type(target.into()))
    }

    /// Reference whose target type is read from a sibling enum field.
    #[must_use]
    pub fn dynamic_reference(discriminator: impl Into<String>) -> Self {
        Self::Reference(RefTarget::Enum {
            field: discriminator.into(),
        })
    }

    #[must_use]
    pub fn list(item: Self) -> Self {
        Self::List(Box::new(item))
    }

    /// Return the reference target when this kind holds one or many references.
    #[must_use]
    pub fn reference_target(&self) -> Option<&RefTarget> {
        match self {
            Self::Reference(target) => Some(target),
            Self::List(item) => item.reference_target(),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_reference(&self) -> bool {
        self.reference_target().is_some()
    }

    /// Child fields when a path may descend through this kind.
    #[must_use]
    pub fn children(&self) -> Option<&[FieldDef]> {
        match self {
            Self::Object(fields) => Some(fields),
            Self::List(item) => item.children(),
            _ => None,
        }
    }
}

///
/// RefTarget
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RefTarget {
    /// Statically named target type.
    Type(String),

    /// Target type is the value of a sibling enum field.
    Enum { field: String },
}

/// Resolve a dotted path against a field list, descending through objects
/// and lists of objects.
#[must_use]
pub fn lookup_path<'a>(fields: &'a [FieldDef], path: &str) -> Option<&'a FieldDef> {
    let mut current = fields;
    let mut segments = path.split('.').peekable();

    while let Some(segment) = segments.next() {
        let field = current.iter().find(|f| f.name == segment)?;
        if segments.peek().is_none() {
            return Some(field);
        }
        current = field.kind.children()?;
    }

    None
}

/// Resolve the sibling list that contains the last segment of `path`.
#[must_use]
pub fn lookup_siblings<'a>(fields: &'a [FieldDef], path: &str) -> Option<&'a [FieldDef]> {
    match path.rsplit_once('.') {
        None => Some(fields),
        Some((parent, _)) => lookup_path(fields, parent)?.kind.children(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> Vec<FieldDef> {
        vec![
            FieldDef::new("name", FieldKind::Text),
            FieldDef::new("owner", FieldKind::reference("User")),
            FieldDef::new(
                "items",
                FieldKind::list(FieldKind::Object(vec![
                    FieldDef::new("kind", FieldKind::Enum(vec!["Product".into()])),
                    FieldDef::new("item", FieldKind::dynamic_reference("kind")),
                ])),
            ),
        ]
    }

    #[test]
    fn lookup_descends_through_list_of_objects() {
        let fields = fields();
        let field = lookup_path(&fields, "items.item").expect("nested path should resolve");

        assert_eq!(field.name, "item");
        assert!(field.kind.is_reference());
    }

    #[test]
    fn lookup_rejects_descent_into_scalar() {
        let fields = fields();

        assert!(lookup_path(&fields, "name.first").is_none());
        assert!(lookup_path(&fields, "missing").is_none());
    }

    #[test]
    fn siblings_resolve_to_parent_object() {
        let fields = fields();
        let siblings = lookup_siblings(&fields, "items.item").expect("parent should resolve");

        assert!(siblings.iter().any(|f| f.name == "kind"));
    }

    #[test]
    fn reference_target_sees_through_lists() {
        let kind = FieldKind::list(FieldKind::reference("Tag"));

        assert_eq!(
            kind.reference_target(),
            Some(&RefTarget::Type("Tag".to_string()))
        );
    }
}
