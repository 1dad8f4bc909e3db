use crate::{db::filter::Filter, types::RecordId, value::Value};
use lazarus_schema::node::{FieldDef, FieldKind, RefTarget, TypeDef};

///
/// ReferenceEdge
///
/// `source_type --field_path--> target_type`, derived from one reference
/// field. An enum-resolved field yields one edge per enum value, each
/// carrying the discriminator path that selects it.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReferenceEdge {
    pub source_type: String,
    pub field_path: String,
    pub target_type: String,
    pub discriminator: Option<String>,
}

impl ReferenceEdge {
    /// Filter matching source records that point at `id` through this edge.
    #[must_use]
    pub fn filter(&self, id: RecordId) -> Filter {
        let refers = references(&self.field_path, id);

        match &self.discriminator {
            Some(path) => refers & Filter::eq(path.as_str(), self.target_type.as_str()),
            None => refers,
        }
    }
}

/// Filter matching records whose `path` holds `id`, stored either as a ULID
/// or as its text form.
#[must_use]
pub fn references(path: &str, id: RecordId) -> Filter {
    Filter::in_(path, [Value::from(id), Value::Text(id.to_string())])
}

///
/// LocalTarget
///
/// Where the records behind one of a type's own reference paths live.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LocalTarget {
    Static(String),
    Dynamic {
        discriminator: String,
        candidates: Vec<String>,
    },
}

impl LocalTarget {
    /// Every type name this target may resolve to.
    #[must_use]
    pub fn candidates(&self) -> Vec<&str> {
        match self {
            Self::Static(name) => vec![name.as_str()],
            Self::Dynamic { candidates, .. } => candidates.iter().map(String::as_str).collect(),
        }
    }
}

/// Derive every outgoing reference edge declared by `def`.
#[must_use]
pub fn derive_edges(def: &TypeDef) -> Vec<ReferenceEdge> {
    let mut edges = Vec::new();
    walk(def, &def.fields, "", &mut |path: &str, target: LocalTarget| match target {
        LocalTarget::Static(target_type) => edges.push(ReferenceEdge {
            source_type: def.name.clone(),
            field_path: path.to_string(),
            target_type,
            discriminator: None,
        }),
        LocalTarget::Dynamic {
            discriminator,
            candidates,
        } => {
            for target_type in candidates {
                edges.push(ReferenceEdge {
                    source_type: def.name.clone(),
                    field_path: path.to_string(),
                    target_type,
                    discriminator: Some(discriminator.clone()),
                });
            }
        }
    });

    edges
}

/// Resolve the reference target of one dotted path on `def`.
#[must_use]
pub fn local_target(def: &TypeDef, path: &str) -> Option<LocalTarget> {
    let mut found = None;
    walk(def, &def.fields, "", &mut |p: &str, target: LocalTarget| {
        if p == path {
            found = Some(target);
        }
    });

    found
}

fn walk(
    def: &TypeDef,
    fields: &[FieldDef],
    prefix: &str,
    visit: &mut dyn FnMut(&str, LocalTarget),
) {
    for field in fields {
        let path = join(prefix, &field.name);

        match field.kind.reference_target() {
            Some(RefTarget::Type(target)) => visit(&path, LocalTarget::Static(target.clone())),
            Some(RefTarget::Enum { field: sibling }) => {
                let values = fields.iter().find_map(|f| match &f.kind {
                    FieldKind::Enum(values) if &f.name == sibling => Some(values.clone()),
                    _ => None,
                });
                if let Some(candidates) = values {
                    visit(
                        &path,
                        LocalTarget::Dynamic {
                            discriminator: join(prefix, sibling),
                            candidates,
                        },
                    );
                }
            }
            None => {
                if let Some(children) = field.kind.children() {
                    walk(def, children, &path, visit);
                }
            }
        }
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Document, Record};

    fn comment() -> TypeDef {
        TypeDef::new("Comment")
            .field("author", FieldKind::reference("User"))
            .field("mentions", FieldKind::list(FieldKind::reference("User")))
            .field(
                "subject",
                FieldKind::Object(vec![
                    FieldDef::new("kind", FieldKind::Enum(vec!["Post".into(), "Shop".into()])),
                    FieldDef::new("id", FieldKind::dynamic_reference("kind")),
                ]),
            )
    }

    #[test]
    fn derives_static_list_and_enum_edges() {
        let edges = derive_edges(&comment());
        let summary: Vec<(&str, &str, Option<&str>)> = edges
            .iter()
            .map(|e| {
                (
                    e.field_path.as_str(),
                    e.target_type.as_str(),
                    e.discriminator.as_deref(),
                )
            })
            .collect();

        assert_eq!(
            summary,
            vec![
                ("author", "User", None),
                ("mentions", "User", None),
                ("subject.id", "Post", Some("subject.kind")),
                ("subject.id", "Shop", Some("subject.kind")),
            ]
        );
    }

    #[test]
    fn local_target_resolves_nested_dynamic_paths() {
        let def = comment();

        assert_eq!(
            local_target(&def, "author"),
            Some(LocalTarget::Static("User".to_string()))
        );
        assert_eq!(
            local_target(&def, "subject.id").map(|t| t.candidates().len()),
            Some(2)
        );
        assert_eq!(local_target(&def, "subject.kind"), None);
    }

    #[test]
    fn edge_filter_narrows_by_discriminator() {
        let edges = derive_edges(&comment());
        let id = RecordId::generate();
        let subject = |kind: &str| {
            Record::new(
                "Comment",
                Document::new().with(
                    "subject",
                    Value::Map(
                        [
                            ("kind".to_string(), Value::from(kind)),
                            ("id".to_string(), Value::Text(id.to_string())),
                        ]
                        .into_iter()
                        .collect(),
                    ),
                ),
            )
        };

        let to_post = &edges[2];
        assert!(to_post.filter(id).matches(&subject("Post")));
        assert!(!to_post.filter(id).matches(&subject("Shop")));
    }
}
