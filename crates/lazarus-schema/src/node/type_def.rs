use crate::{
    err,
    error::ErrorTree,
    node::{
        field::{FieldDef, FieldKind, RefTarget, lookup_path},
        policy::{DeletePolicyDef, TypeOptions},
        unique::UniqueDef,
    },
    validate::naming::{validate_field_name, validate_type_name},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

///
/// TypeDef
///
/// Declarative definition of one record type: field schema, uniqueness
/// constraints and the optional delete policy.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDef {
    pub name: String,
    pub fields: Vec<FieldDef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unique: Vec<UniqueDef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<DeletePolicyDef>,
}

impl TypeDef {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            unique: Vec::new(),
            on_delete: None,
        }
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldDef::new(name, kind));
        self
    }

    #[must_use]
    pub fn unique<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique.push(UniqueDef::new(fields));
        self
    }

    #[must_use]
    pub fn on_delete(mut self, policy: DeletePolicyDef) -> Self {
        self.on_delete = Some(policy);
        self
    }

    /// Apply a persisted options block (`{ "onDelete": ... }`).
    #[must_use]
    pub fn with_options(mut self, options: TypeOptions) -> Self {
        self.on_delete = options.on_delete;
        self
    }

    /// Look up a field by dotted path.
    #[must_use]
    pub fn get_field(&self, path: &str) -> Option<&FieldDef> {
        lookup_path(&self.fields, path)
    }

    #[must_use]
    pub fn has_path(&self, path: &str) -> bool {
        self.get_field(path).is_some()
    }

    /// Validate this definition in isolation.
    pub fn validate(&self) -> Result<(), ErrorTree> {
        let mut errs = ErrorTree::new();

        validate_type_name(&self.name, &mut errs);
        validate_fields(&self.fields, "", &mut errs);

        // unique
        for unique in &self.unique {
            if unique.fields.is_empty() {
                err!(errs, "unique constraint has no fields");
            }
            for path in &unique.fields {
                if !self.has_path(path) {
                    err!(errs, "unique path '{path}' does not exist");
                }
            }
        }

        // policy
        if let Some(policy) = &self.on_delete {
            errs.merge_for("onDelete", policy.validate_local(&self.fields));
        }

        errs.result()
    }
}

// Validate one sibling list, recursing into objects.
fn validate_fields(fields: &[FieldDef], prefix: &str, errs: &mut ErrorTree) {
    let mut seen = BTreeSet::new();

    for field in fields {
        let path = if prefix.is_empty() {
            field.name.clone()
        } else {
            format!("{prefix}.{}", field.name)
        };

        validate_field_name(&field.name, errs);
        if !seen.insert(field.name.as_str()) {
            err!(errs, "field '{path}' declared twice");
        }

        validate_kind(&field.kind, fields, &path, errs);
    }
}

fn validate_kind(kind: &FieldKind, siblings: &[FieldDef], path: &str, errs: &mut ErrorTree) {
    match kind {
        FieldKind::Enum(values) if values.is_empty() => {
            err!(errs, "enum field '{path}' has no values");
        }
        FieldKind::Reference(RefTarget::Type(target)) if target.is_empty() => {
            err!(errs, "reference field '{path}' has an empty target");
        }
        FieldKind::Reference(RefTarget::Enum { field }) => {
            match siblings.iter().find(|f| &f.name == field) {
                None => err!(
                    errs,
                    "reference field '{path}' resolves its target from missing sibling '{field}'"
                ),
                Some(sibling) if !matches!(sibling.kind, FieldKind::Enum(_)) => err!(
                    errs,
                    "reference field '{path}' resolves its target from non-enum sibling '{field}'"
                ),
                Some(_) => {}
            }
        }
        FieldKind::List(item) => validate_kind(item, siblings, path, errs),
        FieldKind::Object(children) => validate_fields(children, path, errs),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::policy::ForeignPathDef;

    #[test]
    fn valid_definition_passes() {
        let def = TypeDef::new("Shop")
            .field("title", FieldKind::Text)
            .field("owner", FieldKind::reference("User"))
            .unique(["title"])
            .on_delete(DeletePolicyDef::new().clean_local("owner"));

        assert!(def.validate().is_ok());
    }

    #[test]
    fn every_problem_is_reported() {
        let def = TypeDef::new("Shop")
            .field("deleted", FieldKind::Bool)
            .field("title", FieldKind::Text)
            .field("title", FieldKind::Text)
            .field("kind", FieldKind::Text)
            .field("target", FieldKind::dynamic_reference("kind"))
            .unique(["missing"])
            .on_delete(
                DeletePolicyDef::new()
                    .clean_foreign("User", ForeignPathDef::Path(String::new())),
            );

        let errs = def.validate().expect_err("definition should be rejected");
        assert_eq!(errs.len(), 5, "unexpected report: {errs}");
    }

    #[test]
    fn dynamic_reference_accepts_enum_sibling_inside_list() {
        let def = TypeDef::new("Order").field(
            "lines",
            FieldKind::list(FieldKind::Object(vec![
                FieldDef::new("kind", FieldKind::Enum(vec!["Product".into(), "Bundle".into()])),
                FieldDef::new("item", FieldKind::dynamic_reference("kind")),
            ])),
        );

        assert!(def.validate().is_ok());
    }
}
