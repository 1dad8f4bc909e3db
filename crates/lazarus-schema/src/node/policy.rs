use crate::{
    err,
    error::ErrorTree,
    node::field::{FieldDef, lookup_path},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

///
/// TypeOptions
///
/// Per-type configuration block as persisted with the type definition:
/// `{ "onDelete": { ... } }`.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TypeOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<DeletePolicyDef>,
}

impl TypeOptions {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

///
/// DeletePolicyDef
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeletePolicyDef {
    #[serde(default)]
    pub clean: CleanDef,

    #[serde(default)]
    pub error_on_referenced: ErrorOnReferencedDef,
}

impl DeletePolicyDef {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cascade into records referenced by one of this type's own fields.
    #[must_use]
    pub fn clean_local(mut self, path: impl Into<String>) -> Self {
        self.clean.local.push(path.into());
        self
    }

    /// Cascade into records of `target` matched by `paths` against this record's id.
    #[must_use]
    pub fn clean_foreign(mut self, target: impl Into<String>, paths: ForeignPathDef) -> Self {
        self.clean.foreign.insert(target.into(), paths);
        self
    }

    #[must_use]
    pub fn error_on_referenced(mut self) -> Self {
        self.error_on_referenced = ErrorOnReferencedDef::Flag(true);
        self
    }

    #[must_use]
    pub fn error_on_referenced_except<I, S>(mut self, except: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.error_on_referenced = ErrorOnReferencedDef::Except {
            except: except.into_iter().map(Into::into).collect(),
        };
        self
    }

    /// Validate what can be checked against the owning type alone.
    /// Cross-type checks (target names, target paths) happen at registry build.
    #[must_use]
    pub fn validate_local(&self, own_fields: &[FieldDef]) -> ErrorTree {
        let mut errs = ErrorTree::new();

        // clean.local
        let mut seen = BTreeSet::new();
        for path in &self.clean.local {
            if !seen.insert(path.as_str()) {
                err!(errs, "clean.local path '{path}' declared twice");
                continue;
            }
            match lookup_path(own_fields, path) {
                None => err!(errs, "clean.local path '{path}' does not exist"),
                Some(field) if !field.kind.is_reference() => {
                    err!(errs, "clean.local path '{path}' is not a reference field");
                }
                Some(_) => {}
            }
        }

        // clean.foreign
        for (target, paths) in &self.clean.foreign {
            errs.merge_for(format!("clean.foreign.{target}"), paths.validate_shape());
        }

        // errorOnReferenced
        if let ErrorOnReferencedDef::Except { except } = &self.error_on_referenced
            && except.iter().any(String::is_empty)
        {
            err!(errs, "errorOnReferenced.except contains an empty type name");
        }

        errs
    }
}

///
/// CleanDef
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CleanDef {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub local: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub foreign: BTreeMap<String, ForeignPathDef>,
}

///
/// ForeignPathDef
///
/// `"path"`, `["a", "b"]` (implicit OR), `{ "and": [...] }` or `{ "or": [...] }`.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ForeignPathDef {
    Path(String),
    AnyOf(Vec<String>),
    Composed(ComposedPathsDef),
}

impl ForeignPathDef {
    #[must_use]
    pub fn path(path: impl Into<String>) -> Self {
        Self::Path(path.into())
    }

    #[must_use]
    pub fn any_of<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::AnyOf(paths.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn and<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Composed(ComposedPathsDef {
            and: Some(paths.into_iter().map(Into::into).collect()),
            or: None,
        })
    }

    #[must_use]
    pub fn or<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Composed(ComposedPathsDef {
            and: None,
            or: Some(paths.into_iter().map(Into::into).collect()),
        })
    }

    /// Every path named by this predicate, in declaration order.
    #[must_use]
    pub fn paths(&self) -> Vec<&str> {
        match self {
            Self::Path(path) => vec![path.as_str()],
            Self::AnyOf(paths) => paths.iter().map(String::as_str).collect(),
            Self::Composed(composed) => composed
                .and
                .iter()
                .chain(composed.or.iter())
                .flatten()
                .map(String::as_str)
                .collect(),
        }
    }

    // Structural checks that need no schema.
    fn validate_shape(&self) -> ErrorTree {
        let mut errs = ErrorTree::new();

        match self {
            Self::Path(path) if path.is_empty() => err!(errs, "empty path"),
            Self::AnyOf(paths) if paths.is_empty() => err!(errs, "path list is empty"),
            Self::Composed(ComposedPathsDef {
                and: Some(_),
                or: Some(_),
            }) => err!(errs, "declares both 'and' and 'or'"),
            Self::Composed(ComposedPathsDef {
                and: None,
                or: None,
            }) => err!(errs, "declares neither 'and' nor 'or'"),
            Self::Composed(ComposedPathsDef {
                and: Some(paths), ..
            }
            | ComposedPathsDef {
                or: Some(paths), ..
            }) if paths.is_empty() => err!(errs, "composed path list is empty"),
            _ => {}
        }

        if self.paths().iter().any(|p| p.is_empty()) && !matches!(self, Self::Path(_)) {
            err!(errs, "path list contains an empty path");
        }

        errs
    }
}

///
/// ComposedPathsDef
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ComposedPathsDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub and: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub or: Option<Vec<String>>,
}

///
/// ErrorOnReferencedDef
///
/// `false` | `true` | `{ "except": [TypeName, ...] }`
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ErrorOnReferencedDef {
    Flag(bool),
    Except { except: Vec<String> },
}

impl Default for ErrorOnReferencedDef {
    fn default() -> Self {
        Self::Flag(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::field::FieldKind;

    fn shop_fields() -> Vec<FieldDef> {
        vec![
            FieldDef::new("title", FieldKind::Text),
            FieldDef::new("owner", FieldKind::reference("User")),
        ]
    }

    #[test]
    fn parses_full_policy_format() {
        let options = TypeOptions::from_json(
            r#"{
                "onDelete": {
                    "clean": {
                        "local": ["owner"],
                        "foreign": {
                            "Shop": "owner",
                            "Post": ["author", "editor"],
                            "Review": { "and": ["author", "subject"] },
                            "Note": { "or": ["a", "b"] }
                        }
                    },
                    "errorOnReferenced": { "except": ["Log"] }
                }
            }"#,
        )
        .expect("policy json should parse");

        let policy = options.on_delete.expect("onDelete should be present");
        assert_eq!(policy.clean.local, vec!["owner".to_string()]);
        assert_eq!(policy.clean.foreign["Shop"], ForeignPathDef::path("owner"));
        assert_eq!(
            policy.clean.foreign["Post"],
            ForeignPathDef::any_of(["author", "editor"])
        );
        assert_eq!(
            policy.clean.foreign["Review"],
            ForeignPathDef::and(["author", "subject"])
        );
        assert_eq!(policy.clean.foreign["Note"], ForeignPathDef::or(["a", "b"]));
        assert_eq!(
            policy.error_on_referenced,
            ErrorOnReferencedDef::Except {
                except: vec!["Log".to_string()]
            }
        );
    }

    #[test]
    fn error_on_referenced_defaults_to_false() {
        let options = TypeOptions::from_json(r#"{ "onDelete": { "clean": {} } }"#)
            .expect("minimal policy should parse");

        assert_eq!(
            options.on_delete.map(|p| p.error_on_referenced),
            Some(ErrorOnReferencedDef::Flag(false))
        );
    }

    #[test]
    fn unknown_policy_keys_are_rejected() {
        let err = TypeOptions::from_json(r#"{ "onDelete": { "cleen": {} } }"#);

        assert!(err.is_err(), "misspelled policy keys must not be ignored");
    }

    #[test]
    fn both_and_or_is_a_configuration_error() {
        let policy: DeletePolicyDef = serde_json::from_str(
            r#"{ "clean": { "foreign": { "Shop": { "and": ["a"], "or": ["b"] } } } }"#,
        )
        .expect("shape parses; conflict is a validation concern");

        let errs = policy.validate_local(&shop_fields());
        assert_eq!(
            errs.flatten(),
            vec!["clean.foreign.Shop: declares both 'and' and 'or'".to_string()]
        );
    }

    #[test]
    fn local_path_must_exist_and_be_a_reference() {
        let policy = DeletePolicyDef::new()
            .clean_local("ownr")
            .clean_local("title")
            .clean_local("owner");

        let errs = policy.validate_local(&shop_fields()).flatten();
        assert_eq!(errs.len(), 2);
        assert!(errs[0].contains("'ownr' does not exist"));
        assert!(errs[1].contains("'title' is not a reference field"));
    }

    #[test]
    fn empty_foreign_lists_are_rejected() {
        let policy = DeletePolicyDef::new()
            .clean_foreign("Shop", ForeignPathDef::AnyOf(Vec::new()))
            .clean_foreign("Post", ForeignPathDef::and(Vec::<String>::new()));

        assert_eq!(policy.validate_local(&shop_fields()).len(), 2);
    }
}
