use crate::{
    db::{filter::Filter, registry::edges::{LocalTarget, local_target, references}},
    types::RecordId,
};
use lazarus_schema::{
    err,
    error::ErrorTree,
    node::{ComposedPathsDef, DeletePolicyDef, ErrorOnReferencedDef, ForeignPathDef, TypeDef},
};
use std::collections::{BTreeMap, BTreeSet};

///
/// CompiledPolicy
///
/// Delete policy of one type, validated against the full type table and
/// reduced to the rules the planner executes.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CompiledPolicy {
    pub local: Vec<LocalRule>,
    pub foreign: Vec<ForeignRule>,
    pub guard: ReferenceGuard,
}

///
/// LocalRule
///
/// Cascade into the record(s) one of this type's own fields points at.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LocalRule {
    pub path: String,
    pub target: LocalTarget,
}

///
/// ForeignRule
///
/// Cascade into records of `target_type` that point back at this record.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ForeignRule {
    pub target_type: String,
    pub predicate: ForeignPredicate,
}

///
/// ForeignPredicate
///
/// Path  → the path holds the id
/// AnyOf → any listed path holds the id
/// AllOf → every listed path holds the id
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ForeignPredicate {
    Path(String),
    AnyOf(Vec<String>),
    AllOf(Vec<String>),
}

impl ForeignPredicate {
    /// Store filter selecting records that point at `id`.
    #[must_use]
    pub fn to_filter(&self, id: RecordId) -> Filter {
        match self {
            Self::Path(path) => references(path, id),
            Self::AnyOf(paths) => Filter::Or(paths.iter().map(|p| references(p, id)).collect()),
            Self::AllOf(paths) => Filter::And(paths.iter().map(|p| references(p, id)).collect()),
        }
    }

    #[must_use]
    pub fn paths(&self) -> &[String] {
        match self {
            Self::Path(path) => std::slice::from_ref(path),
            Self::AnyOf(paths) | Self::AllOf(paths) => paths,
        }
    }
}

///
/// ReferenceGuard
///
/// Which referencing types block deleting a record of this type.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum ReferenceGuard {
    #[default]
    Off,
    All,
    Except(BTreeSet<String>),
}

impl ReferenceGuard {
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self, Self::Off)
    }

    /// Whether a live reference from `source_type` blocks deletion.
    #[must_use]
    pub fn blocks(&self, source_type: &str) -> bool {
        match self {
            Self::Off => false,
            Self::All => true,
            Self::Except(except) => !except.contains(source_type),
        }
    }
}

/// Compile the policy of `def` against every registered definition.
/// Problems are added to `errs`; the returned policy is only meaningful
/// when `errs` stays empty.
pub(crate) fn compile(
    def: &TypeDef,
    types: &BTreeMap<String, TypeDef>,
    errs: &mut ErrorTree,
) -> CompiledPolicy {
    let Some(policy) = &def.on_delete else {
        return CompiledPolicy::default();
    };

    CompiledPolicy {
        local: compile_local(def, policy),
        foreign: compile_foreign(policy, types, errs),
        guard: compile_guard(&policy.error_on_referenced, types, errs),
    }
}

// Unresolvable local paths were already reported by `TypeDef::validate`.
fn compile_local(def: &TypeDef, policy: &DeletePolicyDef) -> Vec<LocalRule> {
    policy
        .clean
        .local
        .iter()
        .filter_map(|path| {
            local_target(def, path).map(|target| LocalRule {
                path: path.clone(),
                target,
            })
        })
        .collect()
}

fn compile_foreign(
    policy: &DeletePolicyDef,
    types: &BTreeMap<String, TypeDef>,
    errs: &mut ErrorTree,
) -> Vec<ForeignRule> {
    let mut rules = Vec::new();

    for (target_type, paths) in &policy.clean.foreign {
        let Some(target) = types.get(target_type) else {
            err!(errs, "clean.foreign names unknown type '{target_type}'");
            continue;
        };

        let predicate = match paths {
            ForeignPathDef::Path(path) => ForeignPredicate::Path(path.clone()),
            ForeignPathDef::AnyOf(paths)
            | ForeignPathDef::Composed(ComposedPathsDef {
                and: None,
                or: Some(paths),
            }) => ForeignPredicate::AnyOf(paths.clone()),
            ForeignPathDef::Composed(ComposedPathsDef {
                and: Some(paths),
                or: None,
            }) => ForeignPredicate::AllOf(paths.clone()),
            // shape errors are reported by the definition's own validation
            ForeignPathDef::Composed(_) => continue,
        };

        let mut ok = true;
        for path in predicate.paths() {
            if !target.has_path(path) {
                err!(
                    errs,
                    "clean.foreign.{target_type} path '{path}' does not exist on '{target_type}'"
                );
                ok = false;
            }
        }

        if ok {
            rules.push(ForeignRule {
                target_type: target_type.clone(),
                predicate,
            });
        }
    }

    rules
}

fn compile_guard(
    def: &ErrorOnReferencedDef,
    types: &BTreeMap<String, TypeDef>,
    errs: &mut ErrorTree,
) -> ReferenceGuard {
    match def {
        ErrorOnReferencedDef::Flag(false) => ReferenceGuard::Off,
        ErrorOnReferencedDef::Flag(true) => ReferenceGuard::All,
        ErrorOnReferencedDef::Except { except } => {
            for name in except {
                if !types.contains_key(name) {
                    err!(errs, "errorOnReferenced.except names unknown type '{name}'");
                }
            }
            ReferenceGuard::Except(except.iter().cloned().collect())
        }
    }
}
