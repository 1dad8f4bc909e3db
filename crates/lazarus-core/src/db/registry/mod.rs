//! Reference registry.
//!
//! Holds every registered type definition, the reference edges derived from
//! their fields, and each type's compiled delete policy. Built once; the
//! engine only reads it.

mod edges;
mod policy;

#[cfg(test)]
mod tests;

pub use edges::{LocalTarget, ReferenceEdge, derive_edges, references};
pub use policy::{CompiledPolicy, ForeignPredicate, ForeignRule, LocalRule, ReferenceGuard};

use lazarus_schema::{
    err,
    error::{ConfigurationError, ErrorTree},
    node::{TypeDef, UniqueDef},
};
use std::collections::BTreeMap;

///
/// RegisteredType
///

#[derive(Clone, Debug)]
pub struct RegisteredType {
    def: TypeDef,
    policy: CompiledPolicy,
}

impl RegisteredType {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.def.name
    }

    #[must_use]
    pub const fn def(&self) -> &TypeDef {
        &self.def
    }

    #[must_use]
    pub const fn policy(&self) -> &CompiledPolicy {
        &self.policy
    }

    #[must_use]
    pub fn unique(&self) -> &[UniqueDef] {
        &self.def.unique
    }
}

///
/// RegistryBuilder
///
/// Collects type definitions. Each registration is validated and its edges
/// derived immediately; cross-type policy checks run in [`Self::build`],
/// which reports every problem found at once.
///

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    types: BTreeMap<String, TypeDef>,
    edges_into: BTreeMap<String, Vec<ReferenceEdge>>,
    errs: ErrorTree,
}

impl RegistryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn register(mut self, def: TypeDef) -> Self {
        self.add(def);
        self
    }

    #[must_use]
    pub fn register_all(mut self, defs: impl IntoIterator<Item = TypeDef>) -> Self {
        for def in defs {
            self.add(def);
        }
        self
    }

    /// Register one definition in place.
    pub fn add(&mut self, def: TypeDef) {
        if self.types.contains_key(&def.name) {
            err!(self.errs, "type '{}' registered twice", def.name);
            return;
        }
        if let Err(tree) = def.validate() {
            self.errs.merge_for(def.name.clone(), tree);
        }

        for edge in derive_edges(&def) {
            self.edges_into
                .entry(edge.target_type.clone())
                .or_default()
                .push(edge);
        }
        self.types.insert(def.name.clone(), def);
    }

    /// Edges pointing at `name` among the definitions registered so far.
    #[must_use]
    pub fn edges_into(&self, name: &str) -> &[ReferenceEdge] {
        self.edges_into.get(name).map_or(&[], Vec::as_slice)
    }

    /// Compile every policy against the full type table.
    pub fn build(self) -> Result<Registry, ConfigurationError> {
        let Self {
            types,
            edges_into,
            mut errs,
        } = self;

        // every edge must land on a registered type
        for (target, edges) in &edges_into {
            if types.contains_key(target) {
                continue;
            }
            for edge in edges {
                errs.add_for(
                    edge.source_type.clone(),
                    format!(
                        "reference field '{}' targets unknown type '{target}'",
                        edge.field_path
                    ),
                );
            }
        }

        let mut compiled = BTreeMap::new();
        for (name, def) in &types {
            let mut policy_errs = ErrorTree::new();
            let policy = policy::compile(def, &types, &mut policy_errs);
            errs.merge_for(format!("{name}.onDelete"), policy_errs);

            compiled.insert(
                name.clone(),
                RegisteredType {
                    def: def.clone(),
                    policy,
                },
            );
        }

        errs.result().map_err(ConfigurationError::from)?;

        Ok(Registry {
            types: compiled,
            edges_into,
        })
    }
}

///
/// Registry
///
/// Immutable, validated type table with reverse reference edges.
///

#[derive(Clone, Debug, Default)]
pub struct Registry {
    types: BTreeMap<String, RegisteredType>,
    edges_into: BTreeMap<String, Vec<ReferenceEdge>>,
}

impl Registry {
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    #[must_use]
    pub fn is_known_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Look up a registered type or fail with a configuration error.
    pub fn try_get(&self, name: &str) -> Result<&RegisteredType, ConfigurationError> {
        self.types
            .get(name)
            .ok_or_else(|| ConfigurationError::unknown_type(name))
    }

    /// Every edge whose target is `name`.
    pub fn edges_into(&self, name: &str) -> Result<&[ReferenceEdge], ConfigurationError> {
        self.try_get(name)?;

        Ok(self.edges_into.get(name).map_or(&[], Vec::as_slice))
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Reopen this registry to register more types.
    #[must_use]
    pub fn into_builder(self) -> RegistryBuilder {
        RegistryBuilder::new().register_all(self.types.into_values().map(|t| t.def))
    }
}
