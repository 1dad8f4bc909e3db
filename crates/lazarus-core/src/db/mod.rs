//! Engine: registry, visibility, uniqueness, cascades, and the caller-facing
//! `Db`/`Collection` surface over a [`DocumentStore`].

pub mod cascade;
pub mod collection;
pub mod config;
pub mod filter;
pub mod identity;
pub mod registry;
pub mod store;
pub mod unique;
pub mod visibility;

pub use cascade::{
    Blocker, CascadeReport, DeleteOptions, DeletePlan, DestroyOptions, PlanNode, PlanReason,
    ReferenceViolation, RestoreReport,
};
pub use collection::Collection;
pub use config::DbConfig;
pub use filter::Filter;
pub use identity::IdentityError;
pub use registry::{Registry, RegistryBuilder};
pub use store::{DocumentStore, MemoryStore, Patch, Projection};
pub use unique::UniquenessViolation;
pub use visibility::Visibility;

use crate::{
    db::cascade::Cascade,
    error::InternalError,
    obs::{GlobalMetricsSink, MetricsSink},
};
use std::sync::Arc;

///
/// Db
///
/// Handle over one store and one registry, with engine policy
/// (config, metrics sink). Cheap to clone.
///

#[derive(Clone)]
pub struct Db {
    store: Arc<dyn DocumentStore>,
    registry: Arc<Registry>,
    config: DbConfig,
    sink: Arc<dyn MetricsSink>,
}

impl Db {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, registry: Registry) -> Self {
        Self {
            store,
            registry: Arc::new(registry),
            config: DbConfig::default(),
            sink: Arc::new(GlobalMetricsSink),
        }
    }

    /// Engine over a fresh [`MemoryStore`].
    #[must_use]
    pub fn in_memory(registry: Registry) -> Self {
        Self::new(Arc::new(MemoryStore::new()), registry)
    }

    #[must_use]
    pub fn with_config(mut self, config: DbConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn debug(mut self) -> Self {
        self.config.debug = true;
        self
    }

    #[must_use]
    pub fn metrics_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sink = sink;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub const fn config(&self) -> &DbConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Caller surface for one registered type.
    pub fn collection(&self, type_name: &str) -> Result<Collection<'_>, InternalError> {
        let registered = self.registry.try_get(type_name)?;

        Ok(Collection::new(self, registered))
    }

    pub(crate) const fn sink(&self) -> &Arc<dyn MetricsSink> {
        &self.sink
    }

    pub(crate) fn cascade(&self) -> Cascade<'_> {
        Cascade {
            store: self.store.as_ref(),
            registry: &self.registry,
            config: &self.config,
            sink: self.sink.as_ref(),
        }
    }
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db")
            .field("types", &self.registry.type_names().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
