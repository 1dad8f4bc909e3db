//! Cascade orchestration.
//!
//! Deletes and restores are plan-then-commit: a pure read phase builds an
//! immutable plan and validates every guard, and only a fully valid plan is
//! handed to the commit phase, which performs the writes.
//!
//! There is no locking across records. A mutation that lands between plan
//! and commit (for example a new referencing record) is not seen by the
//! plan; commit skips records that stopped being eligible and logs them.

mod commit;
mod guard;
mod plan;
mod restore;


pub use guard::{Blocker, ReferenceViolation};
pub use plan::{DeletePlan, PlanNode, PlanReason};
pub use restore::RestorePlan;

use crate::{
    db::{
        config::DbConfig, filter::Filter, registry::Registry, store::DocumentStore,
        visibility::Visibility,
    },
    error::InternalError,
    obs::MetricsSink,
    record::{ID_PATH, Record, RecordRef},
    types::{RecordId, Timestamp},
};

///
/// DeleteOptions
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DeleteOptions {
    /// Tombstone timestamp to stamp on every node; defaults to now.
    pub deleted_at: Option<Timestamp>,
}

impl DeleteOptions {
    #[must_use]
    pub const fn at(deleted_at: Timestamp) -> Self {
        Self {
            deleted_at: Some(deleted_at),
        }
    }
}

///
/// DestroyOptions
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DestroyOptions {
    /// Refuse to destroy a record that is still live.
    pub require_deleted: bool,
}

///
/// CascadeReport
///
/// Records tombstoned by one delete call, in commit order (root last).
/// Empty when the root was already tombstoned.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CascadeReport {
    pub root: RecordRef,
    pub deleted: Vec<RecordRef>,
    pub deleted_at: Option<Timestamp>,
}

impl CascadeReport {
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.deleted.is_empty()
    }
}

///
/// RestoreReport
///
/// restored → records moved back to the live set, in commit order
/// dropped  → ledger entries discarded because their record was already
///            live or no longer exists
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RestoreReport {
    pub restored: Vec<RecordRef>,
    pub dropped: Vec<RecordRef>,
}

///
/// Cascade
///
/// Borrowed view of one engine instance used for a single delete or restore.
///

pub(crate) struct Cascade<'a> {
    pub(crate) store: &'a dyn DocumentStore,
    pub(crate) registry: &'a Registry,
    pub(crate) config: &'a DbConfig,
    pub(crate) sink: &'a dyn MetricsSink,
}

impl Cascade<'_> {
    /// Fetch one record by id under the given visibility.
    pub(crate) async fn fetch(
        &self,
        type_name: &str,
        id: RecordId,
        visibility: Visibility,
    ) -> Result<Option<Record>, InternalError> {
        let filter = visibility.apply(Filter::eq(ID_PATH, id));
        let mut rows = self.store.find(type_name, &filter, None).await?;

        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    /// Filter selecting exactly one record in the given lifecycle state.
    pub(crate) fn by_id(id: RecordId, visibility: Visibility) -> Filter {
        visibility.apply(Filter::eq(ID_PATH, id))
    }
}
