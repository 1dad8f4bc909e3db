use crate::{
    db::{
        cascade::{Cascade, RestoreReport},
        store::Patch,
        unique::UniqueValidator,
        visibility::Visibility,
    },
    error::InternalError,
    obs::MetricsEvent,
    record::{Ledger, Record, RecordRef, Tombstone},
};
use std::collections::{BTreeMap, BTreeSet};

///
/// RestorePlan
///
/// Records a restore brings back: the root, then every record reachable
/// through ledgers that is still tombstoned, in ledger order.
///

#[derive(Clone, Debug, PartialEq)]
pub struct RestorePlan {
    pub members: Vec<Record>,
    pub dropped: Vec<RecordRef>,
}

impl RestorePlan {
    #[must_use]
    pub fn root(&self) -> Option<&Record> {
        self.members.first()
    }
}

impl Cascade<'_> {
    /// Gather the restore closure of a tombstoned root. No writes.
    pub(crate) async fn plan_restore(&self, root: Record) -> Result<RestorePlan, InternalError> {
        let mut members = Vec::new();
        let mut dropped = Vec::new();
        let mut seen = BTreeSet::new();

        if let Some(target) = root.target() {
            seen.insert(target);
        }

        // pre-order walk over ledgers; each member's own ledger is replayed
        // right after it
        let mut stack: Vec<Record> = vec![root];
        while let Some(record) = stack.pop() {
            let mut next = Vec::new();
            for entry in record.deleted_refs() {
                let target = RecordRef::from(entry);
                if !seen.insert(target.clone()) {
                    continue;
                }
                self.registry.try_get(&target.type_name)?;

                match self.fetch(&target.type_name, target.id, Visibility::All).await? {
                    Some(found) if found.is_deleted() => next.push(found),
                    _ => dropped.push(target),
                }
            }
            members.push(record);
            stack.extend(next.into_iter().rev());
        }

        Ok(RestorePlan { members, dropped })
    }

    /// Uniqueness gate for every member, against live records and against
    /// each other. Nothing is written.
    pub(crate) async fn check_restore(&self, plan: &RestorePlan) -> Result<(), InternalError> {
        let mut by_type: BTreeMap<&str, Vec<&Record>> = BTreeMap::new();
        for record in &plan.members {
            by_type.entry(record.type_name()).or_default().push(record);
        }

        for (type_name, records) in by_type {
            let registered = self.registry.try_get(type_name)?;
            let validator = UniqueValidator::new(self.store, registered, self.sink);
            if let [only] = records.as_slice() {
                validator.check_restore(only).await?;
            } else {
                validator.check_restore_set(&records).await?;
            }
        }

        Ok(())
    }

    /// Write a validated restore plan: root first, then ledger order.
    /// Each restored record's ledger is cleared.
    pub(crate) async fn commit_restore(
        &self,
        plan: RestorePlan,
    ) -> Result<RestoreReport, InternalError> {
        let patch = Patch::tombstone(Tombstone::Active).with_ledger(Ledger::new());
        let mut restored: Vec<&Record> = Vec::new();
        let mut report = RestoreReport {
            restored: Vec::new(),
            dropped: plan.dropped.clone(),
        };

        for record in &plan.members {
            let Some(target) = record.target() else {
                continue;
            };

            let filter = Self::by_id(target.id, Visibility::Deleted);
            match self
                .store
                .update_one(&target.type_name, &filter, &patch)
                .await
            {
                Ok(0) => {
                    tracing::warn!(%target, "restore target no longer tombstoned; dropped");
                    report.dropped.push(target);
                }
                Ok(_) => {
                    restored.push(record);
                    report.restored.push(target);
                }
                Err(err) => {
                    self.undo_restores(&restored).await;
                    return Err(err.into());
                }
            }
        }

        let root_type = plan
            .root()
            .map_or_else(String::new, |r| r.type_name().to_string());
        self.sink.record(MetricsEvent::LedgerReplay {
            type_name: root_type,
            restored: report.restored.len() as u64,
            dropped: report.dropped.len() as u64,
        });
        tracing::info!(
            restored = report.restored.len(),
            dropped = report.dropped.len(),
            "restore committed"
        );

        Ok(report)
    }

    // Best effort: put restored records back to their prior tombstone and ledger.
    async fn undo_restores(&self, restored: &[&Record]) {
        for record in restored.iter().rev() {
            let Some(target) = record.target() else {
                continue;
            };

            let patch = Patch {
                tombstone: Some(record.tombstone()),
                ledger: Some(record.deleted_refs().clone()),
                ..Patch::default()
            };
            let filter = Self::by_id(target.id, Visibility::Active);
            if let Err(err) = self
                .store
                .update_one(&target.type_name, &filter, &patch)
                .await
            {
                tracing::warn!(%target, %err, "rollback of restore failed");
            }
        }
    }
}
