use crate::{
    db::{
        cascade::{Cascade, CascadeReport, DeletePlan},
        store::Patch,
        visibility::Visibility,
    },
    error::InternalError,
    record::{Ledger, LedgerEntry, RecordRef, Tombstone},
    types::Timestamp,
};

impl Cascade<'_> {
    /// Write a validated delete plan: dependents first, root last. Every
    /// non-root node written is appended to the root's ledger, which starts
    /// empty: a live root carries no ledger.
    pub(crate) async fn commit_delete(
        &self,
        plan: &DeletePlan,
        at: Timestamp,
    ) -> Result<CascadeReport, InternalError> {
        let root = &plan.root.target;
        let tombstone = Patch::tombstone(Tombstone::Deleted { at });
        let mut ledger = Ledger::new();
        let mut written: Vec<RecordRef> = Vec::new();

        for target in plan.commit_order() {
            if target == root {
                continue;
            }

            let filter = Self::by_id(target.id, Visibility::Active);
            match self
                .store
                .update_one(&target.type_name, &filter, &tombstone)
                .await
            {
                Ok(0) => {
                    tracing::warn!(%root, %target, "cascade target no longer live; skipped");
                }
                Ok(_) => {
                    ledger.append(LedgerEntry::from(target.clone()));
                    written.push(target.clone());
                }
                Err(err) => {
                    self.undo_tombstones(&written).await;
                    return Err(err.into());
                }
            }
        }

        let root_patch = tombstone.with_ledger(ledger);
        let filter = Self::by_id(root.id, Visibility::Active);
        let touched = match self
            .store
            .update_one(&root.type_name, &filter, &root_patch)
            .await
        {
            Ok(touched) => touched,
            Err(err) => {
                self.undo_tombstones(&written).await;
                return Err(err.into());
            }
        };
        if touched == 0 {
            self.undo_tombstones(&written).await;
            return Err(InternalError::record_not_found(&root.type_name, root.id));
        }

        written.push(root.clone());
        tracing::info!(%root, deleted = written.len(), "delete committed");

        Ok(CascadeReport {
            root: root.clone(),
            deleted: written,
            deleted_at: Some(at),
        })
    }

    // Best effort: a failed write mid-commit re-activates what was written.
    async fn undo_tombstones(&self, written: &[RecordRef]) {
        let patch = Patch::tombstone(Tombstone::Active);

        for target in written.iter().rev() {
            let filter = Self::by_id(target.id, Visibility::Deleted);
            if let Err(err) = self
                .store
                .update_one(&target.type_name, &filter, &patch)
                .await
            {
                tracing::warn!(%target, %err, "rollback of cascade tombstone failed");
            }
        }
    }
}
