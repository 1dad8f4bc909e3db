use crate::{
    db::{
        Db,
        cascade::{CascadeReport, DeleteOptions, DeletePlan, DestroyOptions, RestoreReport},
        filter::Filter,
        identity::{check_id, require_id},
        registry::RegisteredType,
        store::{Patch, Projection},
        unique::UniqueValidator,
        visibility::Visibility,
    },
    error::InternalError,
    obs::{ExecKind, sink::Span},
    record::{Document, Ledger, Record, Tombstone},
    types::{RecordId, Timestamp},
};
use lazarus_schema::validate::RESERVED_FIELD_NAMES;

///
/// Collection
///
/// Caller surface for one registered type. Reads go through the visibility
/// filter; single-record delete/restore go through the cascade engine;
/// by-filter mutations are raw tombstone flips that never cascade.
///

pub struct Collection<'a> {
    db: &'a Db,
    registered: &'a RegisteredType,
}

impl<'a> Collection<'a> {
    pub(crate) const fn new(db: &'a Db, registered: &'a RegisteredType) -> Self {
        Self { db, registered }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.registered.name()
    }

    // ======================================================================
    // Reads
    // ======================================================================

    /// Records matching `filter` under an explicit visibility.
    pub async fn select(
        &self,
        visibility: Visibility,
        filter: Filter,
        projection: Option<&Projection>,
    ) -> Result<Vec<Record>, InternalError> {
        let mut span = Span::new(self.db.sink(), ExecKind::Load, self.name());
        let rows = self
            .db
            .store()
            .find(self.name(), &visibility.apply(filter), projection)
            .await?;
        span.set_rows(rows.len() as u64);

        Ok(rows)
    }

    pub async fn find(&self, filter: Filter) -> Result<Vec<Record>, InternalError> {
        self.select(Visibility::Active, filter, None).await
    }

    pub async fn find_deleted(&self, filter: Filter) -> Result<Vec<Record>, InternalError> {
        self.select(Visibility::Deleted, filter, None).await
    }

    pub async fn find_with_deleted(&self, filter: Filter) -> Result<Vec<Record>, InternalError> {
        self.select(Visibility::All, filter, None).await
    }

    async fn select_one(
        &self,
        visibility: Visibility,
        filter: Filter,
    ) -> Result<Option<Record>, InternalError> {
        Ok(self
            .select(visibility, filter, None)
            .await?
            .into_iter()
            .next())
    }

    pub async fn find_one(&self, filter: Filter) -> Result<Option<Record>, InternalError> {
        self.select_one(Visibility::Active, filter).await
    }

    pub async fn find_one_deleted(&self, filter: Filter) -> Result<Option<Record>, InternalError> {
        self.select_one(Visibility::Deleted, filter).await
    }

    pub async fn find_one_with_deleted(
        &self,
        filter: Filter,
    ) -> Result<Option<Record>, InternalError> {
        self.select_one(Visibility::All, filter).await
    }

    async fn count_in(&self, visibility: Visibility, filter: Filter) -> Result<u64, InternalError> {
        let _span = Span::new(self.db.sink(), ExecKind::Load, self.name());

        Ok(self
            .db
            .store()
            .count(self.name(), &visibility.apply(filter))
            .await?)
    }

    pub async fn count(&self, filter: Filter) -> Result<u64, InternalError> {
        self.count_in(Visibility::Active, filter).await
    }

    pub async fn count_deleted(&self, filter: Filter) -> Result<u64, InternalError> {
        self.count_in(Visibility::Deleted, filter).await
    }

    pub async fn count_with_deleted(&self, filter: Filter) -> Result<u64, InternalError> {
        self.count_in(Visibility::All, filter).await
    }

    pub async fn exists(&self, filter: Filter) -> Result<bool, InternalError> {
        Ok(self.count_in(Visibility::Active, filter).await? > 0)
    }

    pub async fn exists_deleted(&self, filter: Filter) -> Result<bool, InternalError> {
        Ok(self.count_in(Visibility::Deleted, filter).await? > 0)
    }

    pub async fn exists_with_deleted(&self, filter: Filter) -> Result<bool, InternalError> {
        Ok(self.count_in(Visibility::All, filter).await? > 0)
    }

    async fn get_in(
        &self,
        visibility: Visibility,
        id: RecordId,
    ) -> Result<Option<Record>, InternalError> {
        let id = check_id(self.name(), id)?;
        self.db
            .cascade()
            .fetch(self.name(), id, visibility)
            .await
    }

    pub async fn get(&self, id: RecordId) -> Result<Option<Record>, InternalError> {
        self.get_in(Visibility::Active, id).await
    }

    pub async fn get_deleted(&self, id: RecordId) -> Result<Option<Record>, InternalError> {
        self.get_in(Visibility::Deleted, id).await
    }

    pub async fn get_with_deleted(&self, id: RecordId) -> Result<Option<Record>, InternalError> {
        self.get_in(Visibility::All, id).await
    }

    // ======================================================================
    // Writes
    // ======================================================================

    /// Insert one new live record.
    pub async fn insert(&self, fields: Document) -> Result<Record, InternalError> {
        let mut span = Span::new(self.db.sink(), ExecKind::Insert, self.name());
        self.reject_reserved(&fields)?;
        self.validator().check_insert(&fields).await?;

        let record = Record::new(self.name(), fields).with_id(RecordId::generate());
        self.db.store().insert_one(record.clone()).await?;
        span.set_rows(1);

        Ok(record)
    }

    /// Insert a batch; uniqueness is checked against live records and
    /// within the batch before anything is written.
    pub async fn insert_many(&self, batch: Vec<Document>) -> Result<Vec<Record>, InternalError> {
        let mut span = Span::new(self.db.sink(), ExecKind::Insert, self.name());
        for fields in &batch {
            self.reject_reserved(fields)?;
        }
        self.validator().check_batch(&batch).await?;

        let records: Vec<Record> = batch
            .into_iter()
            .map(|fields| Record::new(self.name(), fields).with_id(RecordId::generate()))
            .collect();
        self.db.store().insert_many(records.clone()).await?;
        span.set_rows(records.len() as u64);

        Ok(records)
    }

    /// Set fields on one live record. Keys may be dotted paths.
    pub async fn update(&self, id: RecordId, changes: Document) -> Result<Record, InternalError> {
        let mut span = Span::new(self.db.sink(), ExecKind::Update, self.name());
        let id = check_id(self.name(), id)?;
        self.reject_reserved(&changes)?;

        let Some(mut record) = self.get(id).await? else {
            return Err(InternalError::record_not_found(self.name(), id));
        };

        let patch = Patch {
            set: changes,
            ..Patch::default()
        };
        patch.apply(&mut record);

        let changed: Vec<String> = patch.set.keys().cloned().collect();
        self.validator()
            .check_update(id, record.fields(), &changed)
            .await?;

        let touched = self
            .db
            .store()
            .update_one(self.name(), &by_id(id, Visibility::Active), &patch)
            .await?;
        if touched == 0 {
            return Err(InternalError::record_not_found(self.name(), id));
        }
        span.set_rows(touched);

        Ok(record)
    }

    // ======================================================================
    // Lifecycle: single record
    // ======================================================================

    /// Tombstone `record` and everything its type's policy cascades into.
    /// Nothing is written unless the whole cascade validates.
    pub async fn delete(
        &self,
        record: &Record,
        options: DeleteOptions,
    ) -> Result<CascadeReport, InternalError> {
        let mut span = Span::new(self.db.sink(), ExecKind::Delete, self.name());
        let id = self.own_id(record)?;

        let current = self.current(id).await?;
        let root = current
            .target()
            .ok_or_else(|| InternalError::executor_invariant("stored record has no identifier"))?;
        if current.is_deleted() {
            tracing::debug!(%root, "delete of tombstoned record is a no-op");
            return Ok(CascadeReport {
                root,
                deleted: Vec::new(),
                deleted_at: current.deleted_at(),
            });
        }

        let cascade = self.db.cascade();
        let plan = cascade.plan_delete(current).await?;
        let at = options.deleted_at.unwrap_or_else(Timestamp::now);
        let report = cascade.commit_delete(&plan, at).await?;
        span.set_rows(report.deleted.len() as u64);

        Ok(report)
    }

    /// Build the delete plan for `record` without writing anything.
    /// Returns `None` when the record is already tombstoned.
    pub async fn plan_delete(&self, record: &Record) -> Result<Option<DeletePlan>, InternalError> {
        let id = self.own_id(record)?;
        let current = self.current(id).await?;
        if current.is_deleted() {
            return Ok(None);
        }

        Ok(Some(self.db.cascade().plan_delete(current).await?))
    }

    /// Bring `record` back, replaying its cascade ledger. Every record that
    /// would re-enter the live set is uniqueness-checked first; any conflict
    /// aborts the whole restore.
    pub async fn restore(&self, record: &Record) -> Result<RestoreReport, InternalError> {
        let mut span = Span::new(self.db.sink(), ExecKind::Restore, self.name());
        let id = self.own_id(record)?;

        let current = self.current(id).await?;
        if !current.is_deleted() {
            return Ok(RestoreReport::default());
        }

        let cascade = self.db.cascade();
        let plan = cascade.plan_restore(current).await?;
        cascade.check_restore(&plan).await?;
        let report = cascade.commit_restore(plan).await?;
        span.set_rows(report.restored.len() as u64);

        Ok(report)
    }

    /// Permanently remove `record`. Never cascades and never reads policy.
    pub async fn destroy(
        &self,
        record: &Record,
        options: DestroyOptions,
    ) -> Result<bool, InternalError> {
        let mut span = Span::new(self.db.sink(), ExecKind::Destroy, self.name());
        let id = self.own_id(record)?;

        if options.require_deleted {
            let current = self.current(id).await?;
            if !current.is_deleted() {
                return Err(InternalError::interface_unsupported(format!(
                    "refusing to destroy live record {}:{id}",
                    self.name()
                )));
            }
        }

        let removed = self
            .db
            .store()
            .delete_one(self.name(), &by_id(id, Visibility::All))
            .await?;
        span.set_rows(removed);

        Ok(removed > 0)
    }

    // ======================================================================
    // Lifecycle: by filter (raw, no cascade, no ledger)
    // ======================================================================

    pub async fn delete_one(&self, filter: Filter) -> Result<u64, InternalError> {
        self.flip(Visibility::Active, filter, deleted_now(), false).await
    }

    pub async fn delete_many(&self, filter: Filter) -> Result<u64, InternalError> {
        self.flip(Visibility::Active, filter, deleted_now(), true).await
    }

    /// Raw restore; runs no uniqueness gate.
    pub async fn restore_one(&self, filter: Filter) -> Result<u64, InternalError> {
        self.flip(Visibility::Deleted, filter, Tombstone::Active, false)
            .await
    }

    /// Raw restore; runs no uniqueness gate.
    pub async fn restore_many(&self, filter: Filter) -> Result<u64, InternalError> {
        self.flip(Visibility::Deleted, filter, Tombstone::Active, true)
            .await
    }

    pub async fn destroy_one(&self, filter: Filter) -> Result<u64, InternalError> {
        self.remove(filter, false).await
    }

    pub async fn destroy_many(&self, filter: Filter) -> Result<u64, InternalError> {
        self.remove(filter, true).await
    }

    // ======================================================================
    // Helpers
    // ======================================================================

    fn validator(&self) -> UniqueValidator<'_> {
        UniqueValidator::new(
            self.db.store().as_ref(),
            self.registered,
            self.db.sink().as_ref(),
        )
    }

    fn reject_reserved(&self, fields: &Document) -> Result<(), InternalError> {
        let reserved = fields.keys().find(|key| {
            let root = key.split('.').next().unwrap_or(key);
            RESERVED_FIELD_NAMES.contains(&root)
        });

        match reserved {
            Some(key) => Err(InternalError::interface_unsupported(format!(
                "field '{key}' is reserved on '{}'",
                self.name()
            ))),
            None => Ok(()),
        }
    }

    // Identifier of a caller-supplied record of this collection's type.
    fn own_id(&self, record: &Record) -> Result<RecordId, InternalError> {
        let id = require_id(record)?;
        if record.type_name() != self.name() {
            return Err(InternalError::interface_unsupported(format!(
                "record of type '{}' passed to collection '{}'",
                record.type_name(),
                self.name()
            )));
        }

        Ok(id)
    }

    // Stored state wins over the caller's copy.
    async fn current(&self, id: RecordId) -> Result<Record, InternalError> {
        self.get_with_deleted(id)
            .await?
            .ok_or_else(|| InternalError::record_not_found(self.name(), id))
    }

    async fn flip(
        &self,
        visibility: Visibility,
        filter: Filter,
        tombstone: Tombstone,
        many: bool,
    ) -> Result<u64, InternalError> {
        let kind = if tombstone.is_deleted() {
            ExecKind::Delete
        } else {
            ExecKind::Restore
        };
        let mut span = Span::new(self.db.sink(), kind, self.name());
        let filter = visibility.apply(filter);
        // raw flips never leave a cascade ledger behind
        let patch = Patch::tombstone(tombstone).with_ledger(Ledger::new());

        let store = self.db.store();
        let touched = if many {
            store.update_many(self.name(), &filter, &patch).await?
        } else {
            store.update_one(self.name(), &filter, &patch).await?
        };
        span.set_rows(touched);

        Ok(touched)
    }

    async fn remove(&self, filter: Filter, many: bool) -> Result<u64, InternalError> {
        let mut span = Span::new(self.db.sink(), ExecKind::Destroy, self.name());
        let filter = Visibility::All.apply(filter);

        let store = self.db.store();
        let removed = if many {
            store.delete_many(self.name(), &filter).await?
        } else {
            store.delete_one(self.name(), &filter).await?
        };
        span.set_rows(removed);

        Ok(removed)
    }
}

fn by_id(id: RecordId, visibility: Visibility) -> Filter {
    visibility.apply(Filter::eq(crate::record::ID_PATH, id))
}

fn deleted_now() -> Tombstone {
    Tombstone::Deleted {
        at: Timestamp::now(),
    }
}
