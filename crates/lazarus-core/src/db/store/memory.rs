use crate::{
    db::{
        filter::Filter,
        store::{DocumentStore, Patch, Projection},
    },
    error::StoreError,
    record::Record,
    types::RecordId,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;

///
/// MemoryStore
///
/// Process-local store: one insertion-ordered collection per type name.
/// Every call holds the lock for its whole duration, so single calls are
/// atomic; nothing spans calls.
///

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<BTreeMap<String, Vec<Record>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total records held across all collections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.collections.read().values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn key(record: &Record) -> Result<RecordId, StoreError> {
        record.id().ok_or_else(|| StoreError::InvariantViolation {
            message: format!("record of type '{}' has no identifier", record.type_name()),
        })
    }

    fn check_new(existing: &[Record], record: &Record) -> Result<RecordId, StoreError> {
        let id = Self::key(record)?;
        if existing.iter().any(|r| r.id() == Some(id)) {
            return Err(StoreError::DuplicateKey {
                key: format!("{}:{id}", record.type_name()),
            });
        }

        Ok(id)
    }

    fn update(&self, type_name: &str, filter: &Filter, patch: &Patch, limit: Option<usize>) -> u64 {
        let mut guard = self.collections.write();
        let Some(records) = guard.get_mut(type_name) else {
            return 0;
        };

        let mut touched = 0usize;
        for record in records.iter_mut().filter(|r| filter.matches(r)) {
            if limit.is_some_and(|limit| touched >= limit) {
                break;
            }
            patch.apply(record);
            touched += 1;
        }

        touched as u64
    }

    fn delete(&self, type_name: &str, filter: &Filter, limit: Option<usize>) -> u64 {
        let mut guard = self.collections.write();
        let Some(records) = guard.get_mut(type_name) else {
            return 0;
        };

        let mut removed = 0usize;
        records.retain(|record| {
            let keep = limit.is_some_and(|limit| removed >= limit) || !filter.matches(record);
            if !keep {
                removed += 1;
            }
            keep
        });

        removed as u64
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(
        &self,
        type_name: &str,
        filter: &Filter,
        projection: Option<&Projection>,
    ) -> Result<Vec<Record>, StoreError> {
        let guard = self.collections.read();
        let Some(records) = guard.get(type_name) else {
            return Ok(Vec::new());
        };

        Ok(records
            .iter()
            .filter(|r| filter.matches(r))
            .map(|r| projection.map_or_else(|| r.clone(), |p| p.apply(r)))
            .collect())
    }

    async fn count(&self, type_name: &str, filter: &Filter) -> Result<u64, StoreError> {
        let guard = self.collections.read();
        let count = guard
            .get(type_name)
            .map_or(0, |records| records.iter().filter(|r| filter.matches(r)).count());

        Ok(count as u64)
    }

    async fn update_one(
        &self,
        type_name: &str,
        filter: &Filter,
        patch: &Patch,
    ) -> Result<u64, StoreError> {
        Ok(self.update(type_name, filter, patch, Some(1)))
    }

    async fn update_many(
        &self,
        type_name: &str,
        filter: &Filter,
        patch: &Patch,
    ) -> Result<u64, StoreError> {
        Ok(self.update(type_name, filter, patch, None))
    }

    async fn insert_one(&self, record: Record) -> Result<RecordId, StoreError> {
        let mut guard = self.collections.write();
        let records = guard.entry(record.type_name().to_string()).or_default();
        let id = Self::check_new(records, &record)?;
        records.push(record);

        Ok(id)
    }

    async fn insert_many(&self, records: Vec<Record>) -> Result<Vec<RecordId>, StoreError> {
        let mut guard = self.collections.write();

        // validate the whole batch before writing any of it
        let mut ids = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            let existing = guard.get(record.type_name()).map_or(&[][..], Vec::as_slice);
            let id = Self::check_new(existing, record)?;
            let repeated = records[..i]
                .iter()
                .any(|r| r.type_name() == record.type_name() && r.id() == Some(id));
            if repeated {
                return Err(StoreError::DuplicateKey {
                    key: format!("{}:{id}", record.type_name()),
                });
            }
            ids.push(id);
        }

        for record in records {
            guard
                .entry(record.type_name().to_string())
                .or_default()
                .push(record);
        }

        Ok(ids)
    }

    async fn delete_one(&self, type_name: &str, filter: &Filter) -> Result<u64, StoreError> {
        Ok(self.delete(type_name, filter, Some(1)))
    }

    async fn delete_many(&self, type_name: &str, filter: &Filter) -> Result<u64, StoreError> {
        Ok(self.delete(type_name, filter, None))
    }
}
