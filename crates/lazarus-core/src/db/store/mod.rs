//! Persistence boundary.
//!
//! The engine only ever talks to storage through [`DocumentStore`]; the store
//! applies no visibility rules of its own.

mod memory;

pub use memory::MemoryStore;

use crate::{
    db::filter::Filter,
    error::StoreError,
    record::{Document, Ledger, Record, Tombstone},
    types::RecordId,
    value::Value,
};
use async_trait::async_trait;

///
/// DocumentStore
///
/// Find/insert/update/delete by filter over typed collections.
/// Update and delete return the number of records affected.
///

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(
        &self,
        type_name: &str,
        filter: &Filter,
        projection: Option<&Projection>,
    ) -> Result<Vec<Record>, StoreError>;

    async fn count(&self, type_name: &str, filter: &Filter) -> Result<u64, StoreError>;

    async fn update_one(
        &self,
        type_name: &str,
        filter: &Filter,
        patch: &Patch,
    ) -> Result<u64, StoreError>;

    async fn update_many(
        &self,
        type_name: &str,
        filter: &Filter,
        patch: &Patch,
    ) -> Result<u64, StoreError>;

    /// Insert one record; the record must already carry its identifier.
    async fn insert_one(&self, record: Record) -> Result<RecordId, StoreError>;

    /// Insert a batch; nothing is written when any record is rejected.
    async fn insert_many(&self, records: Vec<Record>) -> Result<Vec<RecordId>, StoreError>;

    async fn delete_one(&self, type_name: &str, filter: &Filter) -> Result<u64, StoreError>;

    async fn delete_many(&self, type_name: &str, filter: &Filter) -> Result<u64, StoreError>;
}

///
/// Projection
///
/// Top-level fields to keep on returned records. Reserved attributes are
/// always kept.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Projection {
    fields: Vec<String>,
}

impl Projection {
    #[must_use]
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    #[must_use]
    pub fn apply(&self, record: &Record) -> Record {
        record.project(&self.fields)
    }
}

///
/// Patch
///
/// Partial update applied to every matched record.
///
/// set       → dotted path assignments
/// unset     → dotted paths to remove
/// tombstone → lifecycle transition
/// ledger    → full replacement of the undo ledger
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Patch {
    pub set: Document,
    pub unset: Vec<String>,
    pub tombstone: Option<Tombstone>,
    pub ledger: Option<Ledger>,
}

impl Patch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Patch that only moves a record to the given lifecycle state.
    #[must_use]
    pub fn tombstone(tombstone: Tombstone) -> Self {
        Self {
            tombstone: Some(tombstone),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn set(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set.insert(path, value);
        self
    }

    #[must_use]
    pub fn unset(mut self, path: impl Into<String>) -> Self {
        self.unset.push(path.into());
        self
    }

    #[must_use]
    pub fn with_ledger(mut self, ledger: Ledger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
            && self.unset.is_empty()
            && self.tombstone.is_none()
            && self.ledger.is_none()
    }

    /// Apply this patch to a record in place.
    pub fn apply(&self, record: &mut Record) {
        for (path, value) in self.set.iter() {
            record.fields.set_path(path, value.clone());
        }
        for path in &self.unset {
            record.fields.unset_path(path);
        }
        if let Some(tombstone) = self.tombstone {
            record.tombstone = tombstone;
        }
        if let Some(ledger) = &self.ledger {
            record.ledger = ledger.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{record::LedgerEntry, types::Timestamp};

    #[test]
    fn patch_applies_every_part() {
        let mut record = Record::new(
            "User",
            Document::new().with("name", "ada").with("nick", "a"),
        );
        let ledger: Ledger = [LedgerEntry::new("Shop", RecordId::generate())]
            .into_iter()
            .collect();
        let at = Timestamp::from_millis(5);

        Patch::tombstone(Tombstone::Deleted { at })
            .set("profile.email", "ada@example.com")
            .unset("nick")
            .with_ledger(ledger.clone())
            .apply(&mut record);

        assert_eq!(record.deleted_at(), Some(at));
        assert_eq!(
            record.fields().resolve("profile.email"),
            vec![&Value::from("ada@example.com")]
        );
        assert!(record.fields().get("nick").is_none());
        assert_eq!(record.deleted_refs(), &ledger);
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(Patch::new().is_empty());
        assert!(!Patch::new().unset("x").is_empty());
    }
}
