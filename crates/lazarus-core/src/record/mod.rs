mod document;
mod ledger;

pub use document::Document;
pub use ledger::{Ledger, LedgerEntry};

use crate::{
    types::{RecordId, Timestamp},
    value::Value,
};
use derive_more::Display;
use serde::{Serialize, Serializer, ser::SerializeMap};
use std::borrow::Cow;

/// Filter path addressing the record identifier.
pub const ID_PATH: &str = "_id";
/// Filter path addressing the tombstone flag.
pub const DELETED_PATH: &str = "deleted";
/// Filter path addressing the tombstone timestamp.
pub const DELETED_AT_PATH: &str = "deletedAt";

///
/// RecordRef
///
/// Typed pointer to one stored record.
///

#[derive(Clone, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display("{type_name}:{id}")]
pub struct RecordRef {
    pub type_name: String,
    pub id: RecordId,
}

impl RecordRef {
    #[must_use]
    pub fn new(type_name: impl Into<String>, id: RecordId) -> Self {
        Self {
            type_name: type_name.into(),
            id,
        }
    }
}

///
/// Tombstone
///
/// Lifecycle flag of a record. `deleted` and `deletedAt` are both read from
/// this one value, so they cannot disagree.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Tombstone {
    #[default]
    Active,
    Deleted {
        at: Timestamp,
    },
}

impl Tombstone {
    #[must_use]
    pub const fn is_deleted(self) -> bool {
        matches!(self, Self::Deleted { .. })
    }

    #[must_use]
    pub const fn deleted_at(self) -> Option<Timestamp> {
        match self {
            Self::Active => None,
            Self::Deleted { at } => Some(at),
        }
    }
}

///
/// Record
///
/// One stored document with its reserved lifecycle attributes.
/// The ledger is never serialized; read it with [`Record::deleted_refs`].
///

#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub(crate) id: Option<RecordId>,
    pub(crate) type_name: String,
    pub(crate) fields: Document,
    pub(crate) tombstone: Tombstone,
    pub(crate) ledger: Ledger,
}

impl Record {
    /// New active record without an identifier.
    #[must_use]
    pub fn new(type_name: impl Into<String>, fields: Document) -> Self {
        Self {
            id: None,
            type_name: type_name.into(),
            fields,
            tombstone: Tombstone::Active,
            ledger: Ledger::new(),
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: RecordId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub const fn id(&self) -> Option<RecordId> {
        self.id
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[must_use]
    pub const fn fields(&self) -> &Document {
        &self.fields
    }

    #[must_use]
    pub const fn tombstone(&self) -> Tombstone {
        self.tombstone
    }

    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.tombstone.is_deleted()
    }

    #[must_use]
    pub const fn deleted_at(&self) -> Option<Timestamp> {
        self.tombstone.deleted_at()
    }

    /// Cascade bookkeeping written when this record was deleted directly.
    #[must_use]
    pub const fn deleted_refs(&self) -> &Ledger {
        &self.ledger
    }

    /// Typed pointer to this record, when it has an identifier.
    #[must_use]
    pub fn target(&self) -> Option<RecordRef> {
        self.id.map(|id| RecordRef::new(self.type_name.clone(), id))
    }

    /// Resolve a filter path against this record, including reserved paths.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Vec<Cow<'_, Value>> {
        match path {
            ID_PATH => self
                .id
                .map(|id| Cow::Owned(Value::from(id)))
                .into_iter()
                .collect(),
            DELETED_PATH => vec![Cow::Owned(Value::Bool(self.is_deleted()))],
            DELETED_AT_PATH => vec![Cow::Owned(Value::from(self.deleted_at()))],
            _ => self.fields.resolve(path).into_iter().map(Cow::Borrowed).collect(),
        }
    }

    /// Copy of this record reduced to the given fields.
    #[must_use]
    pub fn project(&self, fields: &[String]) -> Self {
        Self {
            fields: self.fields.project(fields),
            ..self.clone()
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 3))?;
        map.serialize_entry(ID_PATH, &self.id)?;
        map.serialize_entry(DELETED_PATH, &self.is_deleted())?;
        map.serialize_entry(DELETED_AT_PATH, &self.deleted_at())?;
        for (name, value) in self.fields.iter() {
            map.serialize_entry(name, value)?;
        }

        map.end()
    }
}
