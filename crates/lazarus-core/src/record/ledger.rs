use crate::{record::RecordRef, types::RecordId};
use serde::{Deserialize, Serialize};

///
/// LedgerEntry
///
/// One record tombstoned by a cascade this record triggered.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: RecordId,
    #[serde(rename = "type")]
    pub type_name: String,
}

impl LedgerEntry {
    #[must_use]
    pub fn new(type_name: impl Into<String>, id: RecordId) -> Self {
        Self {
            id,
            type_name: type_name.into(),
        }
    }
}

impl From<RecordRef> for LedgerEntry {
    fn from(target: RecordRef) -> Self {
        Self {
            id: target.id,
            type_name: target.type_name,
        }
    }
}

impl From<&LedgerEntry> for RecordRef {
    fn from(entry: &LedgerEntry) -> Self {
        Self::new(entry.type_name.clone(), entry.id)
    }
}

///
/// Ledger
///
/// Ordered undo log kept on the record a caller deleted directly.
/// Appended during delete commit; pruned entry by entry during restore.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Ledger(Vec<LedgerEntry>);

impl Ledger {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Append an entry; an entry already present keeps its original position.
    pub fn append(&mut self, entry: LedgerEntry) -> bool {
        if self.0.contains(&entry) {
            return false;
        }
        self.0.push(entry);

        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.0.iter()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.0
    }
}

impl FromIterator<LedgerEntry> for Ledger {
    fn from_iter<I: IntoIterator<Item = LedgerEntry>>(iter: I) -> Self {
        let mut ledger = Self::new();
        for entry in iter {
            ledger.append(entry);
        }

        ledger
    }
}

impl<'a> IntoIterator for &'a Ledger {
    type Item = &'a LedgerEntry;
    type IntoIter = std::slice::Iter<'a, LedgerEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
