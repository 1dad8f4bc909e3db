//! Core runtime for lazarus: soft deletion and cascading referential
//! integrity over a typed document store.
//!
//! Records are tombstoned instead of removed, reads hide tombstones unless
//! asked, deletes cascade across declared references under a
//! plan-then-commit discipline, and an undo ledger lets a restore reverse
//! exactly what a delete touched.

// public exports are one module level down
pub mod db;
pub mod error;
pub mod obs;
pub mod record;
pub mod types;
pub mod value;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, stores, or engine internals are re-exported here.
///

pub mod prelude {
    pub use crate::{
        db::{DeleteOptions, DestroyOptions, Filter, Visibility},
        record::{Document, Record, RecordRef},
        types::{RecordId, Timestamp},
        value::Value,
    };
}
