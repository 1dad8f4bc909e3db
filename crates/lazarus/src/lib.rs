//! ## Crate layout
//! - `core`: runtime engine; records, stores, visibility, uniqueness, cascades, and metrics.
//! - `schema`: type declarations, delete policies, and their validation.
//! - `error`: public error type with a stable kind + origin taxonomy.
//!
//! The `prelude` module carries what application code needs to declare types,
//! open a `Db`, and run the record lifecycle.

pub use lazarus_core as core;
pub use lazarus_schema as schema;

pub mod error;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//
// Re-exports
//

pub use core::db::{Collection, Db, DbConfig, DocumentStore, MemoryStore, Registry};
pub use error::Error;

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        Error,
        core::{
            db::{
                CascadeReport, Collection, Db, DbConfig, DeleteOptions, DestroyOptions, Filter,
                Registry, RestoreReport, Visibility,
            },
            record::{Document, Record, RecordRef},
            types::{RecordId, Timestamp},
            value::Value,
        },
        schema::node::{DeletePolicyDef, FieldDef, FieldKind, ForeignPathDef, TypeDef, TypeOptions},
    };
}
