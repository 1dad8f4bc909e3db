//! Declarative type schema for lazarus: record types, their fields and
//! reference targets, uniqueness constraints, and delete policies.
//!
//! Nothing here touches storage. The runtime registry in `lazarus-core`
//! compiles these definitions once, at registration time.

pub mod error;
pub mod node;
pub mod validate;

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        error::{ConfigurationError, ErrorTree},
        node::{
            DeletePolicyDef, FieldDef, FieldKind, ForeignPathDef, RefTarget, TypeDef,
            TypeOptions, UniqueDef,
        },
    };
}
