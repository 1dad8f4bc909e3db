pub mod field;
pub mod policy;
pub mod type_def;
pub mod unique;

pub use field::{FieldDef, FieldKind, RefTarget, lookup_path, lookup_siblings};
pub use policy::{
    CleanDef, ComposedPathsDef, DeletePolicyDef, ErrorOnReferencedDef, ForeignPathDef,
    TypeOptions,
};
pub use type_def::TypeDef;
pub use unique::UniqueDef;
