//! Declaration-level validation: everything checkable against one type
//! definition in isolation. Cross-type checks belong to the runtime registry.

pub mod naming;

pub use naming::{MAX_TYPE_NAME_LEN, RESERVED_FIELD_NAMES};
