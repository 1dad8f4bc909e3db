use crate::{err, error::ErrorTree};

/// Maximum type name length in bytes.
pub const MAX_TYPE_NAME_LEN: usize = 64;

/// Attribute names owned by the soft-delete layer; never user fields.
pub const RESERVED_FIELD_NAMES: &[&str] = &["_id", "deleted", "deletedAt", "deletedRefs"];

// Validate one type name: non-empty, ASCII identifier, bounded length.
pub fn validate_type_name(name: &str, errs: &mut ErrorTree) {
    if name.is_empty() {
        err!(errs, "type name is empty");
        return;
    }
    if name.len() > MAX_TYPE_NAME_LEN {
        err!(
            errs,
            "type name length {} exceeds max {MAX_TYPE_NAME_LEN}",
            name.len()
        );
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        err!(errs, "type name '{name}' must be an ASCII identifier");
    }
}

// Validate one field name segment.
pub fn validate_field_name(name: &str, errs: &mut ErrorTree) {
    if name.is_empty() {
        err!(errs, "field name is empty");
    } else if name.contains('.') {
        err!(errs, "field name '{name}' must not contain '.'");
    } else if RESERVED_FIELD_NAMES.contains(&name) {
        err!(errs, "field name '{name}' is reserved");
    }
}
