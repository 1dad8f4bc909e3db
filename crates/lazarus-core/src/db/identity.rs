use crate::{record::Record, types::RecordId};
use thiserror::Error as ThisError;

///
/// IdentityError
///
/// The record a caller acted on has no usable identifier.
/// Raised before any query is issued.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum IdentityError {
    #[error("record of type '{type_name}' has no identifier")]
    Missing { type_name: String },

    #[error("record of type '{type_name}' has an invalid identifier: {reason}")]
    Invalid { type_name: String, reason: String },
}

/// Identifier of a record the caller passed in, or why it is unusable.
pub fn require_id(record: &Record) -> Result<RecordId, IdentityError> {
    let id = record.id().ok_or_else(|| IdentityError::Missing {
        type_name: record.type_name().to_string(),
    })?;
    check_id(record.type_name(), id)
}

/// Reject the nil identifier.
pub fn check_id(type_name: &str, id: RecordId) -> Result<RecordId, IdentityError> {
    if id.is_nil() {
        return Err(IdentityError::Invalid {
            type_name: type_name.to_string(),
            reason: "nil identifier".to_string(),
        });
    }

    Ok(id)
}

/// Parse a textual identifier.
pub fn parse_id(type_name: &str, raw: &str) -> Result<RecordId, IdentityError> {
    let id = raw.parse::<RecordId>().map_err(|err| IdentityError::Invalid {
        type_name: type_name.to_string(),
        reason: format!("'{raw}': {err}"),
    })?;
    check_id(type_name, id)
}
