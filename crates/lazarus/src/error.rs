use derive_more::Display;
use lazarus_core::{
    db::{Blocker, ReferenceViolation, UniquenessViolation},
    error::{ErrorClass, ErrorDetail, ErrorOrigin as CoreErrorOrigin, InternalError},
};
use lazarus_schema::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// Error
/// Public error type with a stable kind + origin taxonomy.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.kind, ErrorKind::NotFound)
    }
}

impl From<InternalError> for Error {
    fn from(err: InternalError) -> Self {
        let kind = match &err.detail {
            Some(ErrorDetail::Configuration(_)) => ErrorKind::Configuration,
            Some(ErrorDetail::Reference(violation)) => {
                ErrorKind::ReferenceViolation(violation.into())
            }
            Some(ErrorDetail::Uniqueness(violation)) => {
                ErrorKind::UniquenessViolation(violation.into())
            }
            Some(ErrorDetail::Identity(_)) => ErrorKind::Identity,
            _ => match err.class {
                ErrorClass::NotFound => ErrorKind::NotFound,
                ErrorClass::Unsupported => ErrorKind::Invalid,
                ErrorClass::Conflict => ErrorKind::Conflict,
                ErrorClass::Corruption | ErrorClass::Internal | ErrorClass::InvariantViolation => {
                    ErrorKind::Internal
                }
            },
        };

        Self::new(kind, err.origin.into(), err.message)
    }
}

impl From<ConfigurationError> for Error {
    fn from(err: ConfigurationError) -> Self {
        Self::new(ErrorKind::Configuration, ErrorOrigin::Registry, err.to_string())
    }
}

///
/// ErrorKind
/// Public error taxonomy for callers.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ErrorKind {
    /// Type or policy declarations are inconsistent; fatal to startup.
    Configuration,

    /// Delete refused; guarded records are still referenced.
    ReferenceViolation(ReferenceErrorKind),

    /// Write or restore would duplicate a unique value among live records.
    UniquenessViolation(UniquenessErrorKind),

    /// The record acted on has a missing or invalid identifier.
    Identity,

    /// Target record does not exist.
    NotFound,

    /// Caller input the engine refuses (reserved fields, wrong type).
    Invalid,

    /// Store-level conflict such as a duplicate key.
    Conflict,

    /// The caller cannot remediate this.
    Internal,
}

///
/// ReferenceErrorKind
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ReferenceErrorKind {
    pub root: String,
    pub blockers: Vec<BlockerInfo>,
}

impl From<&ReferenceViolation> for ReferenceErrorKind {
    fn from(violation: &ReferenceViolation) -> Self {
        Self {
            root: violation.root.to_string(),
            blockers: violation.blockers.iter().map(BlockerInfo::from).collect(),
        }
    }
}

///
/// BlockerInfo
///
/// target → `Type:id` of the guarded record
/// ids    → blocking record ids, possibly truncated; `count` is exact
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct BlockerInfo {
    pub target: String,
    pub source_type: String,
    pub fields: Vec<String>,
    pub count: u64,
    pub ids: Vec<String>,
}

impl From<&Blocker> for BlockerInfo {
    fn from(blocker: &Blocker) -> Self {
        Self {
            target: blocker.target.to_string(),
            source_type: blocker.source_type.clone(),
            fields: blocker.fields.clone(),
            count: blocker.count,
            ids: blocker.ids.iter().map(ToString::to_string).collect(),
        }
    }
}

///
/// UniquenessErrorKind
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct UniquenessErrorKind {
    pub type_name: String,
    pub paths: Vec<String>,
}

impl From<&UniquenessViolation> for UniquenessErrorKind {
    fn from(violation: &UniquenessViolation) -> Self {
        Self {
            type_name: violation.type_name.clone(),
            paths: violation.paths.clone(),
        }
    }
}

///
/// ErrorOrigin
/// Public origin taxonomy for callers.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorOrigin {
    Executor,
    Interface,
    Registry,
    Store,
}

impl From<CoreErrorOrigin> for ErrorOrigin {
    fn from(origin: CoreErrorOrigin) -> Self {
        match origin {
            CoreErrorOrigin::Executor => Self::Executor,
            CoreErrorOrigin::Interface => Self::Interface,
            CoreErrorOrigin::Registry => Self::Registry,
            CoreErrorOrigin::Store => Self::Store,
        }
    }
}
