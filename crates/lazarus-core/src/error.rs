use crate::db::{
    cascade::ReferenceViolation, identity::IdentityError, unique::UniquenessViolation,
};
use lazarus_schema::error::ConfigurationError;
use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured runtime error with a stable internal classification.
/// Not a stable API; intended for internal use and may change without notice.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured error detail.
    pub detail: Option<ErrorDetail>,
}

impl InternalError {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
            detail: None,
        }
    }

    fn with_detail(
        class: ErrorClass,
        origin: ErrorOrigin,
        message: impl Into<String>,
        detail: ErrorDetail,
    ) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
            detail: Some(detail),
        }
    }

    /// Construct an executor-origin invariant violation.
    pub(crate) fn executor_invariant(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvariantViolation, ErrorOrigin::Executor, message)
    }

    /// Construct an interface-origin unsupported error (bad caller input).
    pub(crate) fn interface_unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Unsupported, ErrorOrigin::Interface, message)
    }

    /// Construct a record-not-found error.
    pub fn record_not_found(type_name: &str, key: impl fmt::Display) -> Self {
        let key = format!("{type_name}:{key}");

        Self::with_detail(
            ErrorClass::NotFound,
            ErrorOrigin::Store,
            format!("record not found: {key}"),
            ErrorDetail::Store(StoreError::NotFound { key }),
        )
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.class, ErrorClass::NotFound)
    }

    #[must_use]
    pub const fn reference_violation(&self) -> Option<&ReferenceViolation> {
        match &self.detail {
            Some(ErrorDetail::Reference(violation)) => Some(violation),
            _ => None,
        }
    }

    #[must_use]
    pub const fn uniqueness_violation(&self) -> Option<&UniquenessViolation> {
        match &self.detail {
            Some(ErrorDetail::Uniqueness(violation)) => Some(violation),
            _ => None,
        }
    }

    #[must_use]
    pub const fn configuration_error(&self) -> Option<&ConfigurationError> {
        match &self.detail {
            Some(ErrorDetail::Configuration(err)) => Some(err),
            _ => None,
        }
    }

    #[must_use]
    pub const fn identity_error(&self) -> Option<&IdentityError> {
        match &self.detail {
            Some(ErrorDetail::Identity(err)) => Some(err),
            _ => None,
        }
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

impl From<StoreError> for InternalError {
    fn from(err: StoreError) -> Self {
        let class = match &err {
            StoreError::NotFound { .. } => ErrorClass::NotFound,
            StoreError::DuplicateKey { .. } => ErrorClass::Conflict,
            StoreError::Corrupt { .. } => ErrorClass::Corruption,
            StoreError::InvariantViolation { .. } => ErrorClass::InvariantViolation,
            StoreError::Backend { .. } => ErrorClass::Internal,
        };

        Self::with_detail(
            class,
            ErrorOrigin::Store,
            err.to_string(),
            ErrorDetail::Store(err),
        )
    }
}

impl From<ConfigurationError> for InternalError {
    fn from(err: ConfigurationError) -> Self {
        Self::with_detail(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Registry,
            err.to_string(),
            ErrorDetail::Configuration(err),
        )
    }
}

impl From<ReferenceViolation> for InternalError {
    fn from(err: ReferenceViolation) -> Self {
        Self::with_detail(
            ErrorClass::Conflict,
            ErrorOrigin::Executor,
            err.to_string(),
            ErrorDetail::Reference(err),
        )
    }
}

impl From<UniquenessViolation> for InternalError {
    fn from(err: UniquenessViolation) -> Self {
        Self::with_detail(
            ErrorClass::Conflict,
            ErrorOrigin::Executor,
            err.to_string(),
            ErrorDetail::Uniqueness(err),
        )
    }
}

impl From<IdentityError> for InternalError {
    fn from(err: IdentityError) -> Self {
        Self::with_detail(
            ErrorClass::Unsupported,
            ErrorOrigin::Interface,
            err.to_string(),
            ErrorDetail::Identity(err),
        )
    }
}

///
/// ErrorDetail
///
/// Structured, origin-specific error detail carried by [`InternalError`].
///

#[derive(Debug, ThisError)]
pub enum ErrorDetail {
    #[error("{0}")]
    Store(StoreError),

    #[error("{0}")]
    Configuration(ConfigurationError),

    #[error("{0}")]
    Reference(ReferenceViolation),

    #[error("{0}")]
    Uniqueness(UniquenessViolation),

    #[error("{0}")]
    Identity(IdentityError),
}

///
/// StoreError
///
/// Failure reported by a persistence backend.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum StoreError {
    #[error("key not found: {key}")]
    NotFound { key: String },

    #[error("duplicate key: {key}")]
    DuplicateKey { key: String },

    #[error("store corruption: {message}")]
    Corrupt { message: String },

    #[error("store invariant violation: {message}")]
    InvariantViolation { message: String },

    #[error("store backend error: {message}")]
    Backend { message: String },
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Corruption,
    NotFound,
    Internal,
    Conflict,
    Unsupported,
    InvariantViolation,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Corruption => "corruption",
            Self::NotFound => "not_found",
            Self::Internal => "internal",
            Self::Conflict => "conflict",
            Self::Unsupported => "unsupported",
            Self::InvariantViolation => "invariant_violation",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Store,
    Registry,
    Executor,
    Interface,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Store => "store",
            Self::Registry => "registry",
            Self::Executor => "executor",
            Self::Interface => "interface",
        };
        write!(f, "{label}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_keep_class_and_detail() {
        let err = InternalError::from(StoreError::DuplicateKey {
            key: "User:01".to_string(),
        });

        assert_eq!(err.class, ErrorClass::Conflict);
        assert_eq!(err.origin, ErrorOrigin::Store);
        assert!(matches!(
            err.detail,
            Some(ErrorDetail::Store(StoreError::DuplicateKey { .. }))
        ));
    }

    #[test]
    fn record_not_found_is_classified_not_found() {
        let err = InternalError::record_not_found("Shop", "01ABC");

        assert!(err.is_not_found());
        assert_eq!(err.display_with_class(), "store:not_found: record not found: Shop:01ABC");
    }

    #[test]
    fn configuration_errors_are_invariant_violations() {
        let err = InternalError::from(ConfigurationError::unknown_type("Ghost"));

        assert_eq!(err.class, ErrorClass::InvariantViolation);
        assert_eq!(err.origin, ErrorOrigin::Registry);
        assert!(err.configuration_error().is_some());
    }
}
