//! Fault taxonomy shared by the binder and the group backends.

use std::fmt;

use thiserror::Error;

/// Result type alias for anything that can surface a protocol fault.
pub type FaultResult<T> = Result<T, Fault>;

/// The closed set of failure kinds exposed to API clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MissingParameter,
    InvalidParameterValue,
    AlreadyExists,
    InternalFailure,
}

impl ErrorKind {
    /// Fault code as written on the wire.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::MissingParameter => "MissingParameter",
            ErrorKind::InvalidParameterValue => "InvalidParameterValue",
            ErrorKind::AlreadyExists => "AlreadyExists",
            ErrorKind::InternalFailure => "InternalFailure",
        }
    }

    /// Whether the caller (rather than the service) is at fault.
    pub fn is_client_fault(self) -> bool {
        !matches!(self, ErrorKind::InternalFailure)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A structured failure: a kind plus human-readable detail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    /// A required parameter is absent from the request.
    #[error("MissingParameter: {0}")]
    MissingParameter(String),

    /// A value failed conversion, or the request names something that does not exist.
    #[error("InvalidParameterValue: {0}")]
    InvalidParameterValue(String),

    /// A create targeted a name that is already taken.
    #[error("AlreadyExists: {0}")]
    AlreadyExists(String),

    /// Invariant violation, reconciliation divergence, or an unclassified remote error.
    #[error("InternalFailure: {0}")]
    InternalFailure(String),
}

impl Fault {
    pub fn missing(detail: impl Into<String>) -> Self {
        Fault::MissingParameter(detail.into())
    }

    pub fn invalid(detail: impl Into<String>) -> Self {
        Fault::InvalidParameterValue(detail.into())
    }

    pub fn exists(detail: impl Into<String>) -> Self {
        Fault::AlreadyExists(detail.into())
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Fault::InternalFailure(detail.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Fault::MissingParameter(_) => ErrorKind::MissingParameter,
            Fault::InvalidParameterValue(_) => ErrorKind::InvalidParameterValue,
            Fault::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Fault::InternalFailure(_) => ErrorKind::InternalFailure,
        }
    }

    /// The human detail without the kind prefix.
    pub fn detail(&self) -> &str {
        match self {
            Fault::MissingParameter(d)
            | Fault::InvalidParameterValue(d)
            | Fault::AlreadyExists(d)
            | Fault::InternalFailure(d) => d,
        }
    }
}
