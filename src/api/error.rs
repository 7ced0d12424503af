//! Failure type returned by `ResourceManager` implementations and its classification

use thiserror::Error;

pub const HTTP_UNAUTHORIZED: u16 = 401;

/// Failure of a resource-management operation
#[derive(Debug, Error)]
pub enum ManagementError {
    /// The remote service answered with an error status
    #[error("service returned HTTP {status}: {message}")]
    Service {
        status: u16,
        code: Option<String>,
        message: String,
    },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ManagementError {
    pub fn service(status: u16, message: impl Into<String>) -> Self {
        ManagementError::Service {
            status,
            code: None,
            message: message.into(),
        }
    }

    /// HTTP status of a remote service error, if that is what this is
    pub fn status(&self) -> Option<u16> {
        match self {
            ManagementError::Service { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn class(&self) -> ErrorClass {
        ErrorClass::of(self)
    }
}

/// Whether a failure can be fixed by a fresh token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Authentication,
    Other,
}

impl ErrorClass {
    /// Only a remote 401 counts as an authentication failure. A 403 means the token was
    /// accepted but lacks permission, which a new token does not change.
    pub fn of(error: &ManagementError) -> Self {
        match error.status() {
            Some(HTTP_UNAUTHORIZED) => ErrorClass::Authentication,
            _ => ErrorClass::Other,
        }
    }
}
