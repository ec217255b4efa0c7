use thiserror::Error;

use crate::types::JsValue;

/// The language-level error constructor a [`JsError`] maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Type,
    Range,
    Reference,
    Thrown,
}

#[derive(Debug, Clone, Error)]
pub enum JsError {
    #[error("TypeError: {0}")]
    TypeError(String),
    #[error("RangeError: {0}")]
    RangeError(String),
    #[error("ReferenceError: {0}")]
    ReferenceError(String),
    /// A value thrown by a host callback, passed through untouched.
    #[error("Uncaught {0}")]
    Throw(JsValue),
}

impl JsError {
    pub fn type_error(msg: impl Into<String>) -> Self {
        JsError::TypeError(msg.into())
    }

    pub fn range_error(msg: impl Into<String>) -> Self {
        JsError::RangeError(msg.into())
    }

    pub fn reference_error(msg: impl Into<String>) -> Self {
        JsError::ReferenceError(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            JsError::TypeError(_) => ErrorKind::Type,
            JsError::RangeError(_) => ErrorKind::Range,
            JsError::ReferenceError(_) => ErrorKind::Reference,
            JsError::Throw(_) => ErrorKind::Thrown,
        }
    }
}

pub type JsResult<T> = Result<T, JsError>;
