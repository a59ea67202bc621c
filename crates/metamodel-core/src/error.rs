//! Error taxonomy for metamodel construction and the managed-object layer.
//!
//! - configuration conflicts surface as [`MetaModelError::Validation`] when the
//!   metamodel is created (fatal to boot),
//! - pojo/specification mismatches are [`MetaModelError::IllegalArgument`]
//!   (recoverable by the caller),
//! - calling an operation a managed-object specialization does not support is
//!   [`MetaModelError::UnsupportedOperation`],
//! - paths that are deliberately not built raise
//!   [`MetaModelError::NotImplemented`] instead of returning wrong data.

use metamodel_dsl::DomV1ParseError;
use thiserror::Error;

use crate::validation::ValidationFailures;

pub type Result<T> = std::result::Result<T, MetaModelError>;

#[derive(Debug, Error)]
pub enum MetaModelError {
    #[error("illegal argument: {0}")]
    IllegalArgument(String),

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("illegal state: {0}")]
    IllegalState(String),

    #[error("unknown type `{0}`")]
    UnknownType(String),

    #[error("introspection of `{type_name}` failed: {message}")]
    Introspection { type_name: String, message: String },

    #[error("invalid annotation `@{annotation}` on {target}: {message}")]
    InvalidAnnotation {
        annotation: String,
        target: String,
        message: String,
    },

    #[error("metamodel validation failed:\n{0}")]
    Validation(ValidationFailures),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Parse(#[from] DomV1ParseError),
}

impl MetaModelError {
    pub(crate) fn illegal_argument(message: impl Into<String>) -> Self {
        MetaModelError::IllegalArgument(message.into())
    }

    pub(crate) fn unsupported(message: impl Into<String>) -> Self {
        MetaModelError::UnsupportedOperation(message.into())
    }

    pub(crate) fn not_implemented(message: impl Into<String>) -> Self {
        MetaModelError::NotImplemented(message.into())
    }

    pub fn is_illegal_argument(&self) -> bool {
        matches!(self, MetaModelError::IllegalArgument(_))
    }

    pub fn is_unsupported_operation(&self) -> bool {
        matches!(self, MetaModelError::UnsupportedOperation(_))
    }

    pub fn is_not_implemented(&self) -> bool {
        matches!(self, MetaModelError::NotImplemented(_))
    }
}
