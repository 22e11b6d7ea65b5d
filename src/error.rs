//! Error taxonomy for the signing engine.
//!
//! `SignError` is what callers see. Lower layers (`PdfError`, `StorageError`)
//! fold into `SignError::Internal`, whose detail never leaves the process:
//! `public_message` hides it and the pipeline logs it instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("unsupported field type: {0}")]
    UnsupportedKind(String),

    #[error("document not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type SignResult<T> = Result<T, SignError>;

impl SignError {
    /// HTTP-style status code for the error class.
    pub fn status(&self) -> u16 {
        match self {
            SignError::Validation(_) | SignError::UnsupportedKind(_) | SignError::Conflict(_) => {
                400
            }
            SignError::NotFound(_) => 404,
            SignError::Internal(_) => 500,
        }
    }

    /// Message safe to hand back to an untrusted caller.
    pub fn public_message(&self) -> String {
        match self {
            SignError::Internal(_) => "Failed to process document".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<crate::features::pdf::PdfError> for SignError {
    fn from(err: crate::features::pdf::PdfError) -> Self {
        SignError::Internal(err.to_string())
    }
}

impl From<crate::features::storage::StorageError> for SignError {
    fn from(err: crate::features::storage::StorageError) -> Self {
        SignError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for SignError {
    fn from(err: serde_json::Error) -> Self {
        SignError::Validation(format!("malformed json: {err}"))
    }
}
