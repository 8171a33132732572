//! Error types for the generation-to-archive pipeline.
//!
//! Every failure the pipeline can report maps onto one variant of
//! [`PipelineError`]. Errors raised before the archive sink has been opened
//! can still be serialized into the JSON [`ErrorResponse`] body; once bytes
//! are streaming, a failure simply terminates the stream and is only
//! observable through logs and a truncated download.

use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while expanding, rendering, or archiving a batch.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The request itself is malformed (missing instruction, empty batch).
    #[error("{0}")]
    Validation(String),

    /// The process configuration is unusable (bad base URL, missing API key).
    #[error("configuration error: {0}")]
    Config(String),

    /// The generation service failed outright, or returned output that no
    /// parsing strategy could recover.
    #[error("generation failed: {0}")]
    Generation(String),

    /// One document could not be rendered. Fatal for the whole archive.
    #[error("render failed: {0}")]
    Render(String),

    /// The archive container was driven through an invalid transition or
    /// could not be assembled.
    #[error("archive error: {0}")]
    Archive(String),

    /// The zip container failed to write an entry or its trailing index.
    #[error("archive write error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// I/O error from the output sink or the filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// True when the failure was caused by the caller's input rather than
    /// the pipeline or its collaborators.
    pub fn is_client_error(&self) -> bool {
        matches!(self, PipelineError::Validation(_))
    }
}

/// JSON body returned to callers for failures detected before any archive
/// bytes have been streamed: `{ "error": "..." }`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl From<&PipelineError> for ErrorResponse {
    fn from(err: &PipelineError) -> Self {
        ErrorResponse {
            error: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_is_client_error() {
        let err = PipelineError::Validation("Please provide a longer master instruction.".into());
        assert!(err.is_client_error());
    }

    #[test]
    fn test_other_variants_are_server_errors() {
        assert!(!PipelineError::Generation("boom".into()).is_client_error());
        assert!(!PipelineError::Render("boom".into()).is_client_error());
        assert!(!PipelineError::Archive("boom".into()).is_client_error());
        assert!(!PipelineError::Config("boom".into()).is_client_error());
    }

    #[test]
    fn test_error_response_shape() {
        let err = PipelineError::Validation("bad input".into());
        let body = serde_json::to_string(&ErrorResponse::from(&err)).unwrap();
        assert_eq!(body, r#"{"error":"bad input"}"#);
    }
}
