//! Crate-wide error type for collaborator clients and the pipeline.

use thiserror::Error;

/// Errors produced by the collaborator clients and the analysis pipeline.
#[derive(Error, Debug)]
pub enum RcaError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Kubernetes API call failed.
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Model returned output the pipeline cannot use.
    #[error("Model output error: {0}")]
    ModelOutput(String),
}

/// Convenience result alias.
pub type RcaResult<T> = Result<T, RcaError>;
