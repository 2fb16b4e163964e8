//! Network model and indexing errors.

use hn_core::HnError;
use thiserror::Error;

/// Errors raised while building, validating, indexing or loading a network.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: &'static str },

    #[error("Link {link} refers to missing node {node}")]
    MissingNode { link: String, node: String },

    #[error("{owner} refers to missing pattern {pattern}")]
    MissingPattern { owner: String, pattern: String },

    #[error("{owner} refers to missing curve {curve}")]
    MissingCurve { owner: String, curve: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: f64,
        reason: &'static str,
    },

    #[error("Network has no reservoir or tank to fix heads")]
    NoFixedHead,

    #[error("Unknown {what} id: {id}")]
    UnknownId { what: &'static str, id: String },

    #[error("Unsupported network file extension: {path}")]
    UnsupportedFormat { path: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type NetworkResult<T> = Result<T, NetworkError>;

impl From<NetworkError> for HnError {
    fn from(err: NetworkError) -> Self {
        HnError::Invariant {
            what: err.to_string(),
        }
    }
}
