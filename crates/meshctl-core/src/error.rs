use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid overlay {input:?}: {reason}")]
    InvalidOverlay { input: String, reason: String },

    #[error("invalid field path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("invalid revision {revision:?}: {reason}")]
    InvalidRevision { revision: String, reason: String },
}
