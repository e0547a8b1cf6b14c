use thiserror::Error;

use crate::object::ObjectKey;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("object not found: {key}")]
    NotFound { key: ObjectKey },

    #[error("object already exists: {key}")]
    AlreadyExists { key: ObjectKey },

    #[error("cannot connect to cluster: {0}")]
    Connection(String),

    #[error("invalid object: {0}")]
    InvalidObject(String),

    #[error("request failed for {key}: {reason}")]
    Request { key: ObjectKey, reason: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
