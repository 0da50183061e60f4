// error.rs: Error types for fleet data access.

use std::path::PathBuf;

use fg_approval::ApprovalError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A referenced record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// A uniqueness or transactional conflict; nothing was written.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backing store cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A proposal state change was rejected by the lifecycle rules.
    #[error(transparent)]
    Approval(#[from] ApprovalError),
}

impl StoreError {
    pub(crate) fn not_found(kind: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Failures of the store itself rather than of the request.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            StoreError::Unavailable(_) | StoreError::Io { .. } | StoreError::Serialization(_)
        )
    }
}
