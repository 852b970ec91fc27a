//! Kernel error types.

use blocktree_api::{BlockId, TreeId};
use thiserror::Error;

/// Failures of the persistent key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store lock poisoned")]
    Poisoned,

    #[error("{0}")]
    Other(String),
}

/// Errors returned by navigation and tree-list operations.
///
/// Everything except [`NavError::Store`] is a rejection: the operation did not
/// happen and persisted state is unchanged.
#[derive(Debug, Error)]
pub enum NavError {
    #[error("Already at root")]
    AlreadyAtRoot,

    #[error("Cannot remove last tree")]
    CannotRemoveLastTree,

    #[error("Invalid level {level} for path of length {len}")]
    InvalidLevel { level: usize, len: usize },

    #[error("Block not found: {0}")]
    BlockNotFound(BlockId),

    #[error("Tree not found: {0}")]
    TreeNotFound(TreeId),

    #[error("Tree index {index} out of range for {len} trees")]
    TreeIndexOutOfRange { index: usize, len: usize },

    #[error("No current tree")]
    NoCurrentTree,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl NavError {
    /// True for validation and not-found failures, false for I/O failures.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, NavError::Store(_))
    }
}
