//! Error types for learning_ledger

use crate::model::{EntityId, Hash};
use crate::auth::Principal;
use thiserror::Error;

/// Result type alias for learning_ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in learning_ledger operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Root unchanged: {root} is already the current root of {entity}")]
    DuplicateCommit { entity: EntityId, root: Hash },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {caller} is not the ledger admin")]
    Unauthorized { caller: Principal },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Invalid ledger file: {0}")]
    InvalidFile(String),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn zero_hash(what: &str) -> Self {
        Error::InvalidInput(format!("{} must not be the zero hash", what))
    }
}
