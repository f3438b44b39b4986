//! Error types for the record store.

use crate::ids::UserId;
use std::io;
use thiserror::Error;
use uuid::Uuid;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in record store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] ipost_storage::StorageError),

    /// I/O error outside the backend (directory, lock file).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A commit could not be encoded.
    #[error("encode error: {0}")]
    Encode(String),

    /// A commit frame had a valid checksum but an undecodable body.
    #[error("decode error: {0}")]
    Decode(String),

    /// The store directory or log is not in a format this build understands.
    #[error("invalid store format: {message}")]
    InvalidFormat {
        /// Description of the problem.
        message: String,
    },

    /// Another process holds the store directory lock.
    #[error("store locked: another process has exclusive access")]
    Locked,

    /// An insert reused an id that already exists.
    #[error("duplicate {kind} id {id}")]
    DuplicateId {
        /// Record kind ("user" or "post").
        kind: &'static str,
        /// The offending id.
        id: Uuid,
    },

    /// A post referenced an author that is not in the store.
    #[error("post author {author_id} does not exist")]
    MissingAuthor {
        /// The missing author.
        author_id: UserId,
    },

    /// A delete referenced a user that is not in the store.
    #[error("user {user_id} does not exist")]
    UserNotFound {
        /// The missing user.
        user_id: UserId,
    },
}

impl StoreError {
    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Creates an encode error.
    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode(message.into())
    }

    /// Creates a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }
}
