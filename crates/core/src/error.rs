//! Error types for the user directory domain logic

use crate::types::UserId;
use thiserror::Error;

/// Core user-directory domain errors
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Invalid country code: {0}")]
    InvalidCountry(String),

    #[error("Invalid id: {0}")]
    InvalidId(String),

    #[error("Invalid cursor")]
    InvalidCursor,

    #[error("No pending outbox message")]
    NoPendingMessage,

    #[error("Store error: {0}")]
    Store(String),
}

/// Result type alias for user-directory operations
pub type DirectoryResult<T> = Result<T, DirectoryError>;
