//! Error types for duet-core

use thiserror::Error;

/// Result type alias using duet-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in duet-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Empty or malformed participant id
    #[error("Invalid participant: {0}")]
    InvalidParticipant(String),

    /// Input rejected locally, before any store call
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// No signed-in user in the session
    #[error("No authenticated user")]
    NotAuthenticated,

    /// Live subscription interrupted
    #[error("Transport error: {0}")]
    Transport(String),

    /// Append or patch failed at the store
    #[error("Write error: {0}")]
    Write(String),

    /// Record not found in the store
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation needs an open conversation
    #[error("No conversation is open")]
    NoActiveConversation,
}

/// Reasons a local submission is rejected
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("message body is empty")]
    EmptyBody,
    #[error("no authenticated sender")]
    MissingSender,
    #[error("reaction is empty")]
    EmptyReaction,
}
