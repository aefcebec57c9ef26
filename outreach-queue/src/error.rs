//! Error types for the outreach-queue crate.

use std::io;

use thiserror::Error;

use crate::types::JobId;

/// Top-level queue error type.
#[derive(Debug, Error)]
pub enum QueueError {
    /// I/O failure in a journal backing store.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Journal record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    /// The referenced job is not where the operation expected it.
    #[error("Job not found: {0}")]
    NotFound(JobId),

    /// Internal error (lock poisoning, etc.).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Journal serialization errors.
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("Bincode encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("Bincode decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

/// Specialized `Result` type for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;

impl<T> From<std::sync::PoisonError<T>> for QueueError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Self::Internal(format!("Lock poisoned: {e}"))
    }
}
