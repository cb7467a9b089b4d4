//! Error types shared by the storage layer and the index.

use crate::storage::protocol::ValueKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexError>;

/// Failures raised by a `Store` backend while executing commands.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("wrong type for key {key}: expected {expected}")]
    WrongType { key: String, expected: ValueKind },

    #[error("value at {key} is not an integer: {value:?}")]
    NotAnInteger { key: String, value: String },

    #[error("unexpected reply: expected {expected}, got {got}")]
    UnexpectedReply { expected: &'static str, got: String },

    #[error("pipeline returned {got} replies for {expected} commands")]
    ReplyCount { expected: usize, got: usize },

    #[error("remote store rejected batch {op_id} ({status}): {message}")]
    Remote {
        op_id: String,
        status: u16,
        message: String,
    },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("corrupt value at {key}: {value:?}")]
    CorruptValue { key: String, value: String },

    #[error("missing value at {key}")]
    MissingValue { key: String },
}

impl IndexError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Store(StoreError::WrongType { .. }) => "WRONG_TYPE",
            Self::Store(StoreError::NotAnInteger { .. }) => "NOT_AN_INTEGER",
            Self::Store(StoreError::UnexpectedReply { .. })
            | Self::Store(StoreError::ReplyCount { .. }) => "PROTOCOL_ERROR",
            Self::Store(StoreError::Remote { .. }) | Self::Store(StoreError::Http(_)) => {
                "STORE_UNAVAILABLE"
            }
            Self::CorruptValue { .. } => "CORRUPT_VALUE",
            Self::MissingValue { .. } => "MISSING_VALUE",
        }
    }
}
