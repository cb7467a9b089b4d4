//! Storage Network Protocol
//!
//! Defines the commands understood by every `Store` backend and the Data Transfer Objects
//! used when a batch of commands travels to a remote node over HTTP.
//!
//! A batch is executed in order, one command at a time. It is a round-trip optimisation,
//! not a transaction: a failure part way through leaves the earlier commands applied.

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// --- API Endpoints ---

/// Endpoint for executing a pipelined batch of commands against the hosted store.
pub const ENDPOINT_BATCH: &str = "/store/batch";

// --- Commands and Replies ---

/// A single request to the key-value service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Command {
    /// Read a scalar. Replies `Text` or `Nil`.
    Get { key: String },
    /// Write a scalar, replacing any previous scalar. Replies `Ok`.
    Set { key: String, value: String },
    /// Atomically increment an integer scalar (missing counts as 0). Replies `Int`.
    Incr { key: String },
    /// Add a member to a set. Replies `Int(1)` if newly added, `Int(0)` otherwise.
    SAdd { key: String, member: String },
    /// Read all members of a set. Missing keys read as the empty set.
    SMembers { key: String },
    /// Members present in every listed set.
    SInter { keys: Vec<String> },
}

impl Command {
    pub fn get(key: impl Into<String>) -> Self {
        Self::Get { key: key.into() }
    }

    pub fn set(key: impl Into<String>, value: impl ToString) -> Self {
        Self::Set {
            key: key.into(),
            value: value.to_string(),
        }
    }

    pub fn incr(key: impl Into<String>) -> Self {
        Self::Incr { key: key.into() }
    }

    pub fn sadd(key: impl Into<String>, member: impl ToString) -> Self {
        Self::SAdd {
            key: key.into(),
            member: member.to_string(),
        }
    }

    pub fn smembers(key: impl Into<String>) -> Self {
        Self::SMembers { key: key.into() }
    }

    pub fn sinter(keys: Vec<String>) -> Self {
        Self::SInter { keys }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Reply {
    Nil,
    Ok,
    Int(i64),
    Text(String),
    Members(BTreeSet<String>),
}

impl Reply {
    fn describe(&self) -> String {
        match self {
            Reply::Nil => "nil".to_string(),
            Reply::Ok => "ok".to_string(),
            Reply::Int(n) => format!("int {}", n),
            Reply::Text(_) => "text".to_string(),
            Reply::Members(m) => format!("set of {}", m.len()),
        }
    }

    pub fn into_integer(self) -> Result<i64, StoreError> {
        match self {
            Reply::Int(n) => Ok(n),
            other => Err(StoreError::UnexpectedReply {
                expected: "int",
                got: other.describe(),
            }),
        }
    }

    pub fn into_text(self) -> Result<Option<String>, StoreError> {
        match self {
            Reply::Text(value) => Ok(Some(value)),
            Reply::Nil => Ok(None),
            other => Err(StoreError::UnexpectedReply {
                expected: "text or nil",
                got: other.describe(),
            }),
        }
    }

    pub fn into_members(self) -> Result<BTreeSet<String>, StoreError> {
        match self {
            Reply::Members(members) => Ok(members),
            other => Err(StoreError::UnexpectedReply {
                expected: "members",
                got: other.describe(),
            }),
        }
    }

    pub fn into_ok(self) -> Result<(), StoreError> {
        match self {
            Reply::Ok => Ok(()),
            other => Err(StoreError::UnexpectedReply {
                expected: "ok",
                got: other.describe(),
            }),
        }
    }
}

/// The shape of value held under a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Scalar,
    Set,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Scalar => write!(f, "scalar"),
            ValueKind::Set => write!(f, "set"),
        }
    }
}

// --- Data Transfer Objects ---

/// Payload for executing a batch of commands on the node hosting the store.
///
/// `op_id` is generated by the client and echoed in logs on both sides so one logical
/// operation can be followed across nodes.
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchRequest {
    pub op_id: String,
    pub commands: Vec<Command>,
}

/// Why a batch stopped before reaching its last command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BatchFault {
    WrongType { key: String, expected: ValueKind },
    NotAnInteger { key: String, value: String },
    Internal { message: String },
}

impl From<&StoreError> for BatchFault {
    fn from(err: &StoreError) -> Self {
        match err {
            StoreError::WrongType { key, expected } => BatchFault::WrongType {
                key: key.clone(),
                expected: *expected,
            },
            StoreError::NotAnInteger { key, value } => BatchFault::NotAnInteger {
                key: key.clone(),
                value: value.clone(),
            },
            other => BatchFault::Internal {
                message: other.to_string(),
            },
        }
    }
}

impl BatchFault {
    pub fn into_store_error(self, op_id: &str, status: u16) -> StoreError {
        match self {
            BatchFault::WrongType { key, expected } => StoreError::WrongType { key, expected },
            BatchFault::NotAnInteger { key, value } => StoreError::NotAnInteger { key, value },
            BatchFault::Internal { message } => StoreError::Remote {
                op_id: op_id.to_string(),
                status,
                message,
            },
        }
    }
}

/// Result of a batch execution.
///
/// `replies` holds one entry per command that completed. When `fault` is set, the batch
/// stopped at command index `replies.len()`.
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchResponse {
    pub op_id: String,
    pub replies: Vec<Reply>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault: Option<BatchFault>,
}
