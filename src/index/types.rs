use super::atoms::AtomSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Expression ids are allocated from a store counter and start at 1.
pub type ExprId = u64;

/// Everything stored for one distinct expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionRecord {
    pub id: ExprId,
    pub text: String,
    /// Size of the atom set at insertion time. Never recomputed.
    pub atom_count: usize,
    pub documents: BTreeSet<String>,
}

/// What `add` did with a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "id", rename_all = "snake_case")]
pub enum AddOutcome {
    /// A new record was created.
    Created(ExprId),
    /// The tree matched an existing record; its document was added to that record.
    Merged(ExprId),
    /// The tree produced no atoms and was not indexed.
    Ignored,
}

impl AddOutcome {
    pub fn id(&self) -> Option<ExprId> {
        match self {
            AddOutcome::Created(id) | AddOutcome::Merged(id) => Some(*id),
            AddOutcome::Ignored => None,
        }
    }
}

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: ExprId,
    pub text: String,
    pub score: f64,
    pub matched_atoms: AtomSet,
    pub documents: BTreeSet<String>,
}

// --- HTTP payloads ---

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub count: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExactSearchResponse {
    pub id: Option<ExprId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub error: String,
}
