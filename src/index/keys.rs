//! Key layout of the index inside the shared store.

use super::atoms::Atom;
use super::types::ExprId;
use crate::error::{IndexError, Result};

/// Counter holding the last allocated expression id.
pub const NEXT_ID_KEY: &str = "next_expr_id";

pub fn text_key(id: ExprId) -> String {
    format!("expr:{}:text", id)
}

pub fn count_key(id: ExprId) -> String {
    format!("expr:{}:num_pairs", id)
}

pub fn documents_key(id: ExprId) -> String {
    format!("expr:{}:doc", id)
}

pub fn posting_key(atom: &Atom) -> String {
    format!("pair:{}:exprs", atom)
}

pub fn parse_id(key: &str, raw: &str) -> Result<ExprId> {
    match raw.parse::<ExprId>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(IndexError::CorruptValue {
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}

pub fn parse_count(key: &str, raw: Option<String>) -> Result<usize> {
    let raw = raw.ok_or_else(|| IndexError::MissingValue {
        key: key.to_string(),
    })?;
    raw.parse::<usize>()
        .map_err(|_| IndexError::CorruptValue {
            key: key.to_string(),
            value: raw,
        })
}
