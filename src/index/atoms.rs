//! Atom extraction.
//!
//! An atom is one structural feature of an expression tree. The index only ever sees the
//! *set* of atoms of a tree, so extraction must be deterministic: identical trees must yield
//! identical sets.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Atom(pub String);

impl Atom {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub type AtomSet = BTreeSet<Atom>;

/// Accessors the index needs from a parsed expression.
pub trait SourceExpression {
    /// Identifier of the document the expression was found in.
    fn document(&self) -> &str;
    /// Canonical rendering stored for display.
    fn canonical_text(&self) -> &str;
}

pub trait AtomExtractor: Send + Sync {
    type Tree: SourceExpression + Send + Sync;

    fn extract_atoms(&self, tree: &Self::Tree) -> AtomSet;
}

// --- Symbol layout trees ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolNode {
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<SymbolLink>,
}

/// A spatial relation from one symbol to the next (e.g. `next`, `above`, `below`, `within`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolLink {
    pub relation: String,
    pub target: SymbolNode,
}

impl SymbolNode {
    pub fn leaf(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            links: Vec::new(),
        }
    }

    pub fn link(mut self, relation: impl Into<String>, target: SymbolNode) -> Self {
        self.links.push(SymbolLink {
            relation: relation.into(),
            target,
        });
        self
    }
}

/// A symbol layout tree tagged with the document it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolTree {
    pub document: String,
    pub text: String,
    pub root: SymbolNode,
}

impl SourceExpression for SymbolTree {
    fn document(&self) -> &str {
        &self.document
    }

    fn canonical_text(&self) -> &str {
        &self.text
    }
}

/// Emits one atom per (ancestor, descendant) symbol pair, annotated with the relation path
/// between them: `ancestor|descendant|rel/rel/...`. Separators occurring inside a symbol or a
/// relation are backslash-escaped.
///
/// A tree made of a single symbol has no pairs and yields the bare symbol instead, so that
/// it can still be indexed.
#[derive(Debug, Clone, Default)]
pub struct SymbolPairExtractor {
    max_distance: Option<usize>,
}

impl SymbolPairExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only pairs at most `distance` links apart are emitted.
    pub fn with_max_distance(distance: usize) -> Self {
        Self {
            max_distance: Some(distance.max(1)),
        }
    }

    fn walk<'a>(
        &self,
        node: &'a SymbolNode,
        ancestors: &mut Vec<(&'a str, &'a str)>,
        atoms: &mut AtomSet,
    ) {
        let limit = self.max_distance.unwrap_or(usize::MAX);
        let mut path: Vec<&str> = Vec::new();
        for (distance, (symbol, relation)) in ancestors.iter().rev().enumerate() {
            if distance >= limit {
                break;
            }
            path.push(*relation);
            let relations: Vec<Cow<'_, str>> = path
                .iter()
                .rev()
                .map(|r| escape(r, RELATION_RESERVED))
                .collect();
            atoms.insert(Atom(format!(
                "{}|{}|{}",
                escape(symbol, SYMBOL_RESERVED),
                escape(&node.symbol, SYMBOL_RESERVED),
                relations.join("/")
            )));
        }

        for link in &node.links {
            ancestors.push((node.symbol.as_str(), link.relation.as_str()));
            self.walk(&link.target, ancestors, atoms);
            ancestors.pop();
        }
    }
}

impl AtomExtractor for SymbolPairExtractor {
    type Tree = SymbolTree;

    fn extract_atoms(&self, tree: &SymbolTree) -> AtomSet {
        let mut atoms = AtomSet::new();
        if tree.root.links.is_empty() {
            if !tree.root.symbol.is_empty() {
                atoms.insert(Atom::new(escape(&tree.root.symbol, SYMBOL_RESERVED)));
            }
            return atoms;
        }
        self.walk(&tree.root, &mut Vec::new(), &mut atoms);
        atoms
    }
}

const SYMBOL_RESERVED: &[char] = &['\\', '|'];
const RELATION_RESERVED: &[char] = &['\\', '|', '/'];

/// Prefixes every reserved separator in `part` with a backslash.
fn escape<'a>(part: &'a str, reserved: &[char]) -> Cow<'a, str> {
    if !part.contains(reserved) {
        return Cow::Borrowed(part);
    }
    let mut escaped = String::with_capacity(part.len() + 4);
    for c in part.chars() {
        if reserved.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    Cow::Owned(escaped)
}
