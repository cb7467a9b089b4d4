//! Expression Index Module
//!
//! Deduplicates and retrieves mathematical expressions by their structural features.
//!
//! ## Overview
//! Every expression tree is reduced to a set of atoms. Expressions with equal atom sets are
//! treated as the same expression: they share one record whose document set grows with each
//! new source. Postings map each atom to the expressions containing it and drive both exact
//! lookups and ranked similarity search.
//!
//! ## Submodules
//! - **`atoms`**: The atom extraction capability and the symbol-pair reference extractor.
//! - **`ranker`**: The scoring capability and stock rankers.
//! - **`engine`**: `ExpressionIndex` with `add`, `exact_search`, `search` and `record`.
//! - **`results`**: Top-K selection and the lazily hydrated result sequence.
//! - **`keys`**: Layout of records and postings inside the store.
//! - **`handlers`**: HTTP request handlers for the Axum web server.
//! - **`types`**: Records, results and HTTP payloads.

pub mod atoms;
pub mod engine;
pub mod handlers;
pub mod keys;
pub mod ranker;
pub mod results;
pub mod types;

pub use atoms::{
    Atom, AtomExtractor, AtomSet, SourceExpression, SymbolNode, SymbolPairExtractor, SymbolTree,
};
pub use engine::{ExpressionIndex, RESULT_LIMIT};
pub use ranker::{FMeasureRanker, MatchCountRanker, Ranker};
pub use results::SearchResults;
pub use types::{AddOutcome, ExprId, ExpressionRecord, SearchHit};
