//! Expression Index Library
//!
//! A structural search index for mathematical expressions. Expression trees are reduced to
//! sets of atoms; identical atom sets are deduplicated across source documents, and queries
//! are answered either exactly (same atom set) or by ranking expressions that share atoms.
//!
//! ## Architecture Modules
//! - **`storage`**: The Store Adapter. A command/reply protocol over a key-value service with
//!   pipelined batches, an in-process sharded backend (`MemoryStore`) and an HTTP client
//!   (`RemoteStore`) for a store hosted by another node.
//! - **`index`**: Deduplicating insertion, the exact-match resolver and ranked search, with
//!   pluggable atom extraction and ranking.
//! - **`error`**: Error types surfaced by both layers.

pub mod error;
pub mod index;
pub mod storage;

pub use error::{IndexError, Result, StoreError};
pub use index::{
    AddOutcome, Atom, AtomExtractor, AtomSet, ExprId, ExpressionIndex, ExpressionRecord,
    FMeasureRanker, Ranker, SearchHit, SearchResults, SourceExpression,
};
pub use storage::{MemoryStore, RemoteStore, RemoteStoreConfig, Store};
