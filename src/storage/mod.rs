//! Storage Module
//!
//! The Store Adapter: typed access to the key-value service that holds every expression
//! record and posting.
//!
//! ## Core Concepts
//! - **Commands**: scalar `Get`/`Set`, atomic `Incr`, set `SAdd`/`SMembers`/`SInter`.
//! - **Pipelining**: independent commands are sent as one batch in one round trip. A batch is
//!   not a transaction; partial application is possible when a command fails.
//! - **Backends**: `MemoryStore` keeps data in-process, sharded by key partition.
//!   `RemoteStore` forwards batches over HTTP to a node that hosts a `MemoryStore`.

pub mod handlers;
pub mod memory;
pub mod partitioner;
pub mod protocol;
pub mod remote;
pub mod store;

pub use memory::MemoryStore;
pub use protocol::{Command, Reply};
pub use remote::{RemoteStore, RemoteStoreConfig};
pub use store::{Pipeline, Store};

#[cfg(test)]
mod tests;
