//! Durable [`LinkStore`](lariat_core::LinkStore) implementations.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryLinkStore;
pub use sqlite::SqliteLinkStore;
