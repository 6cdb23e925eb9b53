//! Node storage and on-disk persistence
//!
//! `NodeStore` holds every entity's live tree in memory. `SnapshotFile`
//! persists a whole ledger state as a single compressed file.

mod file_store;
mod node_store;

pub use file_store::SnapshotFile;
pub use node_store::{EntityTree, NodeStore};
