//! Core data model types for learning_ledger

mod entity;
mod hash;
mod node;
mod update;

pub use entity::EntityId;
pub use hash::Hash;
pub use node::Node;
pub use update::{RootUpdate, UpdateKind};
