//! # learning_ledger
//!
//! A content-addressed ledger of per-entity learning trees.
//!
//! Every entity owns a merkle tree of learning records. The ledger stores the
//! whole tree, not just its root, so it can answer membership proofs,
//! integrity checks and leaf-to-root paths, and it keeps an append-only
//! history of root transitions from which learning metrics are derived.
//!
//! ## Core Concepts
//!
//! - **Nodes**: Content-addressed tree records (leaves carry payloads)
//! - **Roots**: One digest per entity summarizing its current tree
//! - **Updates**: Append-only root transitions, never rewritten
//! - **Metrics**: Confidence, velocity and milestones from update cadence
//!
//! ## Example
//!
//! ```ignore
//! use learning_ledger::{EntityId, LearningLedger, MerkleTreeBuilder, Principal};
//!
//! let admin = Principal::new("admin");
//! let ledger = LearningLedger::open_or_create("ledger.lledger", admin.clone())?;
//! let tree = MerkleTreeBuilder::from_payloads(["lesson one", "lesson two"]).build()?;
//! let agent = EntityId::new("agent-1");
//! ledger.update_learning_tree(&admin, &agent, tree.nodes.clone(), tree.root, vec![], "initial")?;
//! assert!(ledger.verify_proof(&agent, &tree.leaf_hash(0).unwrap(), &tree.proof(0)?));
//! ```

pub mod analytics;
pub mod auth;
pub mod builder;
pub mod clock;
pub mod config;
pub mod events;
pub mod history;
pub mod model;
pub mod store;
pub mod verify;

mod error;
mod ledger;

pub use analytics::{LearningMetrics, Milestone};
pub use auth::{AccessControl, Principal};
pub use builder::{BuiltTree, MerkleTreeBuilder};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{Error, Result};
pub use events::Event;
pub use ledger::LearningLedger;
pub use model::{EntityId, Hash, Node, RootUpdate, UpdateKind};
pub use verify::{NodeIntegrity, TreeIntegrityReport, MAX_PATH_HOPS};

/// Ledger file format version
pub const VERSION: u32 = 1;

/// Magic bytes for file identification
pub const MAGIC: &[u8; 8] = b"LRNLEDGR";
