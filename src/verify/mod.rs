//! Read-only verification over a committed tree
//!
//! Nothing in this module mutates state. Proof checks only need the current
//! root; integrity and path checks reconstruct structure from the node store.

mod integrity;
mod path;
mod proof;

pub use integrity::{IntegrityChecker, NodeIntegrity, TreeIntegrityReport};
pub use path::{PathFinder, MAX_PATH_HOPS};
pub use proof::ProofVerifier;
