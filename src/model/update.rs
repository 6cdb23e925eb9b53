//! RootUpdate type - one entry of an entity's root history

use super::Hash;
use serde::{Deserialize, Serialize};

/// How a root transition was made
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateKind {
    /// Regular commit, guarded against no-op roots
    Commit,
    /// Privileged recovery that skips the duplicate-root guard
    EmergencyReset,
}

impl UpdateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateKind::Commit => "commit",
            UpdateKind::EmergencyReset => "emergency_reset",
        }
    }
}

/// An immutable record of a root transition
///
/// Like commits in a version history, updates are only ever appended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootUpdate {
    /// Root before this update (zero for the first update)
    pub previous_root: Hash,

    /// Root after this update
    pub new_root: Hash,

    /// Opaque proof bytes supplied with the commit
    pub proof: Vec<u8>,

    /// Human-readable reason for the update
    pub reason: String,

    pub kind: UpdateKind,

    /// Unix seconds
    pub timestamp: u64,
}

impl RootUpdate {
    /// Check if this is the entity's first update
    pub fn is_initial(&self) -> bool {
        self.previous_root.is_zero()
    }

    /// Whether `root` appears on either side of this transition
    pub fn mentions(&self, root: &Hash) -> bool {
        &self.new_root == root || (!root.is_zero() && &self.previous_root == root)
    }
}
