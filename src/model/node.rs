//! Node type - one content-addressed record of a learning tree

use super::Hash;
use serde::{Deserialize, Serialize};

/// A node of an entity's learning tree
///
/// Nodes are identified by their `hash`. Leaves carry payload data; internal
/// nodes reference up to two children and usually carry no payload. The
/// ledger trusts the submitted hash and never recomputes it from the content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Content address of this node
    pub hash: Hash,

    /// Left child (internal nodes only)
    #[serde(default)]
    pub left_child: Option<Hash>,

    /// Right child (internal nodes only)
    #[serde(default)]
    pub right_child: Option<Hash>,

    /// Leaf payload
    #[serde(default)]
    pub payload: Vec<u8>,

    /// Height above the leaves (leaves are level 0)
    #[serde(default)]
    pub level: u32,

    /// Index within its level, left to right
    #[serde(default)]
    pub position: u32,

    pub is_leaf: bool,

    /// Unix seconds at which the node was stored; stamped by the ledger
    #[serde(default)]
    pub inserted_at: u64,
}

impl Node {
    /// Create a leaf whose hash is the digest of its payload
    pub fn leaf(payload: impl Into<Vec<u8>>, position: u32) -> Self {
        let payload = payload.into();
        Node {
            hash: Hash::digest(&payload),
            left_child: None,
            right_child: None,
            payload,
            level: 0,
            position,
            is_leaf: true,
            inserted_at: 0,
        }
    }

    /// Create an internal node over two children
    pub fn internal(left: Hash, right: Hash, level: u32, position: u32) -> Self {
        Node {
            hash: Hash::combine(&left, &right),
            left_child: Some(left),
            right_child: Some(right),
            payload: Vec::new(),
            level,
            position,
            is_leaf: false,
            inserted_at: 0,
        }
    }

    /// Create a node with an explicit hash and no children
    pub fn with_hash(hash: Hash, is_leaf: bool) -> Self {
        Node {
            hash,
            left_child: None,
            right_child: None,
            payload: Vec::new(),
            level: 0,
            position: 0,
            is_leaf,
            inserted_at: 0,
        }
    }

    /// Set the left child
    pub fn with_left(mut self, child: Hash) -> Self {
        self.left_child = Some(child);
        self
    }

    /// Set the right child
    pub fn with_right(mut self, child: Hash) -> Self {
        self.right_child = Some(child);
        self
    }

    /// Set level and position
    pub fn at(mut self, level: u32, position: u32) -> Self {
        self.level = level;
        self.position = position;
        self
    }

    /// Declared child hashes, skipping absent and zero references
    pub fn children(&self) -> impl Iterator<Item = Hash> + '_ {
        [self.left_child, self.right_child]
            .into_iter()
            .flatten()
            .filter(|h| !h.is_zero())
    }

    /// Whether `hash` is one of this node's children
    pub fn has_child(&self, hash: &Hash) -> bool {
        self.children().any(|c| &c == hash)
    }
}
