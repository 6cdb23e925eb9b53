//! Building node batches and proofs from leaf payloads
//!
//! The ledger never recomputes hashes, so callers need a consistent way to
//! produce a node set, its root and its proofs. Leaves are hashed from their
//! payloads and siblings are combined with [`Hash::combine`]. When a level
//! has an odd count, the unpaired node is promoted unchanged.

use crate::model::{Hash, Node};
use crate::{Error, Result};

/// A fully built tree, ready for `update_learning_tree`
#[derive(Clone, Debug)]
pub struct BuiltTree {
    /// Leaves first, then each internal level bottom-up
    pub nodes: Vec<Node>,
    pub root: Hash,
    /// Hashes per level, leaves at index 0
    levels: Vec<Vec<Hash>>,
}

impl BuiltTree {
    pub fn leaf_count(&self) -> usize {
        self.levels.first().map_or(0, |l| l.len())
    }

    pub fn leaf_hash(&self, index: usize) -> Option<Hash> {
        self.levels.first().and_then(|l| l.get(index)).copied()
    }

    /// Sibling hashes from leaf `index` up to the root
    pub fn proof(&self, index: usize) -> Result<Vec<Hash>> {
        if index >= self.leaf_count() {
            return Err(Error::NotFound(format!(
                "leaf index {} out of range ({} leaves)",
                index,
                self.leaf_count()
            )));
        }

        let mut proof = Vec::new();
        let mut index = index;
        for level in &self.levels[..self.levels.len() - 1] {
            if let Some(sibling) = level.get(index ^ 1) {
                proof.push(*sibling);
            }
            index /= 2;
        }
        Ok(proof)
    }
}

/// Builds a [`BuiltTree`] from leaf payloads
#[derive(Clone, Debug, Default)]
pub struct MerkleTreeBuilder {
    payloads: Vec<Vec<u8>>,
}

impl MerkleTreeBuilder {
    pub fn new() -> Self {
        MerkleTreeBuilder::default()
    }

    /// Append a leaf payload
    pub fn leaf(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payloads.push(payload.into());
        self
    }

    pub fn from_payloads<I, P>(payloads: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Vec<u8>>,
    {
        MerkleTreeBuilder {
            payloads: payloads.into_iter().map(Into::into).collect(),
        }
    }

    pub fn build(self) -> Result<BuiltTree> {
        if self.payloads.is_empty() {
            return Err(Error::InvalidInput("a tree needs at least one leaf".into()));
        }

        let mut nodes: Vec<Node> = self
            .payloads
            .into_iter()
            .enumerate()
            .map(|(i, payload)| Node::leaf(payload, i as u32))
            .collect();
        let mut levels = vec![nodes.iter().map(|n| n.hash).collect::<Vec<_>>()];

        while levels[levels.len() - 1].len() > 1 {
            let current = &levels[levels.len() - 1];
            let level = levels.len() as u32;
            let mut next = Vec::with_capacity(current.len().div_ceil(2));

            for (position, pair) in current.chunks(2).enumerate() {
                match pair {
                    [left, right] => {
                        let node = Node::internal(*left, *right, level, position as u32);
                        next.push(node.hash);
                        nodes.push(node);
                    }
                    [single] => next.push(*single),
                    _ => unreachable!("chunks(2) yields one or two items"),
                }
            }
            levels.push(next);
        }

        let root = levels[levels.len() - 1][0];
        Ok(BuiltTree {
            nodes,
            root,
            levels,
        })
    }
}
