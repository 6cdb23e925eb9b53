//! Leaf-to-root paths

use crate::model::Hash;
use crate::store::EntityTree;
use crate::{Error, Result};
use tracing::debug;

/// Hop bound of [`PathFinder::path_to_root`]
pub const MAX_PATH_HOPS: usize = 256;

/// Walks parent links from a leaf up to the current root
#[derive(Clone, Copy, Debug, Default)]
pub struct PathFinder;

impl PathFinder {
    /// Path from `leaf` to `root`, leaf first and root last.
    ///
    /// Fails with `NotFound` when the leaf is absent and `InvalidInput` when
    /// the node is not a leaf. If the root is not reached within
    /// [`MAX_PATH_HOPS`] hops, or a node has no parent, the partial path is
    /// returned as is.
    pub fn path_to_root(tree: Option<&EntityTree>, root: Option<Hash>, leaf: &Hash) -> Result<Vec<Hash>> {
        Self::path_to_root_bounded(tree, root, leaf, MAX_PATH_HOPS)
    }

    /// [`PathFinder::path_to_root`] with a caller-chosen hop bound
    pub fn path_to_root_bounded(
        tree: Option<&EntityTree>,
        root: Option<Hash>,
        leaf: &Hash,
        max_hops: usize,
    ) -> Result<Vec<Hash>> {
        if max_hops == 0 {
            return Err(Error::InvalidInput("hop bound must be at least 1".into()));
        }
        let (tree, node) = tree
            .and_then(|t| t.get(leaf).map(|n| (t, n)))
            .ok_or_else(|| Error::NotFound(format!("leaf {} not found", leaf)))?;
        if !node.is_leaf {
            return Err(Error::InvalidInput(format!("node {} is not a leaf", leaf)));
        }

        let mut path = vec![*leaf];
        let mut current = *leaf;
        let mut hops = 0;
        while Some(current) != root && hops < max_hops {
            match tree.parent_of(&current) {
                Some(parent) => {
                    path.push(parent);
                    current = parent;
                }
                None => break,
            }
            hops += 1;
        }

        if Some(current) != root {
            debug!(%leaf, hops, "root not reached; returning partial path");
        }
        Ok(path)
    }

    /// Sibling proof along a path from [`PathFinder::path_to_root`].
    ///
    /// For each hop the parent's other child is taken; a parent with a
    /// single child contributes nothing.
    pub fn proof_along(tree: &EntityTree, path: &[Hash]) -> Vec<Hash> {
        path.windows(2)
            .filter_map(|hop| {
                let (child, parent) = (&hop[0], &hop[1]);
                let children: Vec<Hash> = tree.get(parent)?.children().collect();
                match children.as_slice() {
                    [left, right] => Some(if left == child { *right } else { *left }),
                    _ => None,
                }
            })
            .collect()
    }
}
