//! Structural integrity of individual nodes and whole trees
//!
//! A failed check is reported, not raised: dangling references can exist
//! because node batches are stored without resolving their children.

use crate::model::Hash;
use crate::store::EntityTree;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// What a single-node check found
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeIntegrity {
    pub exists: bool,
    pub is_leaf: bool,
    /// The node is the entity's current root
    pub is_root: bool,
    pub has_valid_parent: bool,
    pub parent_hash: Option<Hash>,
    /// Every declared non-zero child is present in the store
    pub has_valid_children: bool,
    /// Declared children that are not present
    pub missing_children: Vec<Hash>,
}

impl NodeIntegrity {
    /// `exists && (has_valid_parent || is_root) && (is_leaf || has_valid_children)`
    pub fn is_valid(&self) -> bool {
        self.exists
            && (self.has_valid_parent || self.is_root)
            && (self.is_leaf || self.has_valid_children)
    }
}

/// Result of checking every node of a tree
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeIntegrityReport {
    pub node_count: usize,
    /// The current root is a stored node
    pub root_present: bool,
    /// Nodes that failed the single-node check, in insertion order
    pub invalid_nodes: Vec<(Hash, NodeIntegrity)>,
}

impl TreeIntegrityReport {
    pub fn is_consistent(&self) -> bool {
        self.root_present && self.invalid_nodes.is_empty()
    }
}

/// Checks nodes against the structure implied by their child references
#[derive(Clone, Copy, Debug, Default)]
pub struct IntegrityChecker;

impl IntegrityChecker {
    /// Check one node of `tree` against the current `root`
    pub fn check_node(
        tree: Option<&EntityTree>,
        root: Option<Hash>,
        hash: &Hash,
    ) -> (bool, NodeIntegrity) {
        let Some((tree, node)) = tree.and_then(|t| t.get(hash).map(|n| (t, n))) else {
            return (false, NodeIntegrity::default());
        };

        let parent_hash = tree.parent_of(hash);
        let missing_children: Vec<Hash> = node.children().filter(|c| !tree.contains(c)).collect();

        let info = NodeIntegrity {
            exists: true,
            is_leaf: node.is_leaf,
            is_root: root.as_ref() == Some(hash),
            has_valid_parent: parent_hash.is_some(),
            parent_hash,
            has_valid_children: missing_children.is_empty(),
            missing_children,
        };
        (info.is_valid(), info)
    }

    /// Check every node of `tree`
    pub fn check_tree(tree: Option<&EntityTree>, root: Option<Hash>) -> TreeIntegrityReport {
        let Some(tree) = tree else {
            return TreeIntegrityReport::default();
        };

        let invalid_nodes: Vec<_> = tree
            .iter()
            .filter_map(|node| {
                let (valid, info) = Self::check_node(Some(tree), root, &node.hash);
                (!valid).then_some((node.hash, info))
            })
            .collect();

        if !invalid_nodes.is_empty() {
            warn!(invalid = invalid_nodes.len(), "structural inconsistency detected");
        }

        TreeIntegrityReport {
            node_count: tree.len(),
            root_present: root.is_some_and(|r| tree.contains(&r)),
            invalid_nodes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityId, Node};
    use crate::store::NodeStore;

    fn store_with(nodes: Vec<Node>) -> (NodeStore, EntityId) {
        let entity = EntityId::new("agent-1");
        let mut store = NodeStore::new();
        store.replace_tree(&entity, nodes, 1).unwrap();
        (store, entity)
    }

    #[test]
    fn test_missing_child_flagged() {
        let b = Hash::digest(b"B");
        let a = Node::with_hash(Hash::digest(b"A"), false).with_left(b);
        let a_hash = a.hash;
        let (store, entity) = store_with(vec![a]);

        let (valid, info) = IntegrityChecker::check_node(store.tree(&entity), Some(a_hash), &a_hash);

        assert!(!valid);
        assert!(info.exists);
        assert!(!info.has_valid_children);
        assert_eq!(info.missing_children, vec![b]);
    }

    #[test]
    fn test_absent_node() {
        let (store, entity) = store_with(vec![Node::leaf(b"x".to_vec(), 0)]);
        let (valid, info) =
            IntegrityChecker::check_node(store.tree(&entity), None, &Hash::digest(b"nope"));
        assert!(!valid);
        assert!(!info.exists);
    }

    #[test]
    fn test_well_formed_tree() {
        let l0 = Node::leaf(b"l0".to_vec(), 0);
        let l1 = Node::leaf(b"l1".to_vec(), 1);
        let root = Node::internal(l0.hash, l1.hash, 1, 0);
        let root_hash = root.hash;
        let l0_hash = l0.hash;
        let (store, entity) = store_with(vec![l0, l1, root]);

        let (valid, info) = IntegrityChecker::check_node(store.tree(&entity), Some(root_hash), &l0_hash);
        assert!(valid);
        assert_eq!(info.parent_hash, Some(root_hash));

        let (root_valid, root_info) =
            IntegrityChecker::check_node(store.tree(&entity), Some(root_hash), &root_hash);
        assert!(root_valid);
        assert!(root_info.is_root);
        assert!(!root_info.has_valid_parent);

        let report = IntegrityChecker::check_tree(store.tree(&entity), Some(root_hash));
        assert!(report.is_consistent());
        assert_eq!(report.node_count, 3);
    }

    #[test]
    fn test_orphan_leaf_is_invalid() {
        let orphan = Node::leaf(b"orphan".to_vec(), 0);
        let orphan_hash = orphan.hash;
        let (store, entity) = store_with(vec![orphan]);

        let (valid, info) =
            IntegrityChecker::check_node(store.tree(&entity), Some(Hash::digest(b"elsewhere")), &orphan_hash);
        assert!(!valid);
        assert!(!info.has_valid_parent);

        let report = IntegrityChecker::check_tree(store.tree(&entity), Some(Hash::digest(b"elsewhere")));
        assert!(!report.root_present);
        assert_eq!(report.invalid_nodes.len(), 1);
    }
}
