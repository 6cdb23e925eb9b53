//! Per-entity registry of content-addressed nodes

use crate::model::{EntityId, Hash, Node};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// The current tree of one entity
///
/// Keeps insertion order for scans and a child → parent index that is
/// rebuilt on every replace, so no node stores a back-pointer.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EntityTree {
    /// Node hashes in insertion order
    order: Vec<Hash>,
    nodes: HashMap<Hash, Node>,
    /// child hash → first parent in insertion order
    parents: HashMap<Hash, Hash>,
}

impl EntityTree {
    /// Get a node by hash
    pub fn get(&self, hash: &Hash) -> Option<&Node> {
        self.nodes.get(hash)
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.nodes.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// All nodes in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Node> + '_ {
        self.order.iter().filter_map(|h| self.nodes.get(h))
    }

    /// Parent of `hash`: the first node, in insertion order, that declares it
    /// as a child
    pub fn parent_of(&self, hash: &Hash) -> Option<Hash> {
        self.parents.get(hash).copied()
    }

    /// Number of distinct levels (highest level + 1), 0 for an empty tree
    pub fn depth(&self) -> u32 {
        self.nodes
            .values()
            .map(|n| n.level.saturating_add(1))
            .max()
            .unwrap_or(0)
    }

    fn clear(&mut self) {
        self.order.clear();
        self.nodes.clear();
        self.parents.clear();
    }

    fn insert(&mut self, node: Node) {
        if !self.nodes.contains_key(&node.hash) {
            self.order.push(node.hash);
        }
        self.nodes.insert(node.hash, node);
    }

    fn reindex(&mut self) {
        self.parents.clear();
        for hash in &self.order {
            if let Some(node) = self.nodes.get(hash) {
                for child in node.children() {
                    self.parents.entry(child).or_insert(*hash);
                }
            }
        }
    }
}

/// Nodes of every entity
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NodeStore {
    trees: HashMap<EntityId, EntityTree>,
}

impl NodeStore {
    pub fn new() -> Self {
        NodeStore::default()
    }

    /// Check a batch before any mutation: no node may carry the zero hash
    pub fn validate(nodes: &[Node]) -> Result<()> {
        if let Some(index) = nodes.iter().position(|n| n.hash.is_zero()) {
            return Err(Error::InvalidInput(format!(
                "node at index {} has the zero hash",
                index
            )));
        }
        Ok(())
    }

    /// Replace the entity's whole tree with `nodes`.
    ///
    /// Every existing node is removed before the first new one is inserted.
    /// Child references are not resolved here. Each inserted node is stamped
    /// with `now`. Returns the previous node count.
    pub fn replace_tree(&mut self, entity: &EntityId, nodes: Vec<Node>, now: u64) -> Result<usize> {
        Self::validate(&nodes)?;

        let tree = self.trees.entry(entity.clone()).or_default();
        let previous = tree.len();
        tree.clear();

        for mut node in nodes {
            node.inserted_at = now;
            tree.insert(node);
        }
        tree.reindex();

        debug!(%entity, previous, current = tree.len(), "tree replaced");
        Ok(previous)
    }

    /// The entity's tree, if it ever had one
    pub fn tree(&self, entity: &EntityId) -> Option<&EntityTree> {
        self.trees.get(entity)
    }

    pub fn get(&self, entity: &EntityId, hash: &Hash) -> Option<&Node> {
        self.tree(entity).and_then(|t| t.get(hash))
    }

    pub fn contains(&self, entity: &EntityId, hash: &Hash) -> bool {
        self.tree(entity).is_some_and(|t| t.contains(hash))
    }

    /// All nodes in insertion order
    pub fn all_nodes(&self, entity: &EntityId) -> Vec<&Node> {
        self.tree(entity)
            .map(|t| t.iter().collect())
            .unwrap_or_default()
    }

    pub fn nodes_at_level(&self, entity: &EntityId, level: u32) -> Vec<&Node> {
        self.all_nodes(entity)
            .into_iter()
            .filter(|n| n.level == level)
            .collect()
    }

    pub fn leaf_nodes(&self, entity: &EntityId) -> Vec<&Node> {
        self.all_nodes(entity)
            .into_iter()
            .filter(|n| n.is_leaf)
            .collect()
    }

    pub fn node_count(&self, entity: &EntityId) -> usize {
        self.tree(entity).map_or(0, |t| t.len())
    }

    pub fn tree_depth(&self, entity: &EntityId) -> u32 {
        self.tree(entity).map_or(0, |t| t.depth())
    }

    /// Entities that have a tree, sorted
    pub fn entities(&self) -> Vec<&EntityId> {
        let mut entities: Vec<_> = self.trees.keys().collect();
        entities.sort();
        entities
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity() -> EntityId {
        EntityId::new("agent-1")
    }

    #[test]
    fn test_replace_is_total() {
        let mut store = NodeStore::new();
        let old = vec![Node::leaf(b"a".to_vec(), 0), Node::leaf(b"b".to_vec(), 1)];
        let stale = old[0].hash;
        assert_eq!(store.replace_tree(&entity(), old, 1).unwrap(), 0);

        let new = vec![Node::leaf(b"c".to_vec(), 0)];
        assert_eq!(store.replace_tree(&entity(), new, 2).unwrap(), 2);

        assert!(!store.contains(&entity(), &stale));
        assert_eq!(store.node_count(&entity()), 1);
        assert_eq!(store.all_nodes(&entity())[0].inserted_at, 2);
    }

    #[test]
    fn test_zero_hash_rejected_without_mutation() {
        let mut store = NodeStore::new();
        let keep = Node::leaf(b"keep".to_vec(), 0);
        let keep_hash = keep.hash;
        store.replace_tree(&entity(), vec![keep], 1).unwrap();

        let bad = vec![Node::leaf(b"x".to_vec(), 0), Node::with_hash(Hash::ZERO, true)];
        assert!(matches!(
            store.replace_tree(&entity(), bad, 2),
            Err(Error::InvalidInput(_))
        ));
        assert!(store.contains(&entity(), &keep_hash));
    }

    #[test]
    fn test_insertion_order_and_filters() {
        let mut store = NodeStore::new();
        let l0 = Node::leaf(b"l0".to_vec(), 0);
        let l1 = Node::leaf(b"l1".to_vec(), 1);
        let root = Node::internal(l0.hash, l1.hash, 1, 0);
        let root_hash = root.hash;
        store
            .replace_tree(&entity(), vec![root, l0.clone(), l1.clone()], 5)
            .unwrap();

        let order: Vec<_> = store.all_nodes(&entity()).iter().map(|n| n.hash).collect();
        assert_eq!(order, vec![root_hash, l0.hash, l1.hash]);
        assert_eq!(store.leaf_nodes(&entity()).len(), 2);
        assert_eq!(store.nodes_at_level(&entity(), 1).len(), 1);
        assert_eq!(store.tree_depth(&entity()), 2);

        let tree = store.tree(&entity()).unwrap();
        assert_eq!(tree.parent_of(&l0.hash), Some(root_hash));
        assert_eq!(tree.parent_of(&root_hash), None);
    }

    #[test]
    fn test_first_parent_wins() {
        let mut store = NodeStore::new();
        let child = Hash::digest(b"child");
        let p1 = Node::with_hash(Hash::digest(b"p1"), false).with_left(child);
        let p2 = Node::with_hash(Hash::digest(b"p2"), false).with_right(child);
        let p1_hash = p1.hash;
        store.replace_tree(&entity(), vec![p1, p2], 1).unwrap();

        assert_eq!(
            store.tree(&entity()).unwrap().parent_of(&child),
            Some(p1_hash)
        );
    }

    #[test]
    fn test_duplicate_hash_keeps_first_position() {
        let mut store = NodeStore::new();
        let a = Node::leaf(b"a".to_vec(), 0);
        let b = Node::leaf(b"b".to_vec(), 1);
        let mut a_again = a.clone();
        a_again.position = 9;
        store
            .replace_tree(&entity(), vec![a.clone(), b, a_again], 1)
            .unwrap();

        assert_eq!(store.node_count(&entity()), 2);
        assert_eq!(store.all_nodes(&entity())[0].position, 9);
    }

    #[test]
    fn test_unknown_entity_is_empty() {
        let store = NodeStore::new();
        let other = EntityId::new("nobody");
        assert_eq!(store.node_count(&other), 0);
        assert_eq!(store.tree_depth(&other), 0);
        assert!(store.all_nodes(&other).is_empty());
    }
}
