//! High-level ledger API
//!
//! This module provides the main entry point for interacting with
//! learning_ledger. Every public operation runs under one lock acquisition:
//! writes hold the exclusive lock from validation to the last mutation, so
//! readers see either all of an operation or none of it.

use crate::analytics::LearningMetrics;
use crate::auth::{AccessControl, Principal};
use crate::clock::{Clock, SystemClock};
use crate::events::{Event, EventJournal};
use crate::history::{CommitOutcome, RootLedger};
use crate::model::{EntityId, Hash, Node, RootUpdate};
use crate::store::{NodeStore, SnapshotFile};
use crate::verify::{IntegrityChecker, NodeIntegrity, PathFinder, ProofVerifier, TreeIntegrityReport};
use crate::{Error, Result};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Everything that is persisted
#[derive(Debug, Serialize, Deserialize)]
struct LedgerState {
    access: AccessControl,
    nodes: NodeStore,
    roots: RootLedger,
}

impl LedgerState {
    fn new(admin: Principal) -> Self {
        LedgerState {
            access: AccessControl::new(admin),
            nodes: NodeStore::new(),
            roots: RootLedger::new(),
        }
    }
}

/// The learning-history ledger
///
/// Provides:
/// - Atomic full-tree replacement and root commits (admin only)
/// - Membership proofs against the current root
/// - Node integrity checks and leaf-to-root paths
/// - Learning metrics and milestones
pub struct LearningLedger {
    state: RwLock<LedgerState>,
    journal: Mutex<EventJournal>,
    clock: Arc<dyn Clock>,
    file: Option<SnapshotFile>,
    /// Set by successful writes, cleared by `sync`
    dirty: AtomicBool,
}

impl LearningLedger {
    /// Create a ledger that lives only in memory
    pub fn in_memory(admin: impl Into<Principal>) -> Self {
        LearningLedger {
            state: RwLock::new(LedgerState::new(admin.into())),
            journal: Mutex::new(EventJournal::new()),
            clock: Arc::new(SystemClock),
            file: None,
            dirty: AtomicBool::new(false),
        }
    }

    /// Create a new ledger file at the given path, replacing any existing one
    pub fn create(path: impl AsRef<Path>, admin: impl Into<Principal>) -> Result<Self> {
        let mut ledger = Self::in_memory(admin);
        ledger.file = Some(SnapshotFile::new(path));
        ledger.sync()?;
        Ok(ledger)
    }

    /// Open an existing ledger file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = SnapshotFile::new(path);
        let state: LedgerState = file.read()?;
        info!(path = %file.path().display(), admin = %state.access.admin(), "ledger opened");

        Ok(LearningLedger {
            state: RwLock::new(state),
            journal: Mutex::new(EventJournal::new()),
            clock: Arc::new(SystemClock),
            file: Some(file),
            dirty: AtomicBool::new(false),
        })
    }

    /// Open a ledger file, creating it with `admin` if it does not exist
    pub fn open_or_create(path: impl AsRef<Path>, admin: impl Into<Principal>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::open(path)
        } else {
            Self::create(path, admin)
        }
    }

    /// Use a different time source
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Keep at most `capacity` event records between drains
    pub fn with_journal_capacity(self, capacity: usize) -> Self {
        *self.journal.lock() = EventJournal::with_capacity(capacity);
        self
    }

    /// Write the state to the ledger file, if any
    pub fn sync(&self) -> Result<()> {
        if let Some(file) = &self.file {
            let state = self.state.read();
            file.write(&*state)?;
            self.dirty.store(false, Ordering::Release);
        }
        Ok(())
    }

    /// Whether a write happened since the last sync
    pub fn has_unsynced_changes(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// The current admin principal
    pub fn admin(&self) -> Principal {
        self.state.read().access.admin().clone()
    }

    // === Administrative Operations ===

    /// Hand the admin role to another principal
    pub fn transfer_admin(&self, caller: &Principal, new_admin: impl Into<Principal>) -> Result<()> {
        self.state.write().access.transfer(caller, new_admin.into())?;
        self.dirty.store(true, Ordering::Release);
        Ok(())
    }

    /// Replace the entity's whole node set, keeping its root.
    ///
    /// Returns the previous node count.
    pub fn replace_tree(&self, caller: &Principal, entity: &EntityId, nodes: Vec<Node>) -> Result<usize> {
        let mut state = self.state.write();
        state.access.ensure_admin(caller)?;
        check_entity(entity)?;
        NodeStore::validate(&nodes)?;

        let root = state.roots.root(entity).unwrap_or(Hash::ZERO);
        let now = self.clock.now();
        let (previous, events) = replace_nodes(&mut state, entity, nodes, root, now)?;

        self.dirty.store(true, Ordering::Release);
        self.journal.lock().publish(events);
        Ok(previous)
    }

    /// Commit a new root without touching the node set
    pub fn commit_root(
        &self,
        caller: &Principal,
        entity: &EntityId,
        new_root: Hash,
        proof: Vec<u8>,
        reason: &str,
    ) -> Result<RootUpdate> {
        let mut state = self.state.write();
        state.access.ensure_admin(caller)?;
        check_entity(entity)?;

        let now = self.clock.now();
        let outcome = state.roots.commit(entity, new_root, proof, reason, now)?;
        let events = commit_events(entity, &outcome);

        self.dirty.store(true, Ordering::Release);
        self.journal.lock().publish(events);
        Ok(outcome.update)
    }

    /// Replace the node set and commit its root as one operation.
    ///
    /// Both steps are validated before either is applied. The node hashes
    /// are trusted as submitted; nothing checks that they chain to `new_root`.
    pub fn update_learning_tree(
        &self,
        caller: &Principal,
        entity: &EntityId,
        nodes: Vec<Node>,
        new_root: Hash,
        proof: Vec<u8>,
        reason: &str,
    ) -> Result<RootUpdate> {
        let mut state = self.state.write();
        state.access.ensure_admin(caller)?;
        check_entity(entity)?;
        NodeStore::validate(&nodes)?;
        state.roots.check_commit(entity, &new_root)?;

        let now = self.clock.now();
        let (_, mut events) = replace_nodes(&mut state, entity, nodes, new_root, now)?;
        let outcome = state.roots.commit(entity, new_root, proof, reason, now)?;
        events.extend(commit_events(entity, &outcome));

        self.dirty.store(true, Ordering::Release);
        self.journal.lock().publish(events);
        Ok(outcome.update)
    }

    /// Force the root when node data is unavailable or corrupted.
    ///
    /// Skips the duplicate-root guard and leaves the node set alone.
    pub fn emergency_reset(
        &self,
        caller: &Principal,
        entity: &EntityId,
        new_root: Hash,
        reason: &str,
    ) -> Result<RootUpdate> {
        let mut state = self.state.write();
        state.access.ensure_admin(caller)?;
        check_entity(entity)?;

        let now = self.clock.now();
        let outcome = state.roots.emergency_reset(entity, new_root, reason, now)?;
        info!(%entity, %new_root, "emergency root reset");
        let events = commit_events(entity, &outcome);

        self.dirty.store(true, Ordering::Release);
        self.journal.lock().publish(events);
        Ok(outcome.update)
    }

    // === Root & History Queries ===

    /// Current root, `None` before the first commit
    pub fn root(&self, entity: &EntityId) -> Option<Hash> {
        self.state.read().roots.root(entity)
    }

    /// Learning metrics, `None` before the first commit
    pub fn metrics(&self, entity: &EntityId) -> Option<LearningMetrics> {
        self.state.read().roots.metrics(entity).cloned()
    }

    /// Every root transition, oldest first
    pub fn update_history(&self, entity: &EntityId) -> Vec<RootUpdate> {
        self.state
            .read()
            .roots
            .history(entity)
            .into_iter()
            .cloned()
            .collect()
    }

    /// The `limit` most recent transitions, oldest first
    pub fn recent_updates(&self, entity: &EntityId, limit: usize) -> Result<Vec<RootUpdate>> {
        Ok(self
            .state
            .read()
            .roots
            .recent_updates(entity, limit)?
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn latest_update(&self, entity: &EntityId) -> Result<RootUpdate> {
        self.state.read().roots.latest_update(entity).cloned()
    }

    pub fn update_count(&self, entity: &EntityId) -> u64 {
        self.state.read().roots.update_count(entity)
    }

    /// Whether `root` was ever a root of the entity
    pub fn verify_root_in_history(&self, entity: &EntityId, root: &Hash) -> bool {
        self.state.read().roots.root_in_history(entity, root)
    }

    /// Entities known to the ledger, sorted
    pub fn entities(&self) -> Vec<EntityId> {
        let state = self.state.read();
        let mut entities: Vec<EntityId> = state
            .roots
            .entities()
            .into_iter()
            .chain(state.nodes.entities())
            .cloned()
            .collect();
        entities.sort();
        entities.dedup();
        entities
    }

    // === Node Queries ===

    pub fn node(&self, entity: &EntityId, hash: &Hash) -> Result<Node> {
        self.state
            .read()
            .nodes
            .get(entity, hash)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("node {} not found for {}", hash, entity)))
    }

    /// All nodes in insertion order
    pub fn all_nodes(&self, entity: &EntityId) -> Vec<Node> {
        self.state
            .read()
            .nodes
            .all_nodes(entity)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn nodes_at_level(&self, entity: &EntityId, level: u32) -> Vec<Node> {
        self.state
            .read()
            .nodes
            .nodes_at_level(entity, level)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn leaf_nodes(&self, entity: &EntityId) -> Vec<Node> {
        self.state
            .read()
            .nodes
            .leaf_nodes(entity)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn node_count(&self, entity: &EntityId) -> usize {
        self.state.read().nodes.node_count(entity)
    }

    pub fn tree_depth(&self, entity: &EntityId) -> u32 {
        self.state.read().nodes.tree_depth(entity)
    }

    pub fn verify_node_exists(&self, entity: &EntityId, hash: &Hash) -> bool {
        self.state.read().nodes.contains(entity, hash)
    }

    // === Verification ===

    /// Check a membership proof against the current root
    pub fn verify_proof(&self, entity: &EntityId, claim: &Hash, proof: &[Hash]) -> bool {
        ProofVerifier::verify(self.root(entity), claim, proof)
    }

    pub fn verify_individual_node(&self, entity: &EntityId, hash: &Hash) -> (bool, NodeIntegrity) {
        let state = self.state.read();
        IntegrityChecker::check_node(state.nodes.tree(entity), state.roots.root(entity), hash)
    }

    pub fn verify_tree_integrity(&self, entity: &EntityId) -> TreeIntegrityReport {
        let state = self.state.read();
        IntegrityChecker::check_tree(state.nodes.tree(entity), state.roots.root(entity))
    }

    /// Leaf-to-root path; partial if the root is unreachable
    pub fn path_to_root(&self, entity: &EntityId, leaf: &Hash) -> Result<Vec<Hash>> {
        let state = self.state.read();
        PathFinder::path_to_root(state.nodes.tree(entity), state.roots.root(entity), leaf)
    }

    /// Membership proof for a stored leaf, read off its path to the root
    pub fn generate_proof(&self, entity: &EntityId, leaf: &Hash) -> Result<Vec<Hash>> {
        let state = self.state.read();
        let tree = state.nodes.tree(entity);
        let path = PathFinder::path_to_root(tree, state.roots.root(entity), leaf)?;
        Ok(tree
            .map(|t| PathFinder::proof_along(t, &path))
            .unwrap_or_default())
    }

    pub fn path_to_root_bounded(&self, entity: &EntityId, leaf: &Hash, max_hops: usize) -> Result<Vec<Hash>> {
        let state = self.state.read();
        PathFinder::path_to_root_bounded(state.nodes.tree(entity), state.roots.root(entity), leaf, max_hops)
    }

    // === Event Journal ===

    /// Records published so far and not yet drained
    pub fn events(&self) -> Vec<Event> {
        self.journal.lock().records().cloned().collect()
    }

    /// Take every published record
    pub fn drain_events(&self) -> Vec<Event> {
        self.journal.lock().drain()
    }
}

impl Drop for LearningLedger {
    fn drop(&mut self) {
        // Best-effort sync of pending writes
        if self.has_unsynced_changes() {
            let _ = self.sync();
        }
    }
}

fn check_entity(entity: &EntityId) -> Result<()> {
    if entity.is_empty() {
        return Err(Error::InvalidInput("entity id must not be empty".into()));
    }
    Ok(())
}

/// Swap the node set and describe it; `new_root` is the root the tree is
/// stored under once the operation completes
fn replace_nodes(
    state: &mut LedgerState,
    entity: &EntityId,
    nodes: Vec<Node>,
    new_root: Hash,
    now: u64,
) -> Result<(usize, Vec<Event>)> {
    let previous_root = state.roots.root(entity).unwrap_or(Hash::ZERO);
    let mut events: Vec<Event> = nodes
        .iter()
        .map(|node| Event::NodeAdded {
            entity: entity.clone(),
            hash: node.hash,
            level: node.level,
            position: node.position,
            is_leaf: node.is_leaf,
            timestamp: now,
        })
        .collect();

    let previous_count = state.nodes.replace_tree(entity, nodes, now)?;
    let new_count = state.nodes.node_count(entity);

    events.push(Event::TreeReplaced {
        entity: entity.clone(),
        previous_count,
        new_count,
        previous_root,
        new_root,
        timestamp: now,
    });
    debug!(%entity, previous_count, new_count, "node set swapped");
    Ok((previous_count, events))
}

fn commit_events(entity: &EntityId, outcome: &CommitOutcome) -> Vec<Event> {
    let update = &outcome.update;
    let mut events: Vec<Event> = outcome
        .milestones
        .iter()
        .map(|milestone| Event::LearningMilestone {
            entity: entity.clone(),
            milestone: *milestone,
            update_count: outcome.update_count,
            timestamp: update.timestamp,
        })
        .collect();

    events.push(Event::RootUpdated {
        entity: entity.clone(),
        previous_root: update.previous_root,
        new_root: update.new_root,
        reason: update.reason.clone(),
        kind: update.kind,
        update_count: outcome.update_count,
        timestamp: update.timestamp,
    });
    events
}
