//! Current roots and the append-only log of root transitions

use crate::analytics::{LearningMetrics, MetricsEngine, Milestone};
use crate::model::{EntityId, Hash, RootUpdate, UpdateKind};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Per-entity view over the shared update arena
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct EntityHistory {
    current_root: Hash,
    /// Indices into `RootLedger::arena`, oldest first
    updates: Vec<usize>,
    last_update: u64,
    metrics: LearningMetrics,
}

/// What a successful commit or reset produced
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitOutcome {
    pub update: RootUpdate,
    /// Update count including this update
    pub update_count: u64,
    pub milestones: Vec<Milestone>,
}

/// Root ledger for all entities
///
/// Updates live in one append-only arena; entities only hold indices into
/// it. Nothing here is touched by a tree replace.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RootLedger {
    arena: Vec<RootUpdate>,
    entities: HashMap<EntityId, EntityHistory>,
    #[serde(skip)]
    engine: MetricsEngine,
}

impl RootLedger {
    pub fn new() -> Self {
        RootLedger::default()
    }

    /// Validate a regular commit without applying it
    pub fn check_commit(&self, entity: &EntityId, new_root: &Hash) -> Result<()> {
        if new_root.is_zero() {
            return Err(Error::zero_hash("new root"));
        }
        if self.root(entity).as_ref() == Some(new_root) {
            return Err(Error::DuplicateCommit {
                entity: entity.clone(),
                root: *new_root,
            });
        }
        Ok(())
    }

    /// Record a new root for `entity`.
    ///
    /// Fails with `InvalidInput` on a zero root and `DuplicateCommit` when
    /// the root is unchanged. Milestones are evaluated after the metrics.
    pub fn commit(
        &mut self,
        entity: &EntityId,
        new_root: Hash,
        proof: Vec<u8>,
        reason: impl Into<String>,
        now: u64,
    ) -> Result<CommitOutcome> {
        self.check_commit(entity, &new_root)?;
        Ok(self.record(entity, new_root, proof, reason.into(), UpdateKind::Commit, now))
    }

    /// Force a new root, accepting the current one again.
    ///
    /// Used for recovery when node data is unavailable; no milestones fire.
    pub fn emergency_reset(
        &mut self,
        entity: &EntityId,
        new_root: Hash,
        reason: impl Into<String>,
        now: u64,
    ) -> Result<CommitOutcome> {
        if new_root.is_zero() {
            return Err(Error::zero_hash("reset root"));
        }
        Ok(self.record(
            entity,
            new_root,
            Vec::new(),
            reason.into(),
            UpdateKind::EmergencyReset,
            now,
        ))
    }

    fn record(
        &mut self,
        entity: &EntityId,
        new_root: Hash,
        proof: Vec<u8>,
        reason: String,
        kind: UpdateKind,
        now: u64,
    ) -> CommitOutcome {
        let history = self.entities.entry(entity.clone()).or_default();
        let previous_root = history.current_root;
        let idle_secs = history
            .updates
            .last()
            .map(|_| now.saturating_sub(history.last_update));

        let update = RootUpdate {
            previous_root,
            new_root,
            proof,
            reason,
            kind,
            timestamp: now,
        };

        history.current_root = new_root;
        history.updates.push(self.arena.len());
        self.arena.push(update.clone());
        let update_count = history.updates.len() as u64;
        history.last_update = now;

        self.engine
            .record_update(&mut history.metrics, update_count, now);

        let milestones = match kind {
            UpdateKind::Commit => Milestone::reached(update_count, idle_secs),
            UpdateKind::EmergencyReset => Vec::new(),
        };

        debug!(%entity, %new_root, update_count, kind = kind.as_str(), "root recorded");
        CommitOutcome {
            update,
            update_count,
            milestones,
        }
    }

    // === Queries ===

    /// Current root, `None` before the first update
    pub fn root(&self, entity: &EntityId) -> Option<Hash> {
        self.entities
            .get(entity)
            .and_then(|h| h.current_root.non_zero())
    }

    /// Derived metrics, `None` before the first update
    pub fn metrics(&self, entity: &EntityId) -> Option<&LearningMetrics> {
        self.entities.get(entity).map(|h| &h.metrics)
    }

    /// Full update history, oldest first
    pub fn history(&self, entity: &EntityId) -> Vec<&RootUpdate> {
        self.entities
            .get(entity)
            .map(|h| h.updates.iter().map(|&i| &self.arena[i]).collect())
            .unwrap_or_default()
    }

    /// The `limit` most recent updates, oldest first
    pub fn recent_updates(&self, entity: &EntityId, limit: usize) -> Result<Vec<&RootUpdate>> {
        if limit == 0 {
            return Err(Error::InvalidInput("update limit must be at least 1".into()));
        }
        let history = self.history(entity);
        let skip = history.len().saturating_sub(limit);
        Ok(history.into_iter().skip(skip).collect())
    }

    pub fn latest_update(&self, entity: &EntityId) -> Result<&RootUpdate> {
        self.entities
            .get(entity)
            .and_then(|h| h.updates.last())
            .map(|&i| &self.arena[i])
            .ok_or_else(|| Error::NotFound(format!("no update history for {}", entity)))
    }

    pub fn update_count(&self, entity: &EntityId) -> u64 {
        self.entities
            .get(entity)
            .map_or(0, |h| h.updates.len() as u64)
    }

    /// Whether `root` was ever the entity's root
    pub fn root_in_history(&self, entity: &EntityId, root: &Hash) -> bool {
        if root.is_zero() {
            return false;
        }
        self.history(entity).iter().any(|u| u.mentions(root))
    }

    /// Entities with at least one update, sorted
    pub fn entities(&self) -> Vec<&EntityId> {
        let mut entities: Vec<_> = self.entities.keys().collect();
        entities.sort();
        entities
    }
}
