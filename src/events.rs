//! Structured records emitted on every mutation
//!
//! Each record is logged through `tracing` on the `learning_ledger::events`
//! target and kept in a bounded in-process journal that external indexers
//! drain. Once the journal is full the oldest records are dropped.
//! Records of a failed operation are never published.

use crate::analytics::Milestone;
use crate::model::{EntityId, Hash, UpdateKind};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info};

/// Log target for published records
pub const EVENT_TARGET: &str = "learning_ledger::events";

/// A structured record of a state change
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    NodeAdded {
        entity: EntityId,
        hash: Hash,
        level: u32,
        position: u32,
        is_leaf: bool,
        timestamp: u64,
    },
    TreeReplaced {
        entity: EntityId,
        previous_count: usize,
        new_count: usize,
        previous_root: Hash,
        new_root: Hash,
        timestamp: u64,
    },
    RootUpdated {
        entity: EntityId,
        previous_root: Hash,
        new_root: Hash,
        reason: String,
        kind: UpdateKind,
        update_count: u64,
        timestamp: u64,
    },
    LearningMilestone {
        entity: EntityId,
        milestone: Milestone,
        update_count: u64,
        timestamp: u64,
    },
}

impl Event {
    /// Entity the record belongs to
    pub fn entity(&self) -> &EntityId {
        match self {
            Event::NodeAdded { entity, .. }
            | Event::TreeReplaced { entity, .. }
            | Event::RootUpdated { entity, .. }
            | Event::LearningMilestone { entity, .. } => entity,
        }
    }

    /// Short record name, as indexers see it
    pub fn name(&self) -> &'static str {
        match self {
            Event::NodeAdded { .. } => "node_added",
            Event::TreeReplaced { .. } => "tree_replaced",
            Event::RootUpdated { .. } => "root_updated",
            Event::LearningMilestone { .. } => "learning_milestone",
        }
    }

    fn log(&self) {
        match self {
            Event::NodeAdded {
                entity,
                hash,
                level,
                position,
                is_leaf,
                ..
            } => info!(
                target: EVENT_TARGET,
                %entity, %hash, level, position, is_leaf,
                "node added"
            ),
            Event::TreeReplaced {
                entity,
                previous_count,
                new_count,
                previous_root,
                new_root,
                ..
            } => info!(
                target: EVENT_TARGET,
                %entity, previous_count, new_count, %previous_root, %new_root,
                "tree structure replaced"
            ),
            Event::RootUpdated {
                entity,
                previous_root,
                new_root,
                reason,
                kind,
                update_count,
                ..
            } => info!(
                target: EVENT_TARGET,
                %entity, %previous_root, %new_root, reason = reason.as_str(),
                kind = kind.as_str(), update_count,
                "root updated"
            ),
            Event::LearningMilestone {
                entity,
                milestone,
                update_count,
                ..
            } => info!(
                target: EVENT_TARGET,
                %entity, milestone = milestone.name(), update_count,
                "learning milestone"
            ),
        }
    }
}

/// Records kept by a journal before the oldest are dropped
pub const DEFAULT_JOURNAL_CAPACITY: usize = 4096;

/// Published records, oldest first, bounded by a capacity
#[derive(Debug)]
pub struct EventJournal {
    records: VecDeque<Event>,
    capacity: usize,
    dropped: u64,
}

impl Default for EventJournal {
    fn default() -> Self {
        EventJournal::with_capacity(DEFAULT_JOURNAL_CAPACITY)
    }
}

impl EventJournal {
    pub fn new() -> Self {
        EventJournal::default()
    }

    /// A journal keeping at most `capacity` records; 0 keeps none and only logs
    pub fn with_capacity(capacity: usize) -> Self {
        EventJournal {
            records: VecDeque::new(),
            capacity,
            dropped: 0,
        }
    }

    /// Log every record of a committed operation and keep the newest ones
    pub fn publish(&mut self, events: Vec<Event>) {
        for event in &events {
            event.log();
        }
        self.records.extend(events);

        let excess = self.records.len().saturating_sub(self.capacity);
        if excess > 0 {
            self.records.drain(..excess);
            self.dropped += excess as u64;
            debug!(excess, capacity = self.capacity, "journal full; oldest records dropped");
        }
    }

    /// Records not yet drained, oldest first
    pub fn records(&self) -> impl Iterator<Item = &Event> + '_ {
        self.records.iter()
    }

    /// Take all records, leaving the journal empty
    pub fn drain(&mut self) -> Vec<Event> {
        self.records.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records discarded because the journal was full
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_added(entity: &str) -> Event {
        Event::NodeAdded {
            entity: EntityId::new(entity),
            hash: Hash::digest(entity.as_bytes()),
            level: 0,
            position: 0,
            is_leaf: true,
            timestamp: 10,
        }
    }

    #[test]
    fn test_publish_and_drain() {
        let mut journal = EventJournal::new();
        journal.publish(vec![node_added("a"), node_added("b")]);
        assert_eq!(journal.len(), 2);
        assert_eq!(journal.records().nth(1).unwrap().entity().as_str(), "b");

        let drained = journal.drain();
        assert_eq!(drained.len(), 2);
        assert!(journal.is_empty());
    }

    #[test]
    fn test_event_json_is_tagged() {
        let json = serde_json::to_value(node_added("a")).unwrap();
        assert_eq!(json["event"], "node_added");
        assert_eq!(node_added("a").name(), "node_added");
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut journal = EventJournal::with_capacity(3);
        for name in ["a", "b", "c", "d", "e"] {
            journal.publish(vec![node_added(name)]);
        }

        assert_eq!(journal.len(), 3);
        assert_eq!(journal.dropped(), 2);
        let kept: Vec<_> = journal.records().map(|e| e.entity().as_str()).collect();
        assert_eq!(kept, vec!["c", "d", "e"]);
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let mut journal = EventJournal::with_capacity(0);
        journal.publish(vec![node_added("a"), node_added("b")]);

        assert!(journal.is_empty());
        assert_eq!(journal.dropped(), 2);
    }
}
