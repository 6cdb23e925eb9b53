//! Ledger scenarios through the public API

use learning_ledger::analytics::{IDLE_GAP_SECS, ONE_HOUR_SECS};
use learning_ledger::{
    EntityId, Error, Event, Hash, LearningLedger, ManualClock, MerkleTreeBuilder, Milestone, Node,
    Principal, MAX_PATH_HOPS,
};

const START: u64 = 1_700_000_000;

fn admin() -> Principal {
    Principal::new("admin")
}

fn agent() -> EntityId {
    EntityId::new("agent-42")
}

fn setup() -> (LearningLedger, ManualClock) {
    let clock = ManualClock::new(START);
    let ledger = LearningLedger::in_memory(admin()).with_clock(clock.clone());
    (ledger, clock)
}

fn root(n: u64) -> Hash {
    Hash::digest(&n.to_be_bytes())
}

fn milestones(events: &[Event]) -> Vec<Milestone> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::LearningMilestone { milestone, .. } => Some(*milestone),
            _ => None,
        })
        .collect()
}

#[test]
fn test_four_leaf_proof() {
    let (ledger, _clock) = setup();
    let l: Vec<Node> = ["L0", "L1", "L2", "L3"]
        .iter()
        .enumerate()
        .map(|(i, p)| Node::leaf(p.as_bytes().to_vec(), i as u32))
        .collect();
    let p0 = Node::internal(l[0].hash, l[1].hash, 1, 0);
    let p1 = Node::internal(l[2].hash, l[3].hash, 1, 1);
    let r = Node::internal(p0.hash, p1.hash, 2, 0);
    let (l0, l1, p1_hash, r_hash) = (l[0].hash, l[1].hash, p1.hash, r.hash);

    let mut nodes = l;
    nodes.extend([p0, p1, r]);
    ledger
        .update_learning_tree(&admin(), &agent(), nodes, r_hash, vec![], "four leaves")
        .unwrap();

    assert!(ledger.verify_proof(&agent(), &l0, &[l1, p1_hash]));
    assert!(!ledger.verify_proof(&agent(), &l0, &[Hash::digest(b"wrong"), p1_hash]));

    // same inputs, same answer
    for _ in 0..3 {
        assert!(ledger.verify_proof(&agent(), &l0, &[l1, p1_hash]));
    }
}

#[test]
fn test_duplicate_commit_rejected() {
    let (ledger, clock) = setup();
    ledger
        .commit_root(&admin(), &agent(), root(1), vec![], "first")
        .unwrap();
    clock.advance(10);

    let err = ledger
        .commit_root(&admin(), &agent(), root(1), vec![], "again")
        .unwrap_err();

    assert!(matches!(err, Error::DuplicateCommit { .. }));
    assert!(err.to_string().contains("Root unchanged"));
    assert_eq!(ledger.update_count(&agent()), 1);
}

#[test]
fn test_total_replace() {
    let (ledger, _clock) = setup();
    let old = MerkleTreeBuilder::from_payloads(["a", "b", "c", "d"])
        .build()
        .unwrap();
    ledger
        .update_learning_tree(&admin(), &agent(), old.nodes.clone(), old.root, vec![], "old")
        .unwrap();

    let new = MerkleTreeBuilder::from_payloads(["c", "e"]).build().unwrap();
    let previous = ledger
        .replace_tree(&admin(), &agent(), new.nodes.clone())
        .unwrap();
    assert_eq!(previous, old.nodes.len());

    let new_hashes: Vec<Hash> = new.nodes.iter().map(|n| n.hash).collect();
    for node in &old.nodes {
        if !new_hashes.contains(&node.hash) {
            assert!(!ledger.verify_node_exists(&agent(), &node.hash));
        }
    }
    assert_eq!(ledger.node_count(&agent()), new.nodes.len());
    // replace alone leaves the root in place
    assert_eq!(ledger.root(&agent()), Some(old.root));
}

#[test]
fn test_path_shapes() {
    let (ledger, _clock) = setup();
    let leaf = Node::leaf(b"only child".to_vec(), 0);
    let top = Node::with_hash(Hash::digest(b"top"), false)
        .with_left(leaf.hash)
        .at(1, 0);
    let (leaf_hash, top_hash) = (leaf.hash, top.hash);
    ledger
        .update_learning_tree(&admin(), &agent(), vec![top, leaf], top_hash, vec![], "two levels")
        .unwrap();

    assert_eq!(
        ledger.path_to_root(&agent(), &leaf_hash).unwrap(),
        vec![leaf_hash, top_hash]
    );
    assert!(matches!(
        ledger.path_to_root(&agent(), &top_hash),
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
        ledger.path_to_root(&agent(), &Hash::digest(b"absent")),
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        ledger.path_to_root_bounded(&agent(), &leaf_hash, 0),
        Err(Error::InvalidInput(_))
    ));
}

#[test]
fn test_path_never_exceeds_bound() {
    let (ledger, _clock) = setup();
    // a chain of 300 single-child internal nodes above one leaf
    let leaf = Node::leaf(b"deep".to_vec(), 0);
    let mut nodes = vec![leaf.clone()];
    let mut below = leaf.hash;
    for level in 1..=300u32 {
        let node = Node::with_hash(Hash::digest(&level.to_le_bytes()), false)
            .with_left(below)
            .at(level, 0);
        below = node.hash;
        nodes.push(node);
    }
    ledger
        .update_learning_tree(&admin(), &agent(), nodes, below, vec![], "deep")
        .unwrap();

    let path = ledger.path_to_root(&agent(), &leaf.hash).unwrap();
    assert_eq!(path.len(), MAX_PATH_HOPS + 1);
    assert_ne!(path.last(), Some(&below));
}

#[test]
fn test_confidence_and_first_decade() {
    let (ledger, clock) = setup();

    ledger
        .commit_root(&admin(), &agent(), root(1), vec![], "first")
        .unwrap();
    assert_eq!(ledger.metrics(&agent()).unwrap().confidence_score, 0);

    for i in 2..=9 {
        clock.advance(60);
        ledger
            .commit_root(&admin(), &agent(), root(i), vec![], "step")
            .unwrap();
    }
    ledger.drain_events();

    clock.advance(2 * ONE_HOUR_SECS);
    ledger
        .commit_root(&admin(), &agent(), root(10), vec![], "tenth")
        .unwrap();

    let metrics = ledger.metrics(&agent()).unwrap();
    assert_eq!(metrics.confidence_score, 1003);
    assert_eq!(metrics.learning_velocity, 12);
    assert_eq!(metrics.total_interactions, 10);

    let events = ledger.drain_events();
    assert_eq!(milestones(&events), vec![Milestone::FirstDecade]);
    // milestone is reported before the root update
    assert!(matches!(events.last(), Some(Event::RootUpdated { .. })));

    clock.advance(60);
    ledger
        .commit_root(&admin(), &agent(), root(11), vec![], "eleventh")
        .unwrap();
    assert!(milestones(&ledger.drain_events()).is_empty());
}

#[test]
fn test_idle_gap_milestone() {
    let (ledger, clock) = setup();
    ledger
        .commit_root(&admin(), &agent(), root(1), vec![], "first")
        .unwrap();
    assert!(milestones(&ledger.drain_events()).is_empty());

    clock.advance(IDLE_GAP_SECS);
    ledger
        .commit_root(&admin(), &agent(), root(2), vec![], "back")
        .unwrap();

    assert_eq!(
        milestones(&ledger.drain_events()),
        vec![Milestone::IdleGap { idle_days: 30 }]
    );
}

#[test]
fn test_integrity_flags_missing_child() {
    let (ledger, _clock) = setup();
    let b = Hash::digest(b"B");
    let a = Node::with_hash(Hash::digest(b"A"), false).with_left(b).at(1, 0);
    let a_hash = a.hash;
    ledger.replace_tree(&admin(), &agent(), vec![a]).unwrap();

    let (valid, info) = ledger.verify_individual_node(&agent(), &a_hash);
    assert!(!valid);
    assert!(info.exists);
    assert!(!info.has_valid_children);

    let report = ledger.verify_tree_integrity(&agent());
    assert!(!report.is_consistent());
    assert_eq!(report.invalid_nodes[0].0, a_hash);
}

#[test]
fn test_zero_hash_node_rejected_atomically() {
    let (ledger, _clock) = setup();
    let good = MerkleTreeBuilder::from_payloads(["a", "b"]).build().unwrap();
    ledger
        .update_learning_tree(&admin(), &agent(), good.nodes.clone(), good.root, vec![], "good")
        .unwrap();
    ledger.drain_events();

    let mut bad = MerkleTreeBuilder::from_payloads(["c", "d"]).build().unwrap();
    bad.nodes.push(Node::with_hash(Hash::ZERO, true));
    let err = ledger
        .update_learning_tree(&admin(), &agent(), bad.nodes, bad.root, vec![], "bad")
        .unwrap_err();

    assert!(matches!(err, Error::InvalidInput(_)));
    assert_eq!(ledger.root(&agent()), Some(good.root));
    assert_eq!(ledger.node_count(&agent()), good.nodes.len());
    assert!(ledger.events().is_empty());
}

#[test]
fn test_history_queries() {
    let (ledger, clock) = setup();
    assert!(matches!(
        ledger.latest_update(&agent()),
        Err(Error::NotFound(_))
    ));

    for i in 1..=3 {
        ledger
            .commit_root(&admin(), &agent(), root(i), vec![i as u8], "step")
            .unwrap();
        clock.advance(5);
    }

    let history = ledger.update_history(&agent());
    assert_eq!(history.len(), 3);
    assert_eq!(history[1].previous_root, root(1));
    assert_eq!(history[2].new_root, root(3));
    assert_eq!(ledger.latest_update(&agent()).unwrap().proof, vec![3]);
    assert!(ledger.verify_root_in_history(&agent(), &root(1)));
    assert!(!ledger.verify_root_in_history(&agent(), &root(4)));
    assert_eq!(ledger.recent_updates(&agent(), 10).unwrap().len(), 3);
}

#[test]
fn test_entities_do_not_interfere() {
    let (ledger, _clock) = setup();
    let other = EntityId::new("agent-43");
    let tree = MerkleTreeBuilder::from_payloads(["shared"]).build().unwrap();

    ledger
        .update_learning_tree(&admin(), &agent(), tree.nodes.clone(), tree.root, vec![], "a")
        .unwrap();
    ledger
        .update_learning_tree(&admin(), &other, tree.nodes.clone(), tree.root, vec![], "b")
        .unwrap();
    ledger.replace_tree(&admin(), &other, vec![]).unwrap();

    assert_eq!(ledger.node_count(&agent()), 1);
    assert_eq!(ledger.node_count(&other), 0);
    assert_eq!(ledger.root(&other), Some(tree.root));
}

#[test]
fn test_emergency_reset_fires_no_milestone() {
    let (ledger, clock) = setup();
    for i in 1..=9 {
        ledger
            .commit_root(&admin(), &agent(), root(i), vec![], "step")
            .unwrap();
        clock.advance(60);
    }
    ledger.drain_events();

    // the tenth update is a reset after a long break
    clock.advance(IDLE_GAP_SECS);
    ledger
        .emergency_reset(&admin(), &agent(), root(10), "node data lost")
        .unwrap();

    assert_eq!(ledger.update_count(&agent()), 10);
    let events = ledger.drain_events();
    assert!(milestones(&events).is_empty());
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], Event::RootUpdated { update_count: 10, .. }));

    // counting continues past the reset without a late milestone
    clock.advance(60);
    ledger
        .commit_root(&admin(), &agent(), root(11), vec![], "eleventh")
        .unwrap();
    assert!(milestones(&ledger.drain_events()).is_empty());
}

#[test]
fn test_journal_stays_bounded_without_draining() {
    let (ledger, clock) = setup();
    let ledger = ledger.with_journal_capacity(16);

    for i in 0..1000 {
        clock.advance(1);
        ledger
            .commit_root(&admin(), &agent(), root(i), vec![], "step")
            .unwrap();
    }

    assert_eq!(ledger.events().len(), 16);
    assert_eq!(ledger.update_count(&agent()), 1000);
}
