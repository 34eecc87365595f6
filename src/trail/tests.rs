use super::*;
use crate::finger::FingerSlot;

fn make_hash(val: u8) -> HashCode {
    let mut bytes = [0u8; 32];
    bytes[0] = val;
    HashCode::from_bytes(bytes)
}

fn make_peer_id(val: u8) -> PeerId {
    let mut bytes = [0u8; 32];
    bytes[0] = val;
    PeerId::from_bytes(bytes)
}

fn relay_trail(expires_at_ms: u64) -> Trail {
    Trail {
        pred_id: Some(make_hash(1)),
        succ_id: Some(make_hash(2)),
        pred: Some(make_peer_id(1)),
        succ: Some(make_peer_id(2)),
        expires_at_ms,
        finger: None,
    }
}

// ===== Trail Tests =====

#[test]
fn test_trail_roles() {
    let local = Trail::originated(make_peer_id(1), make_hash(1), 100);
    assert!(local.is_local_origin());
    assert!(!local.terminates_here());

    let terminal = Trail::from_predecessor(make_peer_id(1), make_hash(1), 100);
    assert!(!terminal.is_local_origin());
    assert!(terminal.terminates_here());
}

#[test]
fn test_trail_hops() {
    let trail = relay_trail(100);
    assert_eq!(
        trail.hop(Direction::TowardPredecessor),
        Some((make_peer_id(1), make_hash(1)))
    );
    assert_eq!(
        trail.hop(Direction::TowardSuccessor),
        Some((make_peer_id(2), make_hash(2)))
    );
    let terminal = Trail::from_predecessor(make_peer_id(1), make_hash(1), 100);
    assert_eq!(terminal.hop(Direction::TowardSuccessor), None);
}

#[test]
fn test_trail_side_matching() {
    let trail = relay_trail(100);
    assert_eq!(
        trail.side_of(&make_peer_id(2)),
        Some(Direction::TowardSuccessor)
    );
    assert_eq!(trail.side_of(&make_peer_id(3)), None);

    assert_eq!(
        trail.id_matches_side(&make_hash(1), &make_peer_id(1)),
        Some(Direction::TowardPredecessor)
    );
    // Right id, wrong sender
    assert_eq!(trail.id_matches_side(&make_hash(1), &make_peer_id(2)), None);
}

#[test]
fn test_direction_reverse() {
    assert_eq!(
        Direction::TowardPredecessor.reverse(),
        Direction::TowardSuccessor
    );
    assert_eq!(Direction::TowardSuccessor.to_string(), "successor");
}

// ===== Registry Tests =====

#[test]
fn test_register_and_lookup_both_ids() {
    let mut registry = TrailRegistry::new();
    let key = registry.register(relay_trail(100)).unwrap();

    assert_eq!(registry.lookup(&make_hash(1)), Some(key));
    assert_eq!(registry.lookup(&make_hash(2)), Some(key));
    assert_eq!(registry.lookup(&make_hash(3)), None);
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.id_count(), 2);
}

#[test]
fn test_register_duplicate_id_fails_cleanly() {
    let mut registry = TrailRegistry::new();
    registry
        .register(Trail::originated(make_peer_id(1), make_hash(7), 100))
        .unwrap();

    let result = registry.register(Trail::from_predecessor(make_peer_id(2), make_hash(7), 50));
    assert!(matches!(result, Err(TrailError::DuplicateId(id)) if id == make_hash(7)));
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.next_expiry(), Some(100));
}

#[test]
fn test_register_same_id_both_sides_fails() {
    let mut registry = TrailRegistry::new();
    let mut trail = relay_trail(100);
    trail.succ_id = trail.pred_id;
    assert!(registry.register(trail).is_err());
    assert!(registry.is_empty());
}

#[test]
fn test_register_id_adds_successor_leg() {
    let mut registry = TrailRegistry::new();
    let key = registry
        .register(Trail::from_predecessor(make_peer_id(1), make_hash(1), 100))
        .unwrap();

    registry
        .register_id(key, Direction::TowardSuccessor, make_hash(2))
        .unwrap();
    assert_eq!(registry.lookup(&make_hash(2)), Some(key));
    assert_eq!(registry.get(key).unwrap().succ_id, Some(make_hash(2)));

    // Side already has an id
    assert!(
        registry
            .register_id(key, Direction::TowardSuccessor, make_hash(3))
            .is_err()
    );
    // Id taken by this trail's other side
    assert!(
        registry
            .register_id(key, Direction::TowardPredecessor, make_hash(2))
            .is_err()
    );
}

#[test]
fn test_remove_clears_indexes() {
    let mut registry = TrailRegistry::new();
    let key = registry.register(relay_trail(100)).unwrap();

    let trail = registry.remove(key).unwrap();
    assert_eq!(trail.pred, Some(make_peer_id(1)));
    assert!(registry.is_empty());
    assert_eq!(registry.id_count(), 0);
    assert_eq!(registry.next_expiry(), None);
    assert!(registry.remove(key).is_none());
}

#[test]
fn test_expiry_order() {
    let mut registry = TrailRegistry::new();
    let late = registry
        .register(Trail::originated(make_peer_id(1), make_hash(1), 300))
        .unwrap();
    let early = registry
        .register(Trail::originated(make_peer_id(1), make_hash(2), 100))
        .unwrap();

    assert_eq!(registry.next_expiry(), Some(100));
    assert_eq!(registry.first_expired(99), None);
    assert_eq!(registry.first_expired(100), Some(early));

    registry.remove(early);
    assert_eq!(registry.first_expired(200), None);
    assert_eq!(registry.first_expired(300), Some(late));
}

#[test]
fn test_same_expiry_distinct_entries() {
    let mut registry = TrailRegistry::new();
    let a = registry
        .register(Trail::originated(make_peer_id(1), make_hash(1), 100))
        .unwrap();
    let b = registry
        .register(Trail::originated(make_peer_id(1), make_hash(2), 100))
        .unwrap();
    assert_ne!(a, b);

    registry.remove(a);
    assert_eq!(registry.first_expired(100), Some(b));
}

#[test]
fn test_finger_slot_carried() {
    let mut registry = TrailRegistry::new();
    let mut trail = Trail::originated(make_peer_id(1), make_hash(1), 100);
    trail.finger = Some(FingerSlot { layer: 2, index: 5 });
    let key = registry.register(trail).unwrap();
    assert_eq!(
        registry.get(key).unwrap().finger,
        Some(FingerSlot { layer: 2, index: 5 })
    );
}
