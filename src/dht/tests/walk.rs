//! Random walk tests.

use super::*;
use crate::datacache::BLOCK_TYPE_ANY;
use crate::protocol::{RouteOptions, TrailPayload};
use crate::trail::Direction;

// ===== Initiation Tests =====

#[test]
fn test_walk_without_friends() {
    let (mut ctx, _clients) = make_context(4);
    assert!(matches!(
        ctx.initiate_random_walk_on_layer(0, 0),
        Err(RoutingError::NoFriends)
    ));
    assert!(matches!(ctx.do_random_walk(0), Err(RoutingError::NoFriends)));
    assert_eq!(ctx.random_walk_due(), None);
    assert!(ctx.trails().is_empty());
}

#[test]
fn test_walk_starts_pending_finger() {
    let (mut ctx, _clients) = make_context(4);
    let (a, mut a_rx) = connect(&mut ctx, 1);

    let key = ctx.initiate_random_walk_on_layer(1, 0).unwrap();
    let init = expect_walk_init(recv_one(&mut a_rx));
    assert_eq!(init.hops_taken, 0);
    assert_eq!(init.layer, 1);
    assert_eq!(ctx.trails().lookup(&init.trail_id), Some(key));

    let trail = ctx.trails().get(key).unwrap();
    assert!(trail.is_local_origin());
    assert_eq!(trail.succ, Some(a));
    assert_eq!(trail.expires_at_ms, 60_000);

    let table = ctx.finger_table(1).unwrap();
    let finger = table.get(0).unwrap();
    assert_eq!(finger.trail, key);
    assert!(!finger.valid);
    assert_eq!(table.number_valid(), 0);
    assert_eq!(table.walk_offset(), 1);
    assert_eq!(ctx.stats().walks_initiated, 1);
}

#[test]
fn test_do_random_walk_round_robin_and_schedule() {
    let (mut ctx, _clients) = make_context(4);
    let (_a, mut a_rx) = connect(&mut ctx, 1);

    ctx.do_random_walk(0).unwrap();
    // Bootstrap interval while fewer than initial_random_walks started
    assert_eq!(ctx.random_walk_due(), Some(100));
    ctx.do_random_walk(100).unwrap();
    // Steady-state delay afterwards
    assert_eq!(ctx.random_walk_due(), Some(100 + 10_000));
    ctx.do_random_walk(10_100).unwrap();

    let layers: Vec<u16> = drain(&mut a_rx)
        .into_iter()
        .map(|m| expect_walk_init(m).layer)
        .collect();
    assert_eq!(layers, vec![0, 1, 0]);
}

#[test]
fn test_walk_evicts_oldest_slot() {
    let mut config = test_config();
    config.dht.finger_array_size = 2;
    config.dht.request_successors = false;
    let (mut ctx, _clients) = make_context_with(config, 4);
    let (a, mut a_rx) = connect(&mut ctx, 1);

    let (first, first_id) = make_finger(&mut ctx, 0, &a, &mut a_rx, make_hash(0x10));
    make_finger(&mut ctx, 0, &a, &mut a_rx, make_hash(0x20));
    assert_eq!(ctx.finger_table(0).unwrap().number_valid(), 2);

    let third = ctx.initiate_random_walk_on_layer(0, 0).unwrap();
    let msgs = drain(&mut a_rx);
    assert_eq!(msgs.len(), 2);
    assert_eq!(expect_destroy(msgs[0].clone()).trail_id, first_id);
    expect_walk_init(msgs[1].clone());

    assert!(!ctx.trails().contains(first));
    let table = ctx.finger_table(0).unwrap();
    assert_eq!(table.get(0).unwrap().trail, third);
    assert_eq!(table.number_valid(), 1);
    assert_eq!(ctx.stats().fingers_evicted, 1);
    assert_eq!(ctx.stats().invariant_violations, 0);
}

// ===== Relay Tests =====

#[test]
fn test_relay_extends_walk() {
    let (mut ctx, _clients) = make_context(5);
    let (a, mut a_rx) = connect(&mut ctx, 1);

    let pred_id = HashCode::random();
    let init = WalkInit {
        hops_taken: 2,
        layer: 0,
        trail_id: pred_id,
    };
    deliver(&mut ctx, &a, &RoutingMessage::WalkInit(init));

    // Only friend is A, so the walk goes back to it under a new id
    let next = expect_walk_init(recv_one(&mut a_rx));
    assert_eq!(next.hops_taken, 3);
    assert_ne!(next.trail_id, pred_id);

    let key = ctx.trails().lookup(&pred_id).unwrap();
    assert_eq!(ctx.trails().lookup(&next.trail_id), Some(key));
    let trail = ctx.trails().get(key).unwrap();
    assert_eq!(trail.pred, Some(a));
    assert_eq!(trail.succ, Some(a));
    assert_eq!(
        trail.id_matches_side(&pred_id, &a),
        Some(Direction::TowardPredecessor)
    );
    assert_eq!(ctx.stats().walks_relayed, 1);
}

#[test]
fn test_walk_ends_past_estimate() {
    let (mut ctx, _clients) = make_context(2);
    let (a, mut a_rx) = connect(&mut ctx, 1);

    // Store a block so layer 0 has a random key to report
    let key_stored = make_hash(0x77);
    let _ = ctx.handle_put(PutRequest {
        key: key_stored,
        block_type: 1,
        options: RouteOptions::new(),
        desired_replication_level: 1,
        expiration_us: u64::MAX,
        data: vec![1],
    });

    let pred_id = HashCode::random();
    let init = WalkInit {
        hops_taken: 3,
        layer: 0,
        trail_id: pred_id,
    };
    deliver(&mut ctx, &a, &RoutingMessage::WalkInit(init));

    let response = expect_walk_response(recv_one(&mut a_rx));
    assert_eq!(response.trail_id, pred_id);
    assert_eq!(response.location, key_stored);

    let key = ctx.trails().lookup(&pred_id).unwrap();
    assert!(ctx.trails().get(key).unwrap().terminates_here());
    assert_eq!(ctx.stats().walks_answered, 1);
}

#[test]
fn test_walk_at_estimate_is_relayed() {
    let (mut ctx, _clients) = make_context(3);
    let (a, mut a_rx) = connect(&mut ctx, 1);
    let init = WalkInit {
        hops_taken: 3,
        layer: 0,
        trail_id: HashCode::random(),
    };
    deliver(&mut ctx, &a, &RoutingMessage::WalkInit(init));
    expect_walk_init(recv_one(&mut a_rx));
}

#[test]
fn test_upper_layer_reports_lower_finger() {
    let mut config = test_config();
    config.dht.request_successors = false;
    let (mut ctx, _clients) = make_context_with(config, 0);
    let (a, mut a_rx) = connect(&mut ctx, 1);
    let destination = make_hash(0x5a);
    make_finger(&mut ctx, 0, &a, &mut a_rx, destination);

    let init = WalkInit {
        hops_taken: 1,
        layer: 1,
        trail_id: HashCode::random(),
    };
    deliver(&mut ctx, &a, &RoutingMessage::WalkInit(init));
    let response = expect_walk_response(recv_one(&mut a_rx));
    assert_eq!(response.location, destination);
}

#[test]
fn test_walk_init_rejections() {
    let (mut ctx, _clients) = make_context(0);
    let (a, mut a_rx) = connect(&mut ctx, 1);

    // Layer out of range
    let bad_layer = WalkInit {
        hops_taken: 1,
        layer: 2,
        trail_id: HashCode::random(),
    };
    deliver(&mut ctx, &a, &RoutingMessage::WalkInit(bad_layer));
    assert!(ctx.trails().is_empty());
    assert_eq!(ctx.stats().protocol_violations, 1);

    // Duplicate trail id
    let init = WalkInit {
        hops_taken: 1,
        layer: 0,
        trail_id: HashCode::random(),
    };
    deliver(&mut ctx, &a, &RoutingMessage::WalkInit(init.clone()));
    deliver(&mut ctx, &a, &RoutingMessage::WalkInit(init));
    assert_eq!(ctx.trails().len(), 1);
    assert_eq!(ctx.stats().protocol_violations, 2);
    assert_eq!(drain(&mut a_rx).len(), 1);
}

// ===== Response Tests =====

#[test]
fn test_response_completes_finger_and_requests_successors() {
    let (mut ctx, _clients) = make_context(4);
    let (a, mut a_rx) = connect(&mut ctx, 1);
    let key = ctx.initiate_random_walk_on_layer(0, 0).unwrap();
    let init = expect_walk_init(recv_one(&mut a_rx));

    let location = make_hash(0x33);
    let response = WalkResponse {
        trail_id: init.trail_id,
        location,
    };
    deliver(&mut ctx, &a, &RoutingMessage::WalkResponse(response));

    let finger = *ctx.finger_table(0).unwrap().get(0).unwrap();
    assert!(finger.valid);
    assert_eq!(finger.destination, location);
    assert_eq!(finger.trail, key);
    assert_eq!(ctx.stats().fingers_completed, 1);

    let route = expect_route(recv_one(&mut a_rx));
    assert_eq!(route.trail_id, init.trail_id);
    match decode_payload(&route) {
        TrailPayload::FindSuccessor(m) => assert_eq!(m.key, location),
        other => panic!("expected FindSuccessor, got {other:?}"),
    }
}

#[test]
fn test_response_unknown_or_wrong_sender() {
    let (mut ctx, _clients) = make_context(4);
    let (a, mut a_rx) = connect(&mut ctx, 1);
    let (b, _b_rx) = connect(&mut ctx, 2);
    ctx.initiate_random_walk_on_layer(0, 0).unwrap();
    let init_peer = if drain(&mut a_rx).is_empty() { b } else { a };
    let other = if init_peer == a { b } else { a };
    let trail_id = ctx.trails().iter().next().unwrap().1.succ_id.unwrap();

    let unknown = WalkResponse {
        trail_id: HashCode::random(),
        location: make_hash(1),
    };
    deliver(&mut ctx, &init_peer, &RoutingMessage::WalkResponse(unknown));
    assert_eq!(ctx.stats().unknown_trails, 1);

    let wrong = WalkResponse {
        trail_id,
        location: make_hash(1),
    };
    deliver(&mut ctx, &other, &RoutingMessage::WalkResponse(wrong));
    assert_eq!(ctx.stats().protocol_violations, 1);
    assert_eq!(ctx.finger_table(0).unwrap().number_valid(), 0);
}

#[test]
fn test_relay_forwards_response() {
    let (mut ctx, _clients) = make_context(4);
    let (a, mut a_rx) = connect(&mut ctx, 1);
    let (key, pred_id, succ_id) = make_relay_trail(&mut ctx, &a, &mut a_rx);

    let response = WalkResponse {
        trail_id: succ_id,
        location: make_hash(0x99),
    };
    deliver(&mut ctx, &a, &RoutingMessage::WalkResponse(response));

    let forwarded = expect_walk_response(recv_one(&mut a_rx));
    assert_eq!(forwarded.trail_id, pred_id);
    assert_eq!(forwarded.location, make_hash(0x99));
    assert!(ctx.trails().contains(key));
    assert_eq!(ctx.stats().walk_responses_forwarded, 1);
}

#[test]
fn test_completed_finger_found_by_get() {
    let mut config = test_config();
    config.dht.request_successors = false;
    let (mut ctx, _clients) = make_context_with(config, 4);
    let (a, mut a_rx) = connect(&mut ctx, 1);
    let (_key, trail_id) = make_finger(&mut ctx, 0, &a, &mut a_rx, make_hash(0x80));

    ctx.handle_get(GetRequest {
        key: make_hash(0x70),
        block_type: BLOCK_TYPE_ANY,
        options: RouteOptions::new(),
        desired_replication_level: 1,
    })
    .unwrap();
    let route = expect_route(recv_one(&mut a_rx));
    assert_eq!(route.trail_id, trail_id);
}
