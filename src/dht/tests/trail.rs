//! Trail teardown and expiration tests.

use super::*;

#[test]
fn test_delete_notifies_each_side_with_its_id() {
    let (mut ctx, _clients) = make_context(4);
    let (a, mut a_rx) = connect(&mut ctx, 1);
    let (key, pred_id, succ_id) = make_relay_trail(&mut ctx, &a, &mut a_rx);

    ctx.delete_trail(key, true, true);
    let ids: Vec<HashCode> = drain(&mut a_rx)
        .into_iter()
        .map(|m| expect_destroy(m).trail_id)
        .collect();
    assert_eq!(ids, vec![pred_id, succ_id]);
    assert!(ctx.trails().is_empty());
    assert_eq!(ctx.trails().id_count(), 0);
    assert_eq!(ctx.peers().get(&a).unwrap().trail_count(), 0);
    assert_eq!(ctx.stats().trail_destroys_sent, 2);
}

#[test]
fn test_destroy_from_predecessor_goes_on_to_successor() {
    let (mut ctx, _clients) = make_context(4);
    let (a, mut a_rx) = connect(&mut ctx, 1);
    let (key, pred_id, succ_id) = make_relay_trail(&mut ctx, &a, &mut a_rx);

    deliver(
        &mut ctx,
        &a,
        &RoutingMessage::TrailDestroy(TrailDestroy { trail_id: pred_id }),
    );
    let destroy = expect_destroy(recv_one(&mut a_rx));
    assert_eq!(destroy.trail_id, succ_id);
    assert!(!ctx.trails().contains(key));
    assert_eq!(ctx.stats().trail_destroys_received, 1);
}

#[test]
fn test_destroy_from_successor_goes_back_to_predecessor() {
    let (mut ctx, _clients) = make_context(4);
    let (a, mut a_rx) = connect(&mut ctx, 1);
    let (_key, pred_id, succ_id) = make_relay_trail(&mut ctx, &a, &mut a_rx);

    deliver(
        &mut ctx,
        &a,
        &RoutingMessage::TrailDestroy(TrailDestroy { trail_id: succ_id }),
    );
    let destroy = expect_destroy(recv_one(&mut a_rx));
    assert_eq!(destroy.trail_id, pred_id);
    assert!(ctx.trails().is_empty());
}

#[test]
fn test_destroy_unknown_and_from_stranger() {
    let (mut ctx, _clients) = make_context(4);
    let (a, mut a_rx) = connect(&mut ctx, 1);
    let (b, mut b_rx) = connect(&mut ctx, 2);
    let key = ctx.initiate_random_walk_on_layer(0, 0).unwrap();
    drain(&mut a_rx);
    drain(&mut b_rx);
    let trail = ctx.trails().get(key).unwrap().clone();
    let stranger = if trail.succ == Some(a) { b } else { a };

    deliver(
        &mut ctx,
        &a,
        &RoutingMessage::TrailDestroy(TrailDestroy {
            trail_id: HashCode::random(),
        }),
    );
    assert_eq!(ctx.stats().unknown_trails, 1);

    deliver(
        &mut ctx,
        &stranger,
        &RoutingMessage::TrailDestroy(TrailDestroy {
            trail_id: trail.succ_id.unwrap(),
        }),
    );
    assert_eq!(ctx.stats().protocol_violations, 1);
    assert!(ctx.trails().contains(key));
}

#[test]
fn test_destroy_from_successor_clears_finger() {
    let (mut ctx, _clients) = make_context(4);
    let (a, mut a_rx) = connect(&mut ctx, 1);
    let (key, trail_id) = make_finger(&mut ctx, 0, &a, &mut a_rx, make_hash(0x42));

    deliver(
        &mut ctx,
        &a,
        &RoutingMessage::TrailDestroy(TrailDestroy { trail_id }),
    );
    assert!(!ctx.trails().contains(key));
    assert!(drain(&mut a_rx).is_empty());
    let table = ctx.finger_table(0).unwrap();
    assert!(table.get(0).is_none());
    assert_eq!(table.number_valid(), 0);
}

// ===== Expiration Tests =====

#[test]
fn test_sweep_expired_trails() {
    let (mut ctx, _clients) = make_context(4);
    let (a, mut a_rx) = connect(&mut ctx, 1);
    let (key, pred_id, succ_id) = make_relay_trail(&mut ctx, &a, &mut a_rx);
    assert_eq!(ctx.next_deadline(), Some(0)); // first walk due at connect time

    // Not yet expired
    assert_eq!(ctx.sweep_expired_trails(59_999), 0);
    assert!(ctx.trails().contains(key));

    assert_eq!(ctx.sweep_expired_trails(60_000), 1);
    assert!(ctx.trails().is_empty());
    let ids: Vec<HashCode> = drain(&mut a_rx)
        .into_iter()
        .map(|m| expect_destroy(m).trail_id)
        .collect();
    assert_eq!(ids, vec![pred_id, succ_id]);
    assert_eq!(ctx.stats().trails_expired, 1);
}

#[test]
fn test_expired_finger_is_cleared() {
    let (mut ctx, _clients) = make_context(4);
    let (a, mut a_rx) = connect(&mut ctx, 1);
    let (_key, trail_id) = make_finger(&mut ctx, 0, &a, &mut a_rx, make_hash(0x42));

    ctx.sweep_expired_trails(60_000);
    assert_eq!(ctx.finger_table(0).unwrap().number_valid(), 0);
    assert_eq!(expect_destroy(recv_one(&mut a_rx)).trail_id, trail_id);
    assert_eq!(ctx.stats().invariant_violations, 0);
}

#[test]
fn test_next_deadline_tracks_earliest_timer() {
    let (mut ctx, _clients) = make_context(4);
    assert_eq!(ctx.next_deadline(), None);

    let (_a, mut a_rx) = connect(&mut ctx, 1);
    assert_eq!(ctx.next_deadline(), Some(0));
    ctx.poll_timers(0);
    expect_walk_init(recv_one(&mut a_rx));
    // Next walk at the bootstrap interval, well before the trail expires
    assert_eq!(ctx.random_walk_due(), Some(100));
    assert_eq!(ctx.next_deadline(), Some(100));

    let mut config = test_config();
    config.dht.bootstrap_walk_interval_ms = 120_000;
    let (mut ctx, _clients) = make_context_with(config, 4);
    let (_a, _a_rx) = connect(&mut ctx, 1);
    ctx.poll_timers(0);
    assert_eq!(ctx.next_deadline(), Some(60_000));
}
