//! Event loop tests on a paused clock.

use super::*;
use crate::protocol::RouteOptions;
use tokio::task::JoinHandle;

fn spawn_loop(mut ctx: RoutingContext) -> (EventTx, JoinHandle<RoutingContext>) {
    let (tx, rx) = event_channel(16);
    let handle = tokio::spawn(async move {
        ctx.run(rx).await;
        ctx
    });
    (tx, handle)
}

async fn next_message(rx: &mut PeerRx) -> RoutingMessage {
    let frame = rx.recv().await.expect("friend channel open");
    RoutingMessage::decode(&frame).expect("well-formed frame")
}

#[tokio::test(start_paused = true)]
async fn test_loop_walks_then_shuts_down() {
    let (ctx, _clients) = make_context(4);
    let (events, handle) = spawn_loop(ctx);
    let (tx, mut rx) = peer_channel(64);
    events
        .send(RoutingEvent::PeerConnected {
            peer: make_peer_id(1),
            tx,
        })
        .await
        .unwrap();

    // First walk leaves at once, the second after the bootstrap interval
    assert_eq!(expect_walk_init(next_message(&mut rx).await).layer, 0);
    assert_eq!(expect_walk_init(next_message(&mut rx).await).layer, 1);

    events.send(RoutingEvent::Shutdown).await.unwrap();
    let ctx = handle.await.unwrap();
    assert!(ctx.trails().is_empty());
    assert!(ctx.peers().is_empty());
    assert_eq!(ctx.random_walk_due(), None);
    assert_eq!(ctx.stats().walks_initiated, 2);

    // Both walk trails were torn down toward the friend
    let destroyed = drain(&mut rx).into_iter().map(expect_destroy).count();
    assert_eq!(destroyed, 2);
}

#[tokio::test(start_paused = true)]
async fn test_loop_expires_unanswered_walk() {
    let mut config = test_config();
    config.dht.trail_timeout_secs = 1;
    config.dht.initial_random_walks = 0;
    config.dht.random_walk_delay_secs = 3600;
    let (ctx, _clients) = make_context_with(config, 4);
    let (events, handle) = spawn_loop(ctx);
    let (tx, mut rx) = peer_channel(64);
    events
        .send(RoutingEvent::PeerConnected {
            peer: make_peer_id(1),
            tx,
        })
        .await
        .unwrap();

    let init = expect_walk_init(next_message(&mut rx).await);
    let destroy = expect_destroy(next_message(&mut rx).await);
    assert_eq!(destroy.trail_id, init.trail_id);

    // Dropping the last sender ends the loop
    drop(events);
    let ctx = handle.await.unwrap();
    assert_eq!(ctx.stats().trails_expired, 1);
    assert_eq!(ctx.finger_table(0).unwrap().number_valid(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_loop_serves_client_requests() {
    let (ctx, mut clients) = make_context(4);
    let (events, handle) = spawn_loop(ctx);
    let key = make_hash(0x31);

    events
        .send(RoutingEvent::Put(PutRequest {
            key,
            block_type: 1,
            options: RouteOptions::new(),
            desired_replication_level: 1,
            expiration_us: u64::MAX,
            data: vec![9, 9],
        }))
        .await
        .unwrap();
    events
        .send(RoutingEvent::Get(GetRequest {
            key,
            block_type: 1,
            options: RouteOptions::new(),
            desired_replication_level: 1,
        }))
        .await
        .unwrap();

    match clients.recv().await {
        Some(ClientEvent::Reply(reply)) => {
            assert_eq!(reply.key, key);
            assert_eq!(reply.data, vec![9, 9]);
        }
        other => panic!("expected reply, got {other:?}"),
    }

    events.send(RoutingEvent::Shutdown).await.unwrap();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_loop_handles_friend_messages() {
    let (ctx, _clients) = make_context(0);
    let (events, handle) = spawn_loop(ctx);
    let peer = make_peer_id(1);
    let (tx, mut rx) = peer_channel(64);
    events
        .send(RoutingEvent::PeerConnected { peer, tx })
        .await
        .unwrap();
    // Our own walk toward the friend
    expect_walk_init(next_message(&mut rx).await);

    let trail_id = HashCode::random();
    let walk = WalkInit {
        hops_taken: 1,
        layer: 0,
        trail_id,
    };
    events
        .send(RoutingEvent::Message {
            from: peer,
            data: RoutingMessage::WalkInit(walk).encode(),
        })
        .await
        .unwrap();
    let response = expect_walk_response(next_message(&mut rx).await);
    assert_eq!(response.trail_id, trail_id);

    events
        .send(RoutingEvent::PeerDisconnected { peer })
        .await
        .unwrap();
    events.send(RoutingEvent::Shutdown).await.unwrap();
    let ctx = handle.await.unwrap();
    assert!(ctx.trails().is_empty());
    assert_eq!(ctx.stats().walks_answered, 1);
}
