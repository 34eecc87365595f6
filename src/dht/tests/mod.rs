use super::*;
use crate::datacache::{client_channel, ClientEvent, ClientRx};
use crate::peer::{peer_channel, PeerRx};
use crate::protocol::{
    RoutingMessage, TrailDestroy, TrailPayload, TrailRoute, WalkInit, WalkResponse,
};

mod rx_loop;
mod trail;
mod walk;

/// Small tables and short timers.
pub(super) fn test_config() -> Config {
    let mut config = Config::new();
    config.dht.layers = 2;
    config.dht.finger_array_size = 4;
    config.dht.trail_timeout_secs = 60;
    config.dht.random_walk_delay_secs = 10;
    config.dht.initial_random_walks = 2;
    config.dht.bootstrap_walk_interval_ms = 100;
    config
}

pub(super) fn make_context_with(config: Config, estimate: u32) -> (RoutingContext, ClientRx) {
    let (client_tx, client_rx) = client_channel(64);
    let collaborators = Collaborators::in_memory(estimate, 64, client_tx);
    let ctx = RoutingContext::new(Identity::generate(), config, collaborators);
    (ctx, client_rx)
}

pub(super) fn make_context(estimate: u32) -> (RoutingContext, ClientRx) {
    make_context_with(test_config(), estimate)
}

pub(super) fn make_peer_id(val: u8) -> PeerId {
    let mut bytes = [0u8; 32];
    bytes[0] = val;
    PeerId::from_bytes(bytes)
}

pub(super) fn make_hash(val: u8) -> HashCode {
    let mut bytes = [0u8; 32];
    bytes[0] = val;
    HashCode::from_bytes(bytes)
}

/// Connect a friend with id `val` and return the receiving end of its channel.
pub(super) fn connect(ctx: &mut RoutingContext, val: u8) -> (PeerId, PeerRx) {
    let peer = make_peer_id(val);
    let (tx, rx) = peer_channel(64);
    assert!(ctx.peer_connected(peer, tx, 0));
    (peer, rx)
}

/// Drain and decode every frame queued for a friend.
pub(super) fn drain(rx: &mut PeerRx) -> Vec<RoutingMessage> {
    let mut out = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        out.push(RoutingMessage::decode(&frame).expect("well-formed frame"));
    }
    out
}

/// Drain a friend's channel expecting exactly one message.
pub(super) fn recv_one(rx: &mut PeerRx) -> RoutingMessage {
    let mut msgs = drain(rx);
    assert_eq!(msgs.len(), 1, "expected one message, got {msgs:?}");
    msgs.remove(0)
}

pub(super) fn expect_walk_init(msg: RoutingMessage) -> WalkInit {
    match msg {
        RoutingMessage::WalkInit(m) => m,
        other => panic!("expected WalkInit, got {other:?}"),
    }
}

pub(super) fn expect_walk_response(msg: RoutingMessage) -> WalkResponse {
    match msg {
        RoutingMessage::WalkResponse(m) => m,
        other => panic!("expected WalkResponse, got {other:?}"),
    }
}

pub(super) fn expect_destroy(msg: RoutingMessage) -> TrailDestroy {
    match msg {
        RoutingMessage::TrailDestroy(m) => m,
        other => panic!("expected TrailDestroy, got {other:?}"),
    }
}

pub(super) fn expect_route(msg: RoutingMessage) -> TrailRoute {
    match msg {
        RoutingMessage::TrailRoute(m) => m,
        other => panic!("expected TrailRoute, got {other:?}"),
    }
}

/// Deliver a message to `ctx` as if sent by `from`.
pub(super) fn deliver(ctx: &mut RoutingContext, from: &PeerId, msg: &RoutingMessage) {
    ctx.handle_message(from, &msg.encode(), 0);
}

/// Make this peer a relay: a WalkInit from `pred` extended to the only
/// other friend. Returns (trail key, id from pred, id toward succ).
pub(super) fn make_relay_trail(
    ctx: &mut RoutingContext,
    pred: &PeerId,
    succ_rx: &mut PeerRx,
) -> (crate::trail::TrailKey, HashCode, HashCode) {
    let pred_id = HashCode::random();
    let init = WalkInit {
        hops_taken: 0,
        layer: 0,
        trail_id: pred_id,
    };
    deliver(ctx, pred, &RoutingMessage::WalkInit(init));
    let next = expect_walk_init(recv_one(succ_rx));
    let key = ctx.trails().lookup(&pred_id).unwrap();
    (key, pred_id, next.trail_id)
}

/// Start a walk on `layer` toward the only friend and complete it with
/// `destination`. Returns the backing trail key and its id.
pub(super) fn make_finger(
    ctx: &mut RoutingContext,
    layer: u16,
    friend: &PeerId,
    friend_rx: &mut PeerRx,
    destination: HashCode,
) -> (crate::trail::TrailKey, HashCode) {
    let key = ctx.initiate_random_walk_on_layer(layer, 0).unwrap();
    // An eviction may have queued a TrailDestroy ahead of the walk
    let init = drain(friend_rx)
        .into_iter()
        .find_map(|m| match m {
            RoutingMessage::WalkInit(init) => Some(init),
            _ => None,
        })
        .expect("walk sent");
    let response = WalkResponse {
        trail_id: init.trail_id,
        location: destination,
    };
    deliver(ctx, friend, &RoutingMessage::WalkResponse(response));
    // Discard the successor-find that follows completion
    drain(friend_rx);
    (key, init.trail_id)
}

pub(super) fn client_events(rx: &mut ClientRx) -> Vec<ClientEvent> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}

pub(super) fn decode_payload(route: &TrailRoute) -> TrailPayload {
    TrailPayload::decode(&route.payload).expect("well-formed payload")
}
