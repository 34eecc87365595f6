//! Collaborators consumed by the routing core.
//!
//! The routing core needs a network-size estimate to bound random walks, a
//! datacache to answer lookups and supply random keys, and a way to hand
//! results to local clients. Each is a trait so the embedding service can
//! supply its own; simple in-memory implementations are provided.

use crate::{HashCode, PeerId};
use rand::seq::IteratorRandom;
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tracing::debug;

/// Block type matching every stored block in a lookup.
pub const BLOCK_TYPE_ANY: u32 = 0;

/// Wall-clock time in microseconds since the Unix epoch.
pub fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

/// A stored value with its metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataBlock {
    pub block_type: u32,
    /// Absolute expiration in microseconds.
    pub expiration_us: u64,
    /// Peers the value traversed when it was stored.
    pub put_path: Vec<PeerId>,
    pub data: Vec<u8>,
}

/// A lookup result delivered to local clients.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GetReply {
    pub key: HashCode,
    pub block_type: u32,
    pub expiration_us: u64,
    pub put_path: Vec<PeerId>,
    /// Peers the reply traversed on the way back.
    pub get_path: Vec<PeerId>,
    pub data: Vec<u8>,
}

/// A store request observed by this peer, reported to local monitors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PutNotice {
    pub key: HashCode,
    pub block_type: u32,
    pub expiration_us: u64,
    pub hop_count: u32,
    pub desired_replication_level: u32,
    pub put_path: Vec<PeerId>,
    pub data: Vec<u8>,
}

/// Source of the network size estimate used as the random-walk hop bound.
pub trait NetworkSizeEstimator: Send {
    fn estimate(&self) -> u32;
}

/// Local block storage.
pub trait Datacache: Send {
    /// Store a block under `key`.
    fn put(&mut self, key: HashCode, block: DataBlock);

    /// Unexpired blocks stored under `key` of `block_type`
    /// ([`BLOCK_TYPE_ANY`] matches all).
    fn get(&self, key: &HashCode, block_type: u32) -> Vec<DataBlock>;

    /// A key chosen at random among keys holding unexpired blocks.
    fn random_key(&self) -> Option<HashCode>;

    /// Up to `count` unexpired entries whose keys follow `key` on the ring,
    /// nearest first.
    fn closest(&self, key: &HashCode, count: usize) -> Vec<(HashCode, DataBlock)>;
}

/// Delivery of results to local client applications.
pub trait ClientNotifier: Send {
    fn handle_reply(&mut self, reply: &GetReply);
    fn process_put(&mut self, put: &PutNotice);
}

// ============================================================================
// Network Size
// ============================================================================

/// A constant network size estimate.
#[derive(Clone, Copy, Debug)]
pub struct FixedSizeEstimate(pub u32);

impl NetworkSizeEstimator for FixedSizeEstimate {
    fn estimate(&self) -> u32 {
        self.0
    }
}

// ============================================================================
// In-Memory Datacache
// ============================================================================

/// Bounded in-memory datacache.
///
/// Expiration is checked against the wall clock: expired blocks are never
/// returned, and are purged before anything else is evicted. When still
/// full, the block expiring soonest is dropped to make room.
#[derive(Debug)]
pub struct MemoryDatacache {
    blocks: BTreeMap<HashCode, Vec<DataBlock>>,
    capacity: usize,
    count: usize,
}

impl MemoryDatacache {
    pub fn new(capacity: usize) -> Self {
        Self {
            blocks: BTreeMap::new(),
            capacity: capacity.max(1),
            count: 0,
        }
    }

    /// Number of stored blocks, expired ones not yet purged included.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Drop every block that expired at or before `now_us`.
    pub fn purge_expired(&mut self, now_us: u64) -> usize {
        let before = self.count;
        self.blocks.retain(|_, blocks| {
            blocks.retain(|b| b.expiration_us > now_us);
            !blocks.is_empty()
        });
        self.count = self.blocks.values().map(Vec::len).sum();
        before - self.count
    }

    fn evict_soonest(&mut self) {
        let victim = self
            .blocks
            .iter()
            .flat_map(|(k, blocks)| {
                blocks
                    .iter()
                    .enumerate()
                    .map(move |(i, b)| (b.expiration_us, *k, i))
            })
            .min();
        if let Some((_, key, index)) = victim
            && let Some(blocks) = self.blocks.get_mut(&key)
        {
            blocks.remove(index);
            if blocks.is_empty() {
                self.blocks.remove(&key);
            }
            self.count -= 1;
            debug!(key = %key, "Datacache full, evicted block");
        }
    }
}

impl Datacache for MemoryDatacache {
    fn put(&mut self, key: HashCode, block: DataBlock) {
        if let Some(existing) = self.blocks.get_mut(&key)
            && let Some(same) = existing
                .iter_mut()
                .find(|b| b.block_type == block.block_type && b.data == block.data)
        {
            // Re-put of identical content only refreshes the expiration
            same.expiration_us = same.expiration_us.max(block.expiration_us);
            return;
        }
        if self.count >= self.capacity && self.purge_expired(now_us()) == 0 {
            self.evict_soonest();
        }
        self.blocks.entry(key).or_default().push(block);
        self.count += 1;
    }

    fn get(&self, key: &HashCode, block_type: u32) -> Vec<DataBlock> {
        let now = now_us();
        self.blocks
            .get(key)
            .map(|blocks| {
                blocks
                    .iter()
                    .filter(|b| b.expiration_us > now)
                    .filter(|b| block_type == BLOCK_TYPE_ANY || b.block_type == block_type)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn random_key(&self) -> Option<HashCode> {
        let now = now_us();
        self.blocks
            .iter()
            .filter(|(_, blocks)| blocks.iter().any(|b| b.expiration_us > now))
            .map(|(k, _)| *k)
            .choose(&mut rand::rng())
    }

    fn closest(&self, key: &HashCode, count: usize) -> Vec<(HashCode, DataBlock)> {
        let now = now_us();
        self.blocks
            .range(*key..)
            .chain(self.blocks.range(..*key))
            .flat_map(|(k, blocks)| blocks.iter().map(move |b| (*k, b)))
            .filter(|(_, b)| b.expiration_us > now)
            .map(|(k, b)| (k, b.clone()))
            .take(count)
            .collect()
    }
}

// ============================================================================
// Client Notification
// ============================================================================

/// Event handed to local clients.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientEvent {
    Reply(GetReply),
    Put(PutNotice),
}

/// Sender half of the client event channel.
pub type ClientTx = mpsc::Sender<ClientEvent>;
/// Receiver half of the client event channel.
pub type ClientRx = mpsc::Receiver<ClientEvent>;

/// Create a client event channel.
pub fn client_channel(buffer: usize) -> (ClientTx, ClientRx) {
    mpsc::channel(buffer)
}

/// Forwards client events into a bounded channel, dropping when full.
#[derive(Debug)]
pub struct ChannelNotifier {
    tx: ClientTx,
}

impl ChannelNotifier {
    pub fn new(tx: ClientTx) -> Self {
        Self { tx }
    }

    fn deliver(&self, event: ClientEvent) {
        if let Err(e) = self.tx.try_send(event) {
            debug!(error = %e, "Client event dropped");
        }
    }
}

impl ClientNotifier for ChannelNotifier {
    fn handle_reply(&mut self, reply: &GetReply) {
        self.deliver(ClientEvent::Reply(reply.clone()));
    }

    fn process_put(&mut self, put: &PutNotice) {
        self.deliver(ClientEvent::Put(put.clone()));
    }
}
