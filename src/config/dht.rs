//! Routing configuration subsections.
//!
//! The `dht.*` parameters governing random walks, trail lifetimes and finger
//! tables, plus the `buffers.*` channel capacities.

use serde::{Deserialize, Serialize};

// ============================================================================
// DHT Configuration
// ============================================================================

/// Trail and finger-table routing (`dht.*`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DhtConfig {
    /// Number of random-walk layers (`dht.layers`).
    #[serde(default = "DhtConfig::default_layers")]
    pub layers: u16,
    /// Target finger slots per layer (`dht.finger_array_size`).
    #[serde(default = "DhtConfig::default_finger_array_size")]
    pub finger_array_size: usize,
    /// Lifetime of a trail in seconds (`dht.trail_timeout_secs`).
    #[serde(default = "DhtConfig::default_trail_timeout_secs")]
    pub trail_timeout_secs: u64,
    /// Delay between steady-state random walks in seconds (`dht.random_walk_delay_secs`).
    #[serde(default = "DhtConfig::default_random_walk_delay_secs")]
    pub random_walk_delay_secs: u64,
    /// Walks launched at the bootstrap interval after start (`dht.initial_random_walks`).
    #[serde(default = "DhtConfig::default_initial_random_walks")]
    pub initial_random_walks: u32,
    /// Spacing of bootstrap walks in ms (`dht.bootstrap_walk_interval_ms`).
    #[serde(default = "DhtConfig::default_bootstrap_walk_interval_ms")]
    pub bootstrap_walk_interval_ms: u64,
    /// Largest message handed to a peer channel (`dht.max_message_size`).
    #[serde(default = "DhtConfig::default_max_message_size")]
    pub max_message_size: usize,
    /// Entries returned for a successor-find request (`dht.successor_results`).
    #[serde(default = "DhtConfig::default_successor_results")]
    pub successor_results: usize,
    /// Send a successor-find along each newly completed finger (`dht.request_successors`).
    #[serde(default = "DhtConfig::default_request_successors")]
    pub request_successors: bool,
    /// Block capacity of the in-memory datacache (`dht.datacache_capacity`).
    #[serde(default = "DhtConfig::default_datacache_capacity")]
    pub datacache_capacity: usize,
}

impl Default for DhtConfig {
    fn default() -> Self {
        Self {
            layers: 8,
            finger_array_size: 64,
            trail_timeout_secs: 42 * 60,
            random_walk_delay_secs: 42 * 60,
            initial_random_walks: 20,
            bootstrap_walk_interval_ms: 500,
            max_message_size: 65535,
            successor_results: 8,
            request_successors: true,
            datacache_capacity: 1024,
        }
    }
}

impl DhtConfig {
    fn default_layers() -> u16 { 8 }
    fn default_finger_array_size() -> usize { 64 }
    fn default_trail_timeout_secs() -> u64 { 42 * 60 }
    fn default_random_walk_delay_secs() -> u64 { 42 * 60 }
    fn default_initial_random_walks() -> u32 { 20 }
    fn default_bootstrap_walk_interval_ms() -> u64 { 500 }
    fn default_max_message_size() -> usize { 65535 }
    fn default_successor_results() -> usize { 8 }
    fn default_request_successors() -> bool { true }
    fn default_datacache_capacity() -> usize { 1024 }

    /// Trail lifetime in milliseconds.
    pub fn trail_timeout_ms(&self) -> u64 {
        self.trail_timeout_secs.saturating_mul(1000)
    }

    /// Delay before the next walk, given how many were already launched.
    pub fn walk_delay_ms(&self, walks_initiated: u64) -> u64 {
        if walks_initiated < self.initial_random_walks as u64 {
            self.bootstrap_walk_interval_ms
        } else {
            self.random_walk_delay_secs.saturating_mul(1000)
        }
    }

    /// Override every field of `self` that `other` sets to a non-default value.
    pub fn merge(&mut self, other: DhtConfig) {
        let defaults = DhtConfig::default();
        if other.layers != defaults.layers {
            self.layers = other.layers;
        }
        if other.finger_array_size != defaults.finger_array_size {
            self.finger_array_size = other.finger_array_size;
        }
        if other.trail_timeout_secs != defaults.trail_timeout_secs {
            self.trail_timeout_secs = other.trail_timeout_secs;
        }
        if other.random_walk_delay_secs != defaults.random_walk_delay_secs {
            self.random_walk_delay_secs = other.random_walk_delay_secs;
        }
        if other.initial_random_walks != defaults.initial_random_walks {
            self.initial_random_walks = other.initial_random_walks;
        }
        if other.bootstrap_walk_interval_ms != defaults.bootstrap_walk_interval_ms {
            self.bootstrap_walk_interval_ms = other.bootstrap_walk_interval_ms;
        }
        if other.max_message_size != defaults.max_message_size {
            self.max_message_size = other.max_message_size;
        }
        if other.successor_results != defaults.successor_results {
            self.successor_results = other.successor_results;
        }
        if other.request_successors != defaults.request_successors {
            self.request_successors = other.request_successors;
        }
        if other.datacache_capacity != defaults.datacache_capacity {
            self.datacache_capacity = other.datacache_capacity;
        }
    }
}

// ============================================================================
// Buffers
// ============================================================================

/// Internal channel capacities (`buffers.*`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuffersConfig {
    /// Inbound routing event channel (`buffers.event_channel`).
    #[serde(default = "BuffersConfig::default_event_channel")]
    pub event_channel: usize,
    /// Per-peer outbound message channel (`buffers.peer_channel`).
    #[serde(default = "BuffersConfig::default_peer_channel")]
    pub peer_channel: usize,
}

impl Default for BuffersConfig {
    fn default() -> Self {
        Self {
            event_channel: 1024,
            peer_channel: 256,
        }
    }
}

impl BuffersConfig {
    fn default_event_channel() -> usize { 1024 }
    fn default_peer_channel() -> usize { 256 }

    /// Override every field of `self` that `other` sets to a non-default value.
    pub fn merge(&mut self, other: BuffersConfig) {
        let defaults = BuffersConfig::default();
        if other.event_channel != defaults.event_channel {
            self.event_channel = other.event_channel;
        }
        if other.peer_channel != defaults.peer_channel {
            self.peer_channel = other.peer_channel;
        }
    }
}
