//! Routing event loop.

use crate::dht::{EventRx, RoutingContext};
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

/// Sleep until `deadline`, or forever if there is none.
async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

impl RoutingContext {
    /// Run the routing loop.
    ///
    /// Serialises inbound events with the trail-expiration and random-walk
    /// timers. Both timers are single deadlines recomputed after every
    /// event. The loop ends on `Shutdown` or when every event sender is
    /// dropped, and tears down all trails and friends on the way out.
    pub async fn run(&mut self, mut events: EventRx) {
        info!(peer = %self.my_id, "Routing loop started");

        loop {
            let deadline = self
                .next_deadline()
                .map(|ms| self.epoch + Duration::from_millis(ms));

            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else {
                        break; // channel closed
                    };
                    let now_ms = self.now_ms();
                    if !self.handle_event(event, now_ms) {
                        break;
                    }
                }
                _ = sleep_until_opt(deadline) => {
                    let now_ms = self.now_ms();
                    self.poll_timers(now_ms);
                }
            }
        }

        self.shutdown();
        info!(peer = %self.my_id, "Routing loop stopped");
    }

    /// Delete every trail, notifying neighbors, and drop all friends.
    pub fn shutdown(&mut self) {
        let trails = self.trails.keys();
        let count = trails.len();
        for key in trails {
            if self.trails.contains(key) {
                self.delete_trail(key, true, true);
            }
        }
        let friends: Vec<_> = self.peers.ids().copied().collect();
        for peer in &friends {
            self.peers.remove(peer);
            self.release_short_id(peer);
        }
        self.random_walk_due_ms = None;
        info!(trails = count, friends = friends.len(), "Routing state torn down");
    }
}
