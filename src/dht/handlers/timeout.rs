//! Trail expiration and random-walk scheduling.

use crate::dht::RoutingContext;
use tracing::debug;

impl RoutingContext {
    /// Delete every trail whose expiration is at or before `now_ms`.
    ///
    /// Both neighbors of an expired trail are notified. Returns the number
    /// of trails removed.
    pub fn sweep_expired_trails(&mut self, now_ms: u64) -> usize {
        let mut expired = 0;
        while let Some(key) = self.trails.first_expired(now_ms) {
            self.delete_trail(key, true, true);
            self.stats.trails_expired += 1;
            expired += 1;
        }
        if expired > 0 {
            debug!(expired, remaining = self.trails.len(), "Expired trails swept");
        }
        expired
    }

    /// Run whatever timers are due at `now_ms`.
    pub fn poll_timers(&mut self, now_ms: u64) {
        self.sweep_expired_trails(now_ms);
        if let Some(due) = self.random_walk_due_ms
            && due <= now_ms
        {
            // Failures are logged and leave the engine idle or rescheduled
            let _ = self.do_random_walk(now_ms);
        }
    }
}
