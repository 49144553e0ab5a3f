//! Idle detection for the trade stream.
//!
//! The upstream feed pushes trades continuously; if nothing (data, ping or
//! control frame) arrives within the idle timeout the connection is assumed
//! dead.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Tracks message activity on the current connection.
pub struct IdleMonitor {
    /// Maximum silence before the connection is considered dead.
    timeout: Duration,
    /// Monotonic time of the last received frame.
    last_activity: RwLock<Instant>,
    /// Wall-clock time of the last received frame (for health reporting).
    last_message_at: RwLock<Option<DateTime<Utc>>>,
    /// Frames received on the current connection.
    frames: RwLock<u64>,
}

impl IdleMonitor {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            timeout: Duration::from_millis(timeout_ms),
            last_activity: RwLock::new(Instant::now()),
            last_message_at: RwLock::new(None),
            frames: RwLock::new(0),
        }
    }

    /// Reset activity tracking (called when a connection is established).
    pub fn reset(&self) {
        *self.last_activity.write() = Instant::now();
        *self.frames.write() = 0;
        debug!(timeout_ms = self.timeout.as_millis() as u64, "Idle monitor reset");
    }

    /// Record that a frame was received.
    pub fn record_activity(&self) {
        *self.last_activity.write() = Instant::now();
        *self.last_message_at.write() = Some(Utc::now());
        *self.frames.write() += 1;
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Time since the last received frame.
    pub fn idle_for(&self) -> Duration {
        self.last_activity.read().elapsed()
    }

    /// Time left before the idle timeout fires.
    pub fn remaining(&self) -> Duration {
        self.timeout.saturating_sub(self.idle_for())
    }

    pub fn is_timed_out(&self) -> bool {
        self.idle_for() >= self.timeout
    }

    pub fn stats(&self) -> IdleStats {
        IdleStats {
            last_message_at: *self.last_message_at.read(),
            idle_ms: self.idle_for().as_millis() as u64,
            frames: *self.frames.read(),
        }
    }
}

/// Idle statistics.
#[derive(Debug, Clone)]
pub struct IdleStats {
    pub last_message_at: Option<DateTime<Utc>>,
    pub idle_ms: u64,
    pub frames: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_idle_timeout_elapses() {
        let idle = IdleMonitor::new(1_000);
        assert!(!idle.is_timed_out());

        tokio::time::advance(Duration::from_millis(600)).await;
        assert!(!idle.is_timed_out());
        assert_eq!(idle.remaining(), Duration::from_millis(400));

        tokio::time::advance(Duration::from_millis(400)).await;
        assert!(idle.is_timed_out());
        assert_eq!(idle.remaining(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_resets_timer() {
        let idle = IdleMonitor::new(1_000);
        tokio::time::advance(Duration::from_millis(900)).await;
        idle.record_activity();
        tokio::time::advance(Duration::from_millis(900)).await;
        assert!(!idle.is_timed_out());

        let stats = idle.stats();
        assert_eq!(stats.frames, 1);
        assert!(stats.last_message_at.is_some());
    }
}
