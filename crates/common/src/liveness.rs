//! Heartbeat-based liveness classification for the health endpoint.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Below this age the last heartbeat counts as healthy.
const HEALTHY_WITHIN: Duration = Duration::from_secs(30);
/// Below this age (and at or above [`HEALTHY_WITHIN`]) the process is dying.
const DYING_WITHIN: Duration = Duration::from_secs(60);
/// Checks answered `healthy` before the first heartbeat arrives.
const STARTUP_GRACE_CHECKS: u32 = 3;

/// Reported process health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    Healthy,
    Dying,
    Dead,
}

impl Health {
    /// Whether the health endpoint should answer with a success status.
    #[must_use]
    pub const fn is_alive(self) -> bool {
        !matches!(self, Self::Dead)
    }
}

/// Tracks the last heartbeat and classifies process health.
///
/// Timestamps are stored as milliseconds since the monitor was created, plus
/// one, so that zero means "never beaten".
#[derive(Debug)]
pub struct LivenessMonitor {
    started: Instant,
    last_beat: AtomicU64,
    checks_without_beat: AtomicU32,
}

impl Default for LivenessMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl LivenessMonitor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            last_beat: AtomicU64::new(0),
            checks_without_beat: AtomicU32::new(0),
        }
    }

    /// Record "now" as the last moment the process was active.
    pub fn beat(&self) {
        self.beat_at(self.started.elapsed());
    }

    /// Classify health against the current time.
    pub fn check(&self) -> Health {
        self.check_at(self.started.elapsed())
    }

    /// Record a heartbeat at `elapsed` after the monitor was created.
    pub fn beat_at(&self, elapsed: Duration) {
        let stamp = elapsed.as_millis() as u64 + 1;
        self.last_beat.fetch_max(stamp, Ordering::Relaxed);
    }

    /// Classify health as of `elapsed` after the monitor was created.
    pub fn check_at(&self, elapsed: Duration) -> Health {
        let stamp = self.last_beat.load(Ordering::Relaxed);
        if stamp == 0 {
            let seen = self.checks_without_beat.fetch_add(1, Ordering::Relaxed);
            return if seen < STARTUP_GRACE_CHECKS {
                Health::Healthy
            } else {
                Health::Dead
            };
        }

        let last = Duration::from_millis(stamp - 1);
        let age = elapsed.saturating_sub(last);
        if age < HEALTHY_WITHIN {
            Health::Healthy
        } else if age <= DYING_WITHIN {
            Health::Dying
        } else {
            Health::Dead
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grace_period_before_first_beat() {
        let monitor = LivenessMonitor::new();
        assert_eq!(monitor.check_at(Duration::ZERO), Health::Healthy);
        assert_eq!(monitor.check_at(Duration::ZERO), Health::Healthy);
        assert_eq!(monitor.check_at(Duration::ZERO), Health::Healthy);
        assert_eq!(monitor.check_at(Duration::ZERO), Health::Dead);
    }

    #[test]
    fn test_beat_then_check_is_healthy() {
        let monitor = LivenessMonitor::new();
        monitor.beat();
        assert_eq!(monitor.check(), Health::Healthy);
    }

    #[test]
    fn test_age_boundaries() {
        let monitor = LivenessMonitor::new();
        monitor.beat_at(Duration::from_secs(10));

        assert_eq!(monitor.check_at(Duration::from_secs(39)), Health::Healthy);
        assert_eq!(monitor.check_at(Duration::from_secs(40)), Health::Dying);
        assert_eq!(monitor.check_at(Duration::from_secs(70)), Health::Dying);
        assert_eq!(monitor.check_at(Duration::from_secs(71)), Health::Dead);
    }

    #[test]
    fn test_dead_after_61_seconds_without_beat() {
        let monitor = LivenessMonitor::new();
        monitor.beat_at(Duration::ZERO);
        assert_eq!(monitor.check_at(Duration::from_secs(61)), Health::Dead);
    }

    #[test]
    fn test_late_beat_revives() {
        let monitor = LivenessMonitor::new();
        monitor.beat_at(Duration::ZERO);
        assert_eq!(monitor.check_at(Duration::from_secs(90)), Health::Dead);

        monitor.beat_at(Duration::from_secs(90));
        assert_eq!(monitor.check_at(Duration::from_secs(91)), Health::Healthy);
    }

    #[test]
    fn test_out_of_order_beats_keep_latest() {
        let monitor = LivenessMonitor::new();
        monitor.beat_at(Duration::from_secs(50));
        monitor.beat_at(Duration::from_secs(5));
        assert_eq!(monitor.check_at(Duration::from_secs(60)), Health::Healthy);
    }

    #[test]
    fn test_health_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Health::Dying).ok().as_deref(), Some("\"dying\""));
        assert!(Health::Dying.is_alive());
        assert!(!Health::Dead.is_alive());
    }
}
