// src/agent/timers.rs
//! Per-action due-timers
//!
//! Each agent action (post, like, reply) counts down on its own timer.
//! Firing one timer never resets another, and last-fire times only ever
//! move forward. A timer that has never fired is immediately due, so a
//! freshly started agent attempts its first post right away.

use std::time::{Duration, Instant};

/// Countdown timer for a single agent action
#[derive(Debug, Clone)]
pub struct ActionTimer {
    interval: Duration,
    last_fired: Option<Instant>,
}

impl ActionTimer {
    /// Create a timer that is due immediately.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_fired: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether the action should fire at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_fired {
            None => true,
            Some(last) => now.duration_since(last) >= self.interval,
        }
    }

    /// Record a successful fire. Last-fire times are monotonically
    /// non-decreasing; an older instant never rewinds the timer.
    pub fn mark_fired(&mut self, now: Instant) {
        match self.last_fired {
            Some(last) if now < last => {}
            _ => self.last_fired = Some(now),
        }
    }

    pub fn last_fired(&self) -> Option<Instant> {
        self.last_fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_timer_is_due() {
        let timer = ActionTimer::new(Duration::from_secs(60));
        assert!(timer.is_due(Instant::now()));
    }

    #[test]
    fn test_not_due_within_interval() {
        let mut timer = ActionTimer::new(Duration::from_secs(60));
        let t0 = Instant::now();

        timer.mark_fired(t0);
        assert!(!timer.is_due(t0 + Duration::from_secs(59)));
        assert!(timer.is_due(t0 + Duration::from_secs(60)));
    }

    #[test]
    fn test_mark_fired_is_monotonic() {
        let mut timer = ActionTimer::new(Duration::from_secs(10));
        let t0 = Instant::now();
        let later = t0 + Duration::from_secs(5);

        timer.mark_fired(later);
        timer.mark_fired(t0);
        assert_eq!(timer.last_fired(), Some(later));
    }

    #[test]
    fn test_timers_are_independent() {
        let mut post = ActionTimer::new(Duration::from_secs(60));
        let like = ActionTimer::new(Duration::from_secs(30));
        let t0 = Instant::now();

        post.mark_fired(t0);
        // Firing the post timer leaves the like timer due
        assert!(like.is_due(t0));
        assert!(!post.is_due(t0 + Duration::from_secs(1)));
    }
}
