//! Per-address cooldown for newsletter subscriptions.
//!
//! The cache lives in process memory: it is neither shared between instances
//! nor persisted, so a restart clears every cooldown. Running more than one
//! instance requires moving the entries into a shared expiring store with an
//! atomic compare-and-set.

use crate::clock::Clock;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

pub const COOLDOWN_MS: i64 = 60 * 1000;

/// Handle to the entry written by an allowed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    recorded_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    Allowed(Attempt),
    Throttled,
}

impl ThrottleDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, ThrottleDecision::Allowed(_))
    }
}

pub struct SubscriptionThrottle {
    clock: Arc<dyn Clock>,
    cooldown_ms: i64,
    entries: Mutex<HashMap<String, i64>>,
}

impl SubscriptionThrottle {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            cooldown_ms: COOLDOWN_MS,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_cooldown(mut self, cooldown_ms: i64) -> Self {
        self.cooldown_ms = cooldown_ms;
        self
    }

    /// Records an attempt for `email` unless one was recorded within the
    /// cooldown window. Keys are compared exactly as received.
    pub fn check_and_record(&self, email: &str) -> ThrottleDecision {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock();

        if let Some(&recorded) = entries.get(email) {
            if now - recorded < self.cooldown_ms {
                return ThrottleDecision::Throttled;
            }
        }

        entries.insert(email.to_owned(), now);
        Self::sweep_locked(&mut entries, now, self.cooldown_ms);
        ThrottleDecision::Allowed(Attempt { recorded_at: now })
    }

    /// Forgets `attempt`, so a failed subscription can be retried
    /// immediately. An entry recorded by a later attempt is kept.
    pub fn release(&self, email: &str, attempt: Attempt) {
        let mut entries = self.entries.lock();
        if entries.get(email) == Some(&attempt.recorded_at) {
            entries.remove(email);
        }
    }

    /// Drops every entry older than the cooldown window.
    pub fn sweep(&self, now: i64) {
        let mut entries = self.entries.lock();
        Self::sweep_locked(&mut entries, now, self.cooldown_ms);
    }

    fn sweep_locked(entries: &mut HashMap<String, i64>, now: i64, cooldown_ms: i64) {
        entries.retain(|_, recorded| now - *recorded <= cooldown_ms);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn throttle() -> (SubscriptionThrottle, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        (SubscriptionThrottle::new(clock.clone()), clock)
    }

    #[test]
    fn second_attempt_within_cooldown_is_throttled() {
        let (throttle, clock) = throttle();

        assert!(throttle.check_and_record("a@x.com").is_allowed());
        clock.advance(30_000);
        assert_eq!(throttle.check_and_record("a@x.com"), ThrottleDecision::Throttled);

        clock.advance(31_000);
        assert!(throttle.check_and_record("a@x.com").is_allowed());
    }

    #[test]
    fn throttled_attempt_does_not_extend_the_window() {
        let (throttle, clock) = throttle();

        throttle.check_and_record("a@x.com");
        clock.advance(59_999);
        assert_eq!(throttle.check_and_record("a@x.com"), ThrottleDecision::Throttled);
        clock.advance(1);
        assert!(throttle.check_and_record("a@x.com").is_allowed());
    }

    #[test]
    fn addresses_are_independent_and_case_sensitive() {
        let (throttle, _) = throttle();

        assert!(throttle.check_and_record("a@x.com").is_allowed());
        assert!(throttle.check_and_record("b@x.com").is_allowed());
        assert!(throttle.check_and_record("A@x.com").is_allowed());
        assert_eq!(throttle.len(), 3);
    }

    #[test]
    fn allowed_attempt_sweeps_expired_entries() {
        let (throttle, clock) = throttle();

        throttle.check_and_record("old@x.com");
        clock.advance(COOLDOWN_MS + 1);
        throttle.check_and_record("new@x.com");

        assert_eq!(throttle.len(), 1);
    }

    #[test]
    fn explicit_sweep_keeps_fresh_entries() {
        let (throttle, clock) = throttle();

        throttle.check_and_record("a@x.com");
        clock.advance(10_000);
        throttle.check_and_record("b@x.com");

        throttle.sweep(clock.now_millis() + COOLDOWN_MS - 5_000);
        assert_eq!(throttle.len(), 1);

        throttle.sweep(clock.now_millis() + COOLDOWN_MS + 1);
        assert!(throttle.is_empty());
    }

    #[test]
    fn release_allows_immediate_retry() {
        let (throttle, _) = throttle();

        let ThrottleDecision::Allowed(attempt) = throttle.check_and_record("a@x.com") else {
            panic!("first attempt must be allowed");
        };
        throttle.release("a@x.com", attempt);
        assert!(throttle.check_and_record("a@x.com").is_allowed());
    }

    #[test]
    fn stale_release_keeps_newer_attempt() {
        let (throttle, clock) = throttle();

        let ThrottleDecision::Allowed(slow) = throttle.check_and_record("a@x.com") else {
            panic!("first attempt must be allowed");
        };
        clock.advance(COOLDOWN_MS);
        assert!(throttle.check_and_record("a@x.com").is_allowed());

        throttle.release("a@x.com", slow);
        assert_eq!(throttle.check_and_record("a@x.com"), ThrottleDecision::Throttled);
    }

    #[test]
    fn concurrent_attempts_allow_exactly_one() {
        let (throttle, _) = throttle();
        let throttle = Arc::new(throttle);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let throttle = throttle.clone();
                std::thread::spawn(move || throttle.check_and_record("a@x.com"))
            })
            .collect();

        let allowed = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(ThrottleDecision::is_allowed)
            .count();
        assert_eq!(allowed, 1);
    }
}
