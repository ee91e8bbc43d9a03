//! Three-state circuit breaker guarding calls to the upstream source (spec
//! §4.1 "circuit breaker"). Mirrors the teacher's `consecutive_failures`
//! counter in `sync::run_sync`, generalized into a reusable state machine
//! with an explicit half-open probe state instead of an unbounded backoff.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Closed,
    Open,
    HalfOpen,
}

pub struct CircuitBreaker {
    state: State,
    consecutive_failures: u32,
    threshold: u32,
    reset_after: Duration,
    opened_at: Option<Instant>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, reset_after: Duration) -> Self {
        Self {
            state: State::Closed,
            consecutive_failures: 0,
            threshold,
            reset_after,
            opened_at: None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Whether a call should be attempted right now. Transitions `Open` ->
    /// `HalfOpen` once `reset_after` has elapsed, allowing exactly one probe
    /// through.
    pub fn allow_request(&mut self) -> bool {
        match self.state {
            State::Closed | State::HalfOpen => true,
            State::Open => {
                if self.opened_at.map(|t| t.elapsed() >= self.reset_after).unwrap_or(false) {
                    self.state = State::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.state = State::Closed;
        self.opened_at = None;
    }

    pub fn record_failure(&mut self) {
        self.consecutive_failures += 1;
        match self.state {
            State::HalfOpen => {
                self.state = State::Open;
                self.opened_at = Some(Instant::now());
            }
            State::Closed if self.consecutive_failures >= self.threshold => {
                self.state = State::Open;
                self.opened_at = Some(Instant::now());
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_threshold_failures() {
        let mut cb = CircuitBreaker::new(3, Duration::from_secs(30));
        for _ in 0..2 {
            cb.record_failure();
            assert_eq!(cb.state(), State::Closed);
        }
        cb.record_failure();
        assert_eq!(cb.state(), State::Open);
    }

    #[test]
    fn blocks_requests_while_open() {
        let mut cb = CircuitBreaker::new(1, Duration::from_secs(60));
        cb.record_failure();
        assert!(!cb.allow_request());
    }

    #[test]
    fn half_open_failure_reopens_immediately() {
        let mut cb = CircuitBreaker::new(1, Duration::from_millis(0));
        cb.record_failure();
        assert!(cb.allow_request());
        assert_eq!(cb.state(), State::HalfOpen);
        cb.record_failure();
        assert_eq!(cb.state(), State::Open);
    }

    #[test]
    fn success_closes_and_resets_counter() {
        let mut cb = CircuitBreaker::new(2, Duration::from_secs(1));
        cb.record_failure();
        cb.record_success();
        assert_eq!(cb.state(), State::Closed);
        cb.record_failure();
        assert_eq!(cb.state(), State::Closed);
    }
}
