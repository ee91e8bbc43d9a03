//! Bounded sliding-window latency histogram (SPEC_FULL §A.5): keeps the last
//! 1000 samples and reads back p50/p95/p99 on demand, rather than an
//! unbounded accumulator whose percentiles drift as the process runs for
//! days.

use std::sync::Mutex;
use std::time::Duration;

const WINDOW: usize = 1000;

#[derive(Debug)]
pub struct LatencyHistogram {
    samples: Mutex<Vec<f64>>,
    next: Mutex<usize>,
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}

impl LatencyHistogram {
    pub fn new() -> Self {
        Self {
            samples: Mutex::new(Vec::with_capacity(WINDOW)),
            next: Mutex::new(0),
        }
    }

    pub fn record(&self, d: Duration) {
        let millis = d.as_secs_f64() * 1000.0;
        let mut samples = self.samples.lock().unwrap();
        if samples.len() < WINDOW {
            samples.push(millis);
        } else {
            let mut next = self.next.lock().unwrap();
            samples[*next] = millis;
            *next = (*next + 1) % WINDOW;
        }
    }

    /// Nearest-rank percentile over whatever samples are currently in the
    /// window, `None` if empty. `p` is in `[0.0, 1.0]`.
    pub fn percentile(&self, p: f64) -> Option<f64> {
        let mut samples = self.samples.lock().unwrap().clone();
        if samples.is_empty() {
            return None;
        }
        samples.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let idx = ((samples.len() as f64 - 1.0) * p).round() as usize;
        Some(samples[idx])
    }

    pub fn p50(&self) -> Option<f64> {
        self.percentile(0.50)
    }

    pub fn p95(&self) -> Option<f64> {
        self.percentile(0.95)
    }

    pub fn p99(&self) -> Option<f64> {
        self.percentile(0.99)
    }

    pub fn sample_count(&self) -> usize {
        self.samples.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_histogram_has_no_percentiles() {
        let h = LatencyHistogram::new();
        assert_eq!(h.p50(), None);
    }

    #[test]
    fn percentiles_over_known_samples() {
        let h = LatencyHistogram::new();
        for ms in 1..=100 {
            h.record(Duration::from_millis(ms));
        }
        assert_eq!(h.p50(), Some(50.0));
        assert_eq!(h.p99(), Some(99.0));
    }

    #[test]
    fn window_wraps_past_capacity() {
        let h = LatencyHistogram::new();
        for ms in 0..(WINDOW as u64 + 10) {
            h.record(Duration::from_millis(ms));
        }
        assert_eq!(h.sample_count(), WINDOW);
        // Oldest 10 samples (0..10ms) were evicted; the window now holds
        // [10, WINDOW+10).
        assert_eq!(h.percentile(0.0), Some(10.0));
    }
}
