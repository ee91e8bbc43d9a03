//! L5 Observability (spec §4.6, SPEC_FULL §A.5): per-component counters, a
//! sliding latency histogram, last-error tracking, and the JSON health
//! summary served by the control surface. Every component owns its slice of
//! [`Metrics`], constructed once at startup and passed in (spec §9 "no
//! module-level mutable state").
//!
//! Every counter here both updates its own atomic (so the health endpoint
//! can read it back synchronously) and emits through the `metrics` crate's
//! global recorder (so `/metrics` gets the same numbers in Prometheus
//! exposition format via [`crate::telemetry::init_metrics`]).

pub mod histogram;
pub mod health;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::ingestion::circuit_breaker::State as BreakerState;
use histogram::LatencyHistogram;

/// A monotonically-increasing count, mirrored into the global Prometheus
/// recorder under `name` on every increment.
#[derive(Debug)]
pub struct Counter {
    name: &'static str,
    value: AtomicU64,
}

impl Counter {
    fn new(name: &'static str) -> Self {
        Self { name, value: AtomicU64::new(0) }
    }

    pub fn increment(&self, delta: u64) {
        self.value.fetch_add(delta, Ordering::Relaxed);
        metrics::counter!(self.name).increment(delta);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// A point-in-time value, mirrored into the global Prometheus recorder as a
/// gauge under `name` on every set.
#[derive(Debug)]
pub struct Gauge {
    name: &'static str,
    value: AtomicU64,
}

impl Gauge {
    fn new(name: &'static str) -> Self {
        Self { name, value: AtomicU64::new(0) }
    }

    pub fn set(&self, v: f64) {
        self.value.store(v as u64, Ordering::Relaxed);
        metrics::gauge!(self.name).set(v);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// The last error a component observed, with its timestamp, for the health
/// summary (spec §4.6 "last-error with timestamp").
#[derive(Debug, Default)]
pub struct LastError {
    inner: Mutex<Option<(String, DateTime<Utc>)>>,
}

impl LastError {
    pub fn record(&self, error: impl ToString) {
        *self.inner.lock().unwrap() = Some((error.to_string(), Utc::now()));
    }

    pub fn get(&self) -> Option<(String, DateTime<Utc>)> {
        self.inner.lock().unwrap().clone()
    }

    /// Whether the last recorded error happened within `window`.
    pub fn within(&self, window: chrono::Duration) -> bool {
        self.get().is_some_and(|(_, at)| Utc::now() - at < window)
    }
}

#[derive(Debug, Default)]
pub struct SourceMetrics {
    pub frames_fetched: Counter,
    pub frames_local: Counter,
    pub frames_historical: Counter,
    pub cache_hits: Counter,
    pub cache_misses: Counter,
    pub retries: Counter,
    pub cursor_boundary_resets: Counter,
    pub circuit_opened: Counter,
    pub circuit_half_open_trials: Counter,
    pub latency: LatencyHistogram,
    pub last_error: LastError,
}

impl Default for Counter {
    fn default() -> Self {
        Counter::new("unnamed")
    }
}
impl Default for Gauge {
    fn default() -> Self {
        Gauge::new("unnamed")
    }
}

#[derive(Debug, Default)]
pub struct ExtractorMetrics {
    pub ledgers_extracted: Counter,
    pub rows_extracted: Counter,
    pub row_parse_errors: Counter,
    pub decoding_errors: Counter,
    pub latency: LatencyHistogram,
    pub last_error: LastError,
}

#[derive(Debug, Default)]
pub struct HotWriterMetrics {
    pub batches_written: Counter,
    pub ledgers_written: Counter,
    pub rows_written: Counter,
    pub last_sequence: Gauge,
    pub store_unavailable_errors: Counter,
    pub constraint_violations: Counter,
    pub commit_latency: LatencyHistogram,
    pub last_error: LastError,
}

#[derive(Debug, Default)]
pub struct FlushMetrics {
    pub cycles_run: Counter,
    pub cycles_skipped: Counter,
    pub rows_copied: Counter,
    pub rows_deleted: Counter,
    pub high_watermark: Gauge,
    pub compactions_run: Counter,
    pub maintenance_runs: Counter,
    pub cycle_latency: LatencyHistogram,
    pub last_error: LastError,
}

#[derive(Debug, Default)]
pub struct BroadcastMetrics {
    pub events_delivered: Counter,
    pub subscribers_active: Gauge,
    pub subscribers_disconnected_backpressure: Counter,
    pub last_error: LastError,
}

/// All per-component metrics, constructed once at startup and shared by
/// `Arc` into every stage and the control surface (spec §9 "no module-level
/// mutable state ... passed in at construction").
#[derive(Debug)]
pub struct Metrics {
    pub source: SourceMetrics,
    pub extractor: ExtractorMetrics,
    pub hot_writer: HotWriterMetrics,
    pub flush: FlushMetrics,
    pub broadcast: BroadcastMetrics,
    pub started_at: Instant,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            source: SourceMetrics {
                frames_fetched: Counter::new("source_frames_fetched_total"),
                frames_local: Counter::new("source_frames_local_total"),
                frames_historical: Counter::new("source_frames_historical_total"),
                cache_hits: Counter::new("source_cache_hits_total"),
                cache_misses: Counter::new("source_cache_misses_total"),
                retries: Counter::new("source_retries_total"),
                cursor_boundary_resets: Counter::new("source_cursor_boundary_resets_total"),
                circuit_opened: Counter::new("circuit_opened_total"),
                circuit_half_open_trials: Counter::new("circuit_half_open_trials_total"),
                latency: LatencyHistogram::new(),
                last_error: LastError::default(),
            },
            extractor: ExtractorMetrics {
                ledgers_extracted: Counter::new("extractor_ledgers_extracted_total"),
                rows_extracted: Counter::new("extractor_rows_extracted_total"),
                row_parse_errors: Counter::new("extractor_row_parse_errors_total"),
                decoding_errors: Counter::new("extractor_decoding_errors_total"),
                latency: LatencyHistogram::new(),
                last_error: LastError::default(),
            },
            hot_writer: HotWriterMetrics {
                batches_written: Counter::new("hot_writer_batches_written_total"),
                ledgers_written: Counter::new("hot_writer_ledgers_written_total"),
                rows_written: Counter::new("hot_writer_rows_written_total"),
                last_sequence: Gauge::new("hot_writer_last_sequence"),
                store_unavailable_errors: Counter::new("hot_writer_store_unavailable_total"),
                constraint_violations: Counter::new("hot_writer_constraint_violations_total"),
                commit_latency: LatencyHistogram::new(),
                last_error: LastError::default(),
            },
            flush: FlushMetrics {
                cycles_run: Counter::new("flush_cycles_run_total"),
                cycles_skipped: Counter::new("flush_cycles_skipped_total"),
                rows_copied: Counter::new("flush_rows_copied_total"),
                rows_deleted: Counter::new("flush_rows_deleted_total"),
                high_watermark: Gauge::new("flush_high_watermark"),
                compactions_run: Counter::new("flush_compactions_run_total"),
                maintenance_runs: Counter::new("flush_maintenance_runs_total"),
                cycle_latency: LatencyHistogram::new(),
                last_error: LastError::default(),
            },
            broadcast: BroadcastMetrics {
                events_delivered: Counter::new("broadcast_events_delivered_total"),
                subscribers_active: Gauge::new("broadcast_subscribers_active"),
                subscribers_disconnected_backpressure: Counter::new(
                    "broadcast_subscribers_disconnected_backpressure_total",
                ),
                last_error: LastError::default(),
            },
            started_at: Instant::now(),
        })
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// §4.6: `degraded` after any error in the last 5 minutes, `unhealthy`
    /// when the circuit breaker is open. Takes the breaker state as a
    /// parameter since it lives with the running source adapter rather than
    /// in `Metrics` itself.
    pub fn health_status(&self, breaker_state: BreakerState) -> health::Status {
        if breaker_state == BreakerState::Open {
            return health::Status::Unhealthy;
        }
        let window = chrono::Duration::minutes(5);
        let recent_error = self.source.last_error.within(window)
            || self.extractor.last_error.within(window)
            || self.hot_writer.last_error.within(window)
            || self.flush.last_error.within(window)
            || self.broadcast.last_error.within(window);
        if recent_error {
            health::Status::Degraded
        } else {
            health::Status::Healthy
        }
    }

    /// Local vs historical frame ratio (spec §4.6 "data-source metrics"). `0.0`
    /// when no frames have been fetched yet rather than dividing by zero.
    pub fn local_ratio(&self) -> f64 {
        let local = self.source.frames_local.get();
        let historical = self.source.frames_historical.get();
        let total = local + historical;
        if total == 0 {
            0.0
        } else {
            local as f64 / total as f64
        }
    }

    pub fn cache_hit_rate(&self) -> f64 {
        let hits = self.source.cache_hits.get();
        let misses = self.source.cache_misses.get();
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}
