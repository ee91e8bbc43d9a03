//! JSON health summary served at `GET /health` (spec §4.6, §6.4).

use serde::Serialize;

use crate::ingestion::circuit_breaker::State as BreakerState;
use crate::observability::Metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct HealthSummary {
    pub status: Status,
    pub uptime_seconds: u64,
    pub circuit_breaker_state: &'static str,
    pub last_sequence: u64,
    pub local_ratio: f64,
    pub cache_hit_rate: f64,
    pub counters: Counters,
    pub latency_ms: LatencySummary,
}

#[derive(Debug, Serialize)]
pub struct Counters {
    pub frames_fetched: u64,
    pub ledgers_extracted: u64,
    pub rows_written: u64,
    pub flush_cycles_run: u64,
    pub events_delivered: u64,
    pub row_parse_errors: u64,
    pub decoding_errors: u64,
}

#[derive(Debug, Serialize)]
pub struct LatencySummary {
    pub source_p99: Option<f64>,
    pub extractor_p99: Option<f64>,
    pub hot_writer_commit_p99: Option<f64>,
    pub flush_cycle_p99: Option<f64>,
}

pub fn summarize(metrics: &Metrics, breaker_state: BreakerState) -> HealthSummary {
    let breaker_label = match breaker_state {
        BreakerState::Closed => "closed",
        BreakerState::Open => "open",
        BreakerState::HalfOpen => "half_open",
    };
    HealthSummary {
        status: metrics.health_status(breaker_state),
        uptime_seconds: metrics.uptime_seconds(),
        circuit_breaker_state: breaker_label,
        last_sequence: metrics.hot_writer.last_sequence.get(),
        local_ratio: metrics.local_ratio(),
        cache_hit_rate: metrics.cache_hit_rate(),
        counters: Counters {
            frames_fetched: metrics.source.frames_fetched.get(),
            ledgers_extracted: metrics.extractor.ledgers_extracted.get(),
            rows_written: metrics.hot_writer.rows_written.get(),
            flush_cycles_run: metrics.flush.cycles_run.get(),
            events_delivered: metrics.broadcast.events_delivered.get(),
            row_parse_errors: metrics.extractor.row_parse_errors.get(),
            decoding_errors: metrics.extractor.decoding_errors.get(),
        },
        latency_ms: LatencySummary {
            source_p99: metrics.source.latency.p99(),
            extractor_p99: metrics.extractor.latency.p99(),
            hot_writer_commit_p99: metrics.hot_writer.commit_latency.p99(),
            flush_cycle_p99: metrics.flush.cycle_latency.p99(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::Metrics;

    #[test]
    fn fresh_metrics_are_healthy_with_no_samples() {
        let metrics = Metrics::new();
        let summary = summarize(&metrics, BreakerState::Closed);
        assert_eq!(summary.status, Status::Healthy);
        assert_eq!(summary.circuit_breaker_state, "closed");
        assert_eq!(summary.counters.frames_fetched, 0);
        assert!(summary.latency_ms.source_p99.is_none());
    }

    #[test]
    fn open_breaker_is_unhealthy_regardless_of_recent_errors() {
        let metrics = Metrics::new();
        let summary = summarize(&metrics, BreakerState::Open);
        assert_eq!(summary.status, Status::Unhealthy);
        assert_eq!(summary.circuit_breaker_state, "open");
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Status::Degraded).unwrap(), "\"degraded\"");
        assert_eq!(serde_json::to_string(&Status::Unhealthy).unwrap(), "\"unhealthy\"");
    }
}
