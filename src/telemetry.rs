//! Process-wide logging and metrics bootstrap, the way the teacher's
//! `main.rs` wires `tracing_subscriber`, generalized to also install the
//! Prometheus metrics recorder used throughout `observability`.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

/// Install the process-wide Prometheus recorder and return a handle whose
/// `render()` backs the `/metrics` control endpoint.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install metrics recorder")
}
