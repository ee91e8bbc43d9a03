//! Typed configuration (spec §6.5).
//!
//! These structs are the recognized-options surface; loading them from an
//! arbitrary declarative file format is an out-of-scope external-collaborator
//! concern (spec §1). They're populated directly by `main`'s `clap::Parser`
//! CLI/env wiring, the way the teacher's `Cli` struct is.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub endpoint: String,
    pub network_passphrase: String,
    pub start_sequence: u32,
    /// 0 = unbounded / live.
    pub end_sequence: u32,
}

#[derive(Debug, Clone)]
pub struct HotStoreConfig {
    pub connection: String,
    pub batch_size: u32,
    pub commit_interval: Duration,
    pub max_retries: u32,
    pub vacuum_every_n: u32,
}

impl Default for HotStoreConfig {
    fn default() -> Self {
        Self {
            connection: String::new(),
            batch_size: 50,
            commit_interval: Duration::from_secs(5),
            max_retries: 3,
            vacuum_every_n: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ColdStoreConfig {
    pub catalog: String,
    pub data_path: String,
    pub region: Option<String>,
    pub credentials: Option<String>,
    pub partition_by: &'static str,
}

impl Default for ColdStoreConfig {
    fn default() -> Self {
        Self {
            catalog: String::new(),
            data_path: String::new(),
            region: None,
            credentials: None,
            partition_by: "ledger_range",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl: Duration,
    pub max_entries: usize,
    pub prefetch_concurrency: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(3600),
            max_entries: 10_000,
            prefetch_concurrency: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControlConfig {
    pub health_port: u16,
    pub metrics_port: u16,
    /// Whether `/maintenance/recreate` is reachable at all (spec §6.4
    /// "guarded by an explicit confirmation flag" - this is the operator-side
    /// half of that gate; `confirm: true` in the request body is the other).
    pub allow_recreate: bool,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            health_port: 8080,
            metrics_port: 9090,
            allow_recreate: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LimitsConfig {
    pub circuit_breaker_threshold: u32,
    pub circuit_breaker_reset: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Heuristic size of the upstream's hot retention window, used to
    /// classify frames as "local" vs "historical" (§4.1). Flagged in spec
    /// §9 as configurable rather than hard-coded.
    pub retention_window_ledgers: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            circuit_breaker_threshold: 5,
            circuit_breaker_reset: Duration::from_secs(30),
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            retention_window_ledgers: 60_480,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub source: SourceConfig,
    pub hot_store: HotStoreConfig,
    pub cold_store: ColdStoreConfig,
    pub cache: CacheConfig,
    pub control: ControlConfig,
    pub limits: LimitsConfig,
}
