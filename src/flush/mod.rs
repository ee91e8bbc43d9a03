//! L3 Flush Orchestrator (spec §4.4): the high-watermark MARK -> COPY ->
//! DELETE -> (periodic) COMPACT protocol, plus the out-of-band MAINTAIN
//! routine. Runs on its own timer-driven task (spec §5 "L3 runs on its own
//! timer-driven task"), independent of L2's batch cadence.

pub mod cold_store;
pub mod row_json;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use sqlx::{PgPool, Row};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::config::ColdStoreConfig;
use crate::error::Result;
use crate::extract::rows::TABLE_NAMES;
use crate::flush::cold_store::ColdStore;
use crate::observability::Metrics;
use crate::writer::schema::seq_column;

pub struct FlushConfig {
    pub cycle_interval: Duration,
    pub compact_every_n: u32,
    pub small_file_threshold_bytes: usize,
    pub snapshot_max_age: chrono::Duration,
}

impl Default for FlushConfig {
    fn default() -> Self {
        Self {
            cycle_interval: Duration::from_secs(3 * 3600),
            compact_every_n: 10,
            small_file_threshold_bytes: 16 * 1024 * 1024,
            snapshot_max_age: chrono::Duration::days(7),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub high_watermark: u64,
    pub rows_copied: u64,
    pub rows_deleted: u64,
    pub skipped: bool,
    pub compacted: bool,
}

/// The flush/maintenance lock. MAINTAIN must not run concurrently with COPY
/// on the same table (spec §4.4); a plain `RwLock` gives COPY cycles shared
/// access to run concurrently with each other (they never do - cycles are
/// serialized by the timer task - but the type models the real constraint)
/// while MAINTAIN takes the exclusive writer side.
pub struct FlushOrchestrator {
    hot: PgPool,
    cold: ColdStore,
    config: FlushConfig,
    metrics: std::sync::Arc<Metrics>,
    last_flushed: AtomicU64,
    cycle_count: AtomicU64,
    maintenance_lock: RwLock<()>,
}

impl FlushOrchestrator {
    pub fn new(
        hot: PgPool,
        cold_config: &ColdStoreConfig,
        config: FlushConfig,
        metrics: std::sync::Arc<Metrics>,
    ) -> Result<Self> {
        Ok(Self {
            hot,
            cold: ColdStore::new(cold_config)?,
            config,
            metrics,
            last_flushed: AtomicU64::new(0),
            cycle_count: AtomicU64::new(0),
            maintenance_lock: RwLock::new(()),
        })
    }

    /// Run forever on `cycle_interval`, until `cancel` fires (spec §5
    /// suspension point "L3: on store I/O, periodic sleeps, maintenance
    /// locks").
    pub async fn run(&self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(self.config.cycle_interval) => {}
            }
            match self.run_cycle().await {
                Ok(report) if !report.skipped => {
                    tracing::info!(
                        high_watermark = report.high_watermark,
                        rows_copied = report.rows_copied,
                        rows_deleted = report.rows_deleted,
                        compacted = report.compacted,
                        "flush cycle complete"
                    );
                }
                Ok(_) => tracing::debug!("flush cycle skipped: nothing new to flush"),
                Err(e) => {
                    self.metrics.flush.last_error.record(&e);
                    tracing::error!(error = %e, "flush cycle failed");
                }
            }
        }
    }

    /// One MARK -> COPY -> DELETE -> (periodic) COMPACT cycle (spec §4.4).
    #[tracing::instrument(skip(self))]
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let started = std::time::Instant::now();
        let guard = self.maintenance_lock.read().await;

        // MARK
        let high_watermark: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(sequence), 0) FROM ledger_header")
                .fetch_one(&self.hot)
                .await?;
        let w = high_watermark as u64;
        let last_flushed = self.last_flushed.load(Ordering::Acquire);
        if w == 0 || w == last_flushed {
            self.metrics.flush.cycles_skipped.increment(1);
            return Ok(CycleReport { skipped: true, ..Default::default() });
        }

        // COPY, table by table; a failure aborts the cycle before DELETE
        // (spec §4.4 "a failure on one table aborts the cycle before DELETE").
        let mut rows_copied = 0u64;
        for table in TABLE_NAMES {
            rows_copied += self.copy_table(table, w).await?;
        }

        // DELETE, any order (no FKs to honor).
        let mut rows_deleted = 0u64;
        for table in TABLE_NAMES {
            let seq_col = seq_column(table);
            let result = sqlx::query(&format!("DELETE FROM {table} WHERE {seq_col} <= $1"))
                .bind(w as i64)
                .execute(&self.hot)
                .await?;
            rows_deleted += result.rows_affected();
        }

        self.last_flushed.store(w, Ordering::Release);
        let cycle = self.cycle_count.fetch_add(1, Ordering::AcqRel) + 1;

        // COMPACT, every N-th cycle.
        let compacted = if cycle % self.config.compact_every_n as u64 == 0 {
            sqlx::query("VACUUM ANALYZE").execute(&self.hot).await.ok();
            self.metrics.flush.compactions_run.increment(1);
            true
        } else {
            false
        };

        drop(guard);

        self.metrics.flush.cycles_run.increment(1);
        self.metrics.flush.rows_copied.increment(rows_copied);
        self.metrics.flush.rows_deleted.increment(rows_deleted);
        self.metrics.flush.high_watermark.set(w as f64);
        self.metrics.flush.cycle_latency.record(started.elapsed());

        Ok(CycleReport {
            high_watermark: w,
            rows_copied,
            rows_deleted,
            skipped: false,
            compacted,
        })
    }

    async fn copy_table(&self, table: &str, w: u64) -> Result<u64> {
        let seq_col = seq_column(table);
        let rows = sqlx::query(&format!("SELECT * FROM {table} WHERE {seq_col} <= $1"))
            .bind(w as i64)
            .fetch_all(&self.hot)
            .await?;
        if rows.is_empty() {
            return Ok(0);
        }

        let mut by_range: std::collections::HashMap<u64, Vec<serde_json::Value>> =
            std::collections::HashMap::new();
        for row in &rows {
            let range: i64 = row.try_get("ledger_range")?;
            by_range.entry(range as u64).or_default().push(row_json::row_to_json(row));
        }

        let mut total = 0u64;
        for (range, json_rows) in by_range {
            total += json_rows.len() as u64;
            self.cold.write_parquet(table, range, json_rows).await?;
        }
        Ok(total)
    }

    /// `POST /maintenance/merge` (spec §4.4 MAINTAIN step 1, §6.4).
    pub async fn maintain_merge(&self) -> Result<usize> {
        let _guard = self.maintenance_lock.write().await;
        let mut merged = 0;
        for table in TABLE_NAMES {
            merged += self.cold.merge_small_files(table, self.config.small_file_threshold_bytes).await?;
        }
        self.metrics.flush.maintenance_runs.increment(1);
        Ok(merged)
    }

    /// `POST /maintenance/expire` (spec §4.4 MAINTAIN step 2).
    pub async fn maintain_expire(&self) -> Result<usize> {
        let _guard = self.maintenance_lock.write().await;
        let mut eligible = 0;
        for table in TABLE_NAMES {
            eligible += self.cold.expire_snapshots(table, self.config.snapshot_max_age).await?;
        }
        self.metrics.flush.maintenance_runs.increment(1);
        Ok(eligible)
    }

    /// `POST /maintenance/cleanup` (spec §4.4 MAINTAIN step 3). Without an
    /// external catalog wired in, "known" is every file this orchestrator
    /// itself just wrote; a production deployment passes the catalog's file
    /// list in here instead.
    pub async fn maintain_cleanup(&self) -> Result<usize> {
        let _guard = self.maintenance_lock.write().await;
        let mut removed = 0;
        for table in TABLE_NAMES {
            let known: Vec<String> = self
                .cold
                .list_files(table)
                .await?
                .into_iter()
                .map(|f| f.location.to_string())
                .collect();
            removed += self.cold.cleanup_orphans(table, &known).await?;
        }
        self.metrics.flush.maintenance_runs.increment(1);
        Ok(removed)
    }

    /// `POST /maintenance/full`: merge -> expire -> cleanup, in sequence
    /// (spec §6.4 "must only be called when L2 cold writes are paused;
    /// contract is advisory, operator responsibility").
    pub async fn maintain_full(&self) -> Result<(usize, usize, usize)> {
        let merged = self.maintain_merge().await?;
        let expired = self.maintain_expire().await?;
        let cleaned = self.maintain_cleanup().await?;
        Ok((merged, expired, cleaned))
    }

    /// `POST /maintenance/recreate`: destructive, guarded by an explicit
    /// confirmation flag at the control-surface layer (spec §6.4).
    pub async fn maintain_recreate(&self, table: &str) -> Result<usize> {
        let _guard = self.maintenance_lock.write().await;
        self.cold.recreate_table(table).await
    }

    pub fn last_flushed_range(&self) -> u64 {
        self.last_flushed.load(Ordering::Acquire)
    }
}
