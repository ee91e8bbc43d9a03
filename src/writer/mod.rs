//! L2 Hot Writer (spec §4.3): batches extracted ledgers, persists all
//! nineteen row streams in one transaction per batch, and advances the
//! checkpoint atomically with them (invariant 2, "atomic per-ledger").
//!
//! Connection pool sizing follows spec §4.3 "one connection pool sized to
//! `min(2×B, store_max_connections)`"; `sqlx::PgPool`'s own `max_connections`
//! already enforces the store-side ceiling, so the writer only needs to ask
//! for `2×B`.

pub mod insert;
pub mod schema;

use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use crate::config::HotStoreConfig;
use crate::error::{Error, Result};
use crate::extract::rows::{ExtractedLedger, TABLE_NAMES};
use crate::ingestion::cursor::Checkpoint;
use crate::observability::Metrics;

pub struct HotWriter {
    pool: PgPool,
    config: HotStoreConfig,
    metrics: std::sync::Arc<Metrics>,
}

impl HotWriter {
    pub async fn connect(config: HotStoreConfig, metrics: std::sync::Arc<Metrics>) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections((config.batch_size * 2).max(1))
            .connect(&config.connection)
            .await?;
        let writer = Self { pool, config, metrics };
        writer.bootstrap().await?;
        Ok(writer)
    }

    /// Execute the declarative schema idempotently and verify the tables
    /// we're about to write to actually exist (spec §4.3 "schema bootstrap").
    async fn bootstrap(&self) -> Result<()> {
        for stmt in schema::bootstrap_statements() {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        for table in TABLE_NAMES {
            let exists: bool = sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_name = $1)",
            )
            .bind(table)
            .fetch_one(&self.pool)
            .await?;
            if !exists {
                return Err(Error::ConstraintViolation(format!(
                    "hot store missing table {table} after bootstrap"
                )));
            }
        }
        Ok(())
    }

    /// Read the persisted checkpoint, or a genesis one if none exists yet
    /// (spec §4.3 "a missing checkpoint means start from caller-supplied
    /// `start_sequence`").
    pub async fn load_checkpoint(&self) -> Result<Checkpoint> {
        let row = sqlx::query(
            "SELECT last_sequence, last_hash, total_ledgers_processed, total_rows_written, updated_at \
             FROM checkpoint WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(Checkpoint {
                last_sequence: row.try_get::<i64, _>("last_sequence")? as u32,
                last_hash: row.try_get("last_hash")?,
                total_ledgers_processed: row.try_get::<i64, _>("total_ledgers_processed")? as u64,
                total_rows_written: row.try_get::<i64, _>("total_rows_written")? as u64,
                updated_at: row.try_get("updated_at")?,
            }),
            None => Ok(Checkpoint::genesis()),
        }
    }

    /// Persist one batch of 1..B already-extracted ledgers: accumulate every
    /// row stream across the batch, insert in [`TABLE_NAMES`] order, bump
    /// the checkpoint, and commit - all in a single transaction (spec §4.3
    /// "one transaction per batch").
    #[tracing::instrument(skip_all, fields(ledgers = ledgers.len()))]
    pub async fn write_batch(&self, ledgers: &[ExtractedLedger]) -> Result<Checkpoint> {
        if ledgers.is_empty() {
            return self.load_checkpoint().await;
        }

        let mut tx = self.pool.begin().await.map_err(|e| Error::StoreUnavailable(e.to_string()))?;

        let mut rows_written: u64 = 0;
        let mut last_sequence = 0u32;
        let mut last_hash = String::new();

        for ledger in ledgers {
            let header = ledger.ledger_header.as_ref().ok_or_else(|| {
                Error::ConstraintViolation("extracted ledger missing header row".to_string())
            })?;
            if header.sequence <= last_sequence && last_sequence != 0 {
                return Err(Error::ConstraintViolation(format!(
                    "batch not monotonic: {} after {}",
                    header.sequence, last_sequence
                )));
            }
            last_sequence = header.sequence;
            last_hash = header.ledger_hash.clone();

            insert::ledger_header(&mut tx, header).await?;
            insert::transactions(&mut tx, &ledger.transactions).await?;
            insert::operations(&mut tx, &ledger.operations).await?;
            insert::effects(&mut tx, &ledger.effects).await?;
            insert::trades(&mut tx, &ledger.trades).await?;
            insert::account_snapshots(&mut tx, &ledger.account_snapshots).await?;
            insert::trustline_snapshots(&mut tx, &ledger.trustline_snapshots).await?;
            insert::native_balances(&mut tx, &ledger.native_balances).await?;
            insert::account_signers(&mut tx, &ledger.account_signers).await?;
            insert::offers(&mut tx, &ledger.offers).await?;
            insert::liquidity_pools(&mut tx, &ledger.liquidity_pools).await?;
            insert::claimable_balances(&mut tx, &ledger.claimable_balances).await?;
            insert::contract_events(&mut tx, &ledger.contract_events).await?;
            insert::contract_data(&mut tx, &ledger.contract_data).await?;
            insert::contract_code(&mut tx, &ledger.contract_code).await?;
            insert::config_settings(&mut tx, &ledger.config_settings).await?;
            insert::ttls(&mut tx, &ledger.ttls).await?;
            insert::evicted_keys(&mut tx, &ledger.evicted_keys).await?;
            insert::restored_keys(&mut tx, &ledger.restored_keys).await?;

            rows_written += row_count(ledger);
        }

        let mut checkpoint = self.load_checkpoint_in_tx(&mut tx).await?;
        checkpoint.advance(last_sequence, last_hash, rows_written);
        self.upsert_checkpoint(&mut tx, &checkpoint).await?;

        tx.commit().await.map_err(|e| Error::StoreUnavailable(e.to_string()))?;

        self.metrics.hot_writer.ledgers_written.increment(ledgers.len() as u64);
        self.metrics.hot_writer.rows_written.increment(rows_written);
        self.metrics.hot_writer.last_sequence.set(checkpoint.last_sequence as f64);

        Ok(checkpoint)
    }

    async fn load_checkpoint_in_tx(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ) -> Result<Checkpoint> {
        let row = sqlx::query(
            "SELECT last_sequence, last_hash, total_ledgers_processed, total_rows_written, updated_at \
             FROM checkpoint WHERE id = 1 FOR UPDATE",
        )
        .fetch_optional(&mut **tx)
        .await?;
        match row {
            Some(row) => Ok(Checkpoint {
                last_sequence: row.try_get::<i64, _>("last_sequence")? as u32,
                last_hash: row.try_get("last_hash")?,
                total_ledgers_processed: row.try_get::<i64, _>("total_ledgers_processed")? as u64,
                total_rows_written: row.try_get::<i64, _>("total_rows_written")? as u64,
                updated_at: row.try_get("updated_at")?,
            }),
            None => Ok(Checkpoint::genesis()),
        }
    }

    async fn upsert_checkpoint(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        checkpoint: &Checkpoint,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO checkpoint (id, last_sequence, last_hash, total_ledgers_processed, \
             total_rows_written, updated_at) VALUES (1, $1, $2, $3, $4, $5) \
             ON CONFLICT (id) DO UPDATE SET \
               last_sequence = EXCLUDED.last_sequence, last_hash = EXCLUDED.last_hash, \
               total_ledgers_processed = EXCLUDED.total_ledgers_processed, \
               total_rows_written = EXCLUDED.total_rows_written, updated_at = EXCLUDED.updated_at",
        )
        .bind(checkpoint.last_sequence as i64)
        .bind(&checkpoint.last_hash)
        .bind(checkpoint.total_ledgers_processed as i64)
        .bind(checkpoint.total_rows_written as i64)
        .bind(checkpoint.updated_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub fn config(&self) -> &HotStoreConfig {
        &self.config
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn row_count(ledger: &ExtractedLedger) -> u64 {
    1 // ledger_header
        + ledger.transactions.len() as u64
        + ledger.operations.len() as u64
        + ledger.effects.len() as u64
        + ledger.trades.len() as u64
        + ledger.account_snapshots.len() as u64
        + ledger.trustline_snapshots.len() as u64
        + ledger.native_balances.len() as u64
        + ledger.account_signers.len() as u64
        + ledger.offers.len() as u64
        + ledger.liquidity_pools.len() as u64
        + ledger.claimable_balances.len() as u64
        + ledger.contract_events.len() as u64
        + ledger.contract_data.len() as u64
        + ledger.contract_code.len() as u64
        + ledger.config_settings.len() as u64
        + ledger.ttls.len() as u64
        + ledger.evicted_keys.len() as u64
        + ledger.restored_keys.len() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_count_includes_header() {
        let ledger = ExtractedLedger::default();
        assert_eq!(row_count(&ledger), 1);
    }
}
