//! L4 Event Broadcasters (spec §4.5): per-domain live services that consume
//! the L0 stream in parallel with L1+L2, each with its own upstream
//! subscription and per-subscriber fan-out queue (spec §5 "L4 services each
//! have their own L0 subscription and their own extractor/filter task per
//! subscriber").
//!
//! The shared plumbing here - connecting a subscriber-scoped `RawLedgerSource`,
//! running it through L1 extraction, and delivering typed events with a
//! deadline-bounded backpressure policy - is the same for all three domains;
//! only the filter and the `ExtractedLedger -> Vec<Event>` projection differ,
//! so [`payment`] and [`invocation`] supply those and call back into
//! [`run_subscription`]. [`balance`] draws events from two row streams
//! (native balances and trustline snapshots) that don't share a shape, so
//! it runs its own copy of the same driver instead.

pub mod balance;
pub mod invocation;
pub mod payment;
pub mod wildcard;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tonic::Status;

use crate::config::{CacheConfig, LimitsConfig, SourceConfig};
use crate::error::Error;
use crate::extract::rows::ExtractedLedger;
use crate::ingestion::source::RawLedgerSource;
use crate::observability::Metrics;

/// How long a subscriber's send queue may stay full before the broadcaster
/// gives up on it (spec §4.5 "disconnects after a deadline").
pub(crate) const SEND_DEADLINE: Duration = Duration::from_secs(10);

/// Shared, process-wide dependencies every broadcaster service needs to
/// open its own upstream subscription. Cheap to clone (an `Arc` around the
/// connection parameters), so each `subscribe` call gets its own copy.
pub struct BroadcastDeps {
    pub source_config: SourceConfig,
    pub limits: LimitsConfig,
    pub cache: CacheConfig,
    pub archive_base_url: String,
    pub http_client: reqwest::Client,
    pub network_passphrase: String,
    pub metrics: Arc<Metrics>,
}

/// Drive one subscriber's upstream subscription end to end: connect a
/// dedicated [`RawLedgerSource`], pull ledgers sequentially from
/// `start_sequence`, run them through L1 extraction, project each ledger
/// into the domain's typed events via `project`, and deliver them respecting
/// the subscriber's backpressure deadline. Returns once the stream ends,
/// is cancelled, or the subscriber falls behind for longer than
/// [`SEND_DEADLINE`].
pub(crate) async fn run_subscription<T, P>(
    deps: Arc<BroadcastDeps>,
    start_sequence: u32,
    end_sequence: u32,
    cancel: CancellationToken,
    tx: mpsc::Sender<Result<T, Status>>,
    mut project: P,
) where
    T: Send + 'static,
    P: FnMut(&ExtractedLedger) -> Vec<T> + Send,
{
    let mut source_config = deps.source_config.clone();
    source_config.start_sequence = start_sequence;
    source_config.end_sequence = end_sequence;

    let mut source = match RawLedgerSource::connect(
        source_config,
        deps.limits.clone(),
        &deps.cache,
        deps.archive_base_url.clone(),
        deps.http_client.clone(),
    )
    .await
    {
        Ok(source) => source,
        Err(e) => {
            let _ = tx.send(Err(e.into())).await;
            return;
        }
    };

    let mut next = start_sequence;
    let mut upstream_latest = start_sequence;
    deps.metrics.broadcast.subscribers_active.set(deps.metrics.broadcast.subscribers_active.get() as f64 + 1.0);

    loop {
        if cancel.is_cancelled() {
            break;
        }
        if end_sequence != 0 && next > end_sequence {
            break;
        }

        match source.fetch_ledger(next, upstream_latest, &cancel).await {
            Ok(meta) => {
                upstream_latest = upstream_latest.max(next);
                let extracted = crate::extract::extract_ledger(&meta, &deps.network_passphrase);
                let mut disconnected = false;
                for event in project(&extracted) {
                    if deliver(&tx, event, &cancel).await {
                        deps.metrics.broadcast.events_delivered.increment(1);
                    } else {
                        deps.metrics.broadcast.subscribers_disconnected_backpressure.increment(1);
                        disconnected = true;
                        break;
                    }
                }
                if disconnected {
                    break;
                }
                next += 1;
            }
            Err(Error::Cancelled) => break,
            Err(e) => {
                deps.metrics.broadcast.last_error.record(&e);
                let _ = tx.send(Err(e.into())).await;
                break;
            }
        }
    }
    let active = deps.metrics.broadcast.subscribers_active.get();
    deps.metrics.broadcast.subscribers_active.set(active.saturating_sub(1) as f64);
}

/// Pair each transaction with its slice of `extracted.operations` and its
/// position in the ledger. `extract_ledger` pushes a transaction's
/// operations contiguously and in the same order it pushes the transaction
/// itself (spec §4.2's per-transaction extraction, never reordered by the
/// dedup pass that follows), so a running offset keyed by
/// `operation_count` recovers `tx_index` without `OperationRow` needing to
/// carry it.
pub(crate) fn operations_by_tx(
    extracted: &ExtractedLedger,
) -> Vec<(u32, &crate::extract::rows::TransactionRow, &[crate::extract::rows::OperationRow])> {
    let mut offset = 0usize;
    let mut out = Vec::with_capacity(extracted.transactions.len());
    for (tx_index, tx) in extracted.transactions.iter().enumerate() {
        let count = tx.operation_count as usize;
        let end = (offset + count).min(extracted.operations.len());
        out.push((tx_index as u32, tx, &extracted.operations[offset..end]));
        offset = end;
    }
    out
}

/// Deliver one event, blocking the subscriber's own task (never the shared
/// upstream) until it's accepted or [`SEND_DEADLINE`] elapses (spec §4.5
/// "blocks upstream consumption for that subscriber... or disconnects after
/// a deadline"). Returns `false` when the subscriber should be dropped.
async fn deliver<T>(tx: &mpsc::Sender<Result<T, Status>>, event: T, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        result = tokio::time::timeout(SEND_DEADLINE, tx.send(Ok(event))) => {
            matches!(result, Ok(Ok(())))
        }
    }
}
