//! `BalanceBroadcaster` (spec §4.5, §6.2): live account balance snapshots
//! (native and trustline), filterable by account and asset.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};

use crate::broadcast::{BroadcastDeps, SEND_DEADLINE};
use crate::extract::rows::ExtractedLedger;
use crate::grpc::events::balance_broadcaster_server::BalanceBroadcaster;
use crate::grpc::events::{BalanceEvent, BalanceFilter, SubscribeBalancesRequest};
use crate::ingestion::source::RawLedgerSource;

const SUBSCRIBER_QUEUE_DEPTH: usize = 256;

pub struct BalanceService {
    deps: Arc<BroadcastDeps>,
}

impl BalanceService {
    pub fn new(deps: Arc<BroadcastDeps>) -> Self {
        Self { deps }
    }
}

#[tonic::async_trait]
impl BalanceBroadcaster for BalanceService {
    type SubscribeStream = ReceiverStream<Result<BalanceEvent, Status>>;

    async fn subscribe(
        &self,
        request: Request<SubscribeBalancesRequest>,
    ) -> Result<Response<Self::SubscribeStream>, Status> {
        let req = request.into_inner();
        let cursor = req.cursor.unwrap_or_default();
        let filter = req.filter.unwrap_or_default();

        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE_DEPTH);
        let deps = self.deps.clone();
        let cancel = tokio_util::sync::CancellationToken::new();

        tokio::spawn(run(deps, cursor.start_sequence, cursor.end_sequence, cancel, tx, filter));

        Ok(Response::new(ReceiverStream::new(rx)))
    }
}

/// Balance events come from both the native-balance and trustline-snapshot
/// streams, which don't share a row shape, so this gets its own driver
/// instead of reusing [`crate::broadcast::run_subscription`]'s single
/// `ExtractedLedger -> Vec<T>` projection.
async fn run(
    deps: Arc<BroadcastDeps>,
    start_sequence: u32,
    end_sequence: u32,
    cancel: tokio_util::sync::CancellationToken,
    tx: mpsc::Sender<Result<BalanceEvent, Status>>,
    filter: BalanceFilter,
) {
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
                for event in project(&extracted, &filter) {
                    if !deliver(&tx, event, &cancel).await {
                        deps.metrics.broadcast.subscribers_disconnected_backpressure.increment(1);
                        disconnected = true;
                        break;
                    }
                    deps.metrics.broadcast.events_delivered.increment(1);
                }
                if disconnected {
                    break;
                }
                next += 1;
            }
            Err(crate::error::Error::Cancelled) => break,
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

/// Project one ledger's native-balance and trustline-snapshot rows into
/// balance events matching `filter`. Both streams are already deduplicated
/// to "last observed state per ledger" by L1 (spec §4.2), so this never
/// emits more than one event per `(account, asset)` per ledger.
fn project(extracted: &ExtractedLedger, filter: &BalanceFilter) -> Vec<BalanceEvent> {
    let ledger_sequence = extracted.ledger_header.as_ref().map(|h| h.sequence).unwrap_or(0);
    let closed_at = extracted.ledger_header.as_ref().map(|h| h.meta.closed_at.timestamp()).unwrap_or(0);
    let mut out = Vec::new();

    if filter.asset_code.is_none() && filter.asset_issuer.is_none() {
        for row in &extracted.native_balances {
            if !filter.accounts.is_empty() && !filter.accounts.contains(&row.account_id) {
                continue;
            }
            out.push(BalanceEvent {
                ledger_sequence,
                closed_at,
                account_id: row.account_id.clone(),
                asset_code: "native".to_string(),
                asset_issuer: String::new(),
                balance: row.balance.to_string(),
            });
        }
    }

    for row in &extracted.trustline_snapshots {
        if row.deleted {
            continue;
        }
        if !filter.accounts.is_empty() && !filter.accounts.contains(&row.account_id) {
            continue;
        }
        if let Some(code) = &filter.asset_code {
            if code != &row.asset_code {
                continue;
            }
        }
        if let Some(issuer) = &filter.asset_issuer {
            if issuer != &row.asset_issuer {
                continue;
            }
        }
        out.push(BalanceEvent {
            ledger_sequence,
            closed_at,
            account_id: row.account_id.clone(),
            asset_code: row.asset_code.clone(),
            asset_issuer: row.asset_issuer.clone(),
            balance: row.balance.to_string(),
        });
    }

    out
}

async fn deliver(
    tx: &mpsc::Sender<Result<BalanceEvent, Status>>,
    event: BalanceEvent,
    cancel: &tokio_util::sync::CancellationToken,
) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        result = tokio::time::timeout(SEND_DEADLINE, tx.send(Ok(event))) => {
            matches!(result, Ok(Ok(())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::rows::{LedgerHeaderRow, NativeBalanceRow, RowMeta, TrustlineSnapshotRow};
    use chrono::Utc;

    fn row_meta() -> RowMeta {
        RowMeta::new(100, Utc::now())
    }

    fn ledger_with_balances() -> ExtractedLedger {
        let mut extracted = ExtractedLedger {
            ledger_header: Some(LedgerHeaderRow {
                meta: row_meta(),
                sequence: 100,
                ledger_hash: String::new(),
                previous_ledger_hash: String::new(),
                protocol_version: 21,
                total_coins: 0,
                fee_pool: 0,
                base_fee: 100,
                base_reserve: 5_000_000,
                max_tx_set_size: 100,
                tx_count: 0,
                successful_tx_count: 0,
                failed_tx_count: 0,
                evicted_keys_count: None,
            }),
            ..Default::default()
        };
        extracted.native_balances.push(NativeBalanceRow {
            meta: row_meta(),
            account_id: "GA...A".to_string(),
            balance: 10_000_000,
        });
        extracted.trustline_snapshots.push(TrustlineSnapshotRow {
            meta: row_meta(),
            account_id: "GA...A".to_string(),
            asset_code: "USDC".to_string(),
            asset_issuer: "GB...ISSUER".to_string(),
            balance: 500,
            limit: i64::MAX,
            flags: 1,
            deleted: false,
        });
        extracted
    }

    #[test]
    fn no_asset_filter_returns_native_and_trustline_rows() {
        let extracted = ledger_with_balances();
        let events = project(&extracted, &BalanceFilter::default());
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn asset_filter_excludes_native_balance() {
        let extracted = ledger_with_balances();
        let filter = BalanceFilter {
            accounts: vec![],
            asset_code: Some("USDC".to_string()),
            asset_issuer: None,
        };
        let events = project(&extracted, &filter);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].asset_code, "USDC");
    }

    #[test]
    fn deleted_trustlines_are_skipped() {
        let mut extracted = ledger_with_balances();
        extracted.trustline_snapshots[0].deleted = true;
        let filter = BalanceFilter {
            accounts: vec![],
            asset_code: Some("USDC".to_string()),
            asset_issuer: None,
        };
        assert!(project(&extracted, &filter).is_empty());
    }
}
