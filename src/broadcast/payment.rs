//! `PaymentBroadcaster` (spec §4.5, §6.2): live `payment` operations,
//! filterable by asset and participant account.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};

use crate::broadcast::{run_subscription, BroadcastDeps};
use crate::extract::rows::ExtractedLedger;
use crate::grpc::events::payment_broadcaster_server::PaymentBroadcaster;
use crate::grpc::events::{PaymentEvent, PaymentFilter, SubscribePaymentsRequest};

/// Channel depth for a single subscriber's fan-out queue (spec §5 "a bounded
/// fan-out queue per subscriber").
const SUBSCRIBER_QUEUE_DEPTH: usize = 256;

pub struct PaymentService {
    deps: Arc<BroadcastDeps>,
}

impl PaymentService {
    pub fn new(deps: Arc<BroadcastDeps>) -> Self {
        Self { deps }
    }
}

#[tonic::async_trait]
impl PaymentBroadcaster for PaymentService {
    type SubscribeStream = ReceiverStream<Result<PaymentEvent, Status>>;

    async fn subscribe(
        &self,
        request: Request<SubscribePaymentsRequest>,
    ) -> Result<Response<Self::SubscribeStream>, Status> {
        let req = request.into_inner();
        let cursor = req.cursor.unwrap_or_default();
        let filter = req.filter.unwrap_or_default();

        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE_DEPTH);
        let deps = self.deps.clone();
        let cancel = tokio_util::sync::CancellationToken::new();

        tokio::spawn(run_subscription(
            deps,
            cursor.start_sequence,
            cursor.end_sequence,
            cancel,
            tx,
            move |extracted| project(extracted, &filter),
        ));

        Ok(Response::new(ReceiverStream::new(rx)))
    }
}

/// Project one ledger's operations into `payment` events matching `filter`.
/// Filter evaluation short-circuits on the first failed predicate (spec
/// §4.5).
fn project(extracted: &ExtractedLedger, filter: &PaymentFilter) -> Vec<PaymentEvent> {
    let mut out = Vec::new();
    for (tx_index, tx, ops) in crate::broadcast::operations_by_tx(extracted) {
        for (op_index, op) in ops.iter().enumerate() {
            if op.type_string != "payment" {
                continue;
            }
            if filter.successful_only && !op.successful {
                continue;
            }
            let details = &op.details_json;
            let asset_code = details["asset_code"].as_str().unwrap_or("native").to_string();
            let asset_issuer = details["asset_issuer"].as_str().unwrap_or("").to_string();
            if let Some(want) = &filter.asset_code {
                if want != &asset_code {
                    continue;
                }
            }
            if let Some(want) = &filter.asset_issuer {
                if want != &asset_issuer {
                    continue;
                }
            }
            let from = op.source_account.clone().unwrap_or_else(|| tx.source_account.clone());
            let to = details["destination"].as_str().unwrap_or("").to_string();
            if !filter.accounts.is_empty() && !filter.accounts.contains(&from) && !filter.accounts.contains(&to) {
                continue;
            }
            let amount = details["amount"].as_i64().map(|v| v.to_string()).unwrap_or_default();

            out.push(PaymentEvent {
                ledger_sequence: extracted.ledger_header.as_ref().map(|h| h.sequence).unwrap_or(0),
                closed_at: tx_closed_at(extracted),
                tx_index,
                op_index: op_index as u32,
                tx_hash: tx.tx_hash.clone(),
                from,
                to,
                asset_code,
                asset_issuer,
                amount,
                successful: op.successful,
            });
        }
    }
    out
}

fn tx_closed_at(extracted: &ExtractedLedger) -> i64 {
    extracted.ledger_header.as_ref().map(|h| h.meta.closed_at.timestamp()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::rows::{LedgerHeaderRow, OperationRow, RowMeta, TransactionRow};
    use chrono::Utc;
    use serde_json::json;

    fn row_meta() -> RowMeta {
        RowMeta::new(42, Utc::now())
    }

    fn ledger_with_payment(successful: bool, asset_code: &str) -> ExtractedLedger {
        let mut extracted = ExtractedLedger {
            ledger_header: Some(LedgerHeaderRow {
                meta: row_meta(),
                sequence: 42,
                ledger_hash: String::new(),
                previous_ledger_hash: String::new(),
                protocol_version: 21,
                total_coins: 0,
                fee_pool: 0,
                base_fee: 100,
                base_reserve: 5_000_000,
                max_tx_set_size: 100,
                tx_count: 1,
                successful_tx_count: if successful { 1 } else { 0 },
                failed_tx_count: if successful { 0 } else { 1 },
                evicted_keys_count: None,
            }),
            ..Default::default()
        };
        extracted.transactions.push(TransactionRow {
            meta: row_meta(),
            tx_hash: "txhash".to_string(),
            source_account: "GSOURCE".to_string(),
            fee_charged: 100,
            max_fee: 100,
            sequence_number: 1,
            memo: None,
            successful,
            result_code: "tx_success".to_string(),
            operation_count: 1,
            envelope_xdr: String::new(),
            result_xdr: String::new(),
            tx_meta_xdr: String::new(),
            soroban_resource_fee: None,
            soroban_instructions: None,
            muxed_source_account: None,
        });
        extracted.operations.push(OperationRow {
            meta: row_meta(),
            tx_hash: "txhash".to_string(),
            op_index: 0,
            type_code: 1,
            type_string: "payment",
            source_account: None,
            successful,
            details_json: json!({
                "destination": "GDEST",
                "asset_code": asset_code,
                "asset_issuer": "GISSUER",
                "amount": 500,
            }),
            contract_calls_json: json!([]),
            contracts_involved: vec![],
            max_call_depth: 0,
        });
        extracted
    }

    #[test]
    fn projects_payment_operation() {
        let extracted = ledger_with_payment(true, "USDC");
        let events = project(&extracted, &PaymentFilter::default());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].from, "GSOURCE");
        assert_eq!(events[0].to, "GDEST");
        assert_eq!(events[0].amount, "500");
    }

    #[test]
    fn successful_only_filter_excludes_failed_payment() {
        let extracted = ledger_with_payment(false, "USDC");
        let filter = PaymentFilter { successful_only: true, ..Default::default() };
        assert!(project(&extracted, &filter).is_empty());
    }

    #[test]
    fn asset_code_filter_excludes_mismatched_asset() {
        let extracted = ledger_with_payment(true, "EURC");
        let filter = PaymentFilter { asset_code: Some("USDC".to_string()), ..Default::default() };
        assert!(project(&extracted, &filter).is_empty());
    }

    #[test]
    fn accounts_filter_matches_destination() {
        let extracted = ledger_with_payment(true, "USDC");
        let filter = PaymentFilter { accounts: vec!["GDEST".to_string()], ..Default::default() };
        assert_eq!(project(&extracted, &filter).len(), 1);
    }
}
