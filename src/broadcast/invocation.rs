//! `InvocationBroadcaster` (spec §4.5, §6.2): live Soroban contract
//! invocations, filterable by contract id, function name (with wildcard
//! patterns), argument count, required diagnostic-event topics, and whether
//! the invocation produced state changes or sub-calls.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};

use crate::broadcast::{run_subscription, wildcard, BroadcastDeps};
use crate::extract::rows::ExtractedLedger;
use crate::grpc::events::invocation_broadcaster_server::InvocationBroadcaster;
use crate::grpc::events::{
    ContractCallEdge, InvocationEvent, InvocationFilter, SubscribeInvocationsRequest,
};

const SUBSCRIBER_QUEUE_DEPTH: usize = 256;

pub struct InvocationService {
    deps: Arc<BroadcastDeps>,
}

impl InvocationService {
    pub fn new(deps: Arc<BroadcastDeps>) -> Self {
        Self { deps }
    }
}

#[tonic::async_trait]
impl InvocationBroadcaster for InvocationService {
    type SubscribeStream = ReceiverStream<Result<InvocationEvent, Status>>;

    async fn subscribe(
        &self,
        request: Request<SubscribeInvocationsRequest>,
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

/// Project one ledger's `invoke_host_function` operations into invocation
/// events matching `filter`. Filter evaluation short-circuits on the first
/// failed predicate (spec §4.5).
fn project(extracted: &ExtractedLedger, filter: &InvocationFilter) -> Vec<InvocationEvent> {
    let mut out = Vec::new();
    for (tx_index, tx, ops) in crate::broadcast::operations_by_tx(extracted) {
        for (op_index, op) in ops.iter().enumerate() {
            if op.type_string != "invoke_host_function" {
                continue;
            }
            if op.details_json.get("kind").and_then(|v| v.as_str()) != Some("invoke_contract") {
                continue;
            }
            if filter.successful_only && !op.successful {
                continue;
            }

            let contract_id = op.details_json["contract_id"].as_str().unwrap_or("").to_string();
            if !filter.contract_ids.is_empty() && !filter.contract_ids.contains(&contract_id) {
                continue;
            }

            let function_name = op.details_json["function_name"].as_str().unwrap_or("").to_string();
            if !filter.function_names.is_empty()
                && !filter.function_names.iter().any(|pattern| wildcard::matches(pattern, &function_name))
            {
                continue;
            }

            let args = op.details_json["args"].as_array().cloned().unwrap_or_default();
            if filter.min_args > 0 && (args.len() as u32) < filter.min_args {
                continue;
            }
            if filter.max_args > 0 && (args.len() as u32) > filter.max_args {
                continue;
            }

            if !filter.required_topics.is_empty() {
                let has_all = filter.required_topics.iter().all(|topic| {
                    extracted
                        .contract_events
                        .iter()
                        .any(|e| e.tx_hash == tx.tx_hash && topic_contains(&e.topics_json, topic))
                });
                if !has_all {
                    continue;
                }
            }

            if filter.require_state_changes {
                let touched = extracted.contract_data.iter().any(|row| row.contract_id == contract_id)
                    || extracted.ttls.iter().any(|row| row.meta.ledger_sequence == tx.meta.ledger_sequence);
                if !touched {
                    continue;
                }
            }

            if filter.require_sub_calls && op.max_call_depth == 0 {
                continue;
            }

            let call_graph: Vec<ContractCallEdge> = op
                .contract_calls_json
                .as_array()
                .into_iter()
                .flatten()
                .map(edge_from_json)
                .collect();

            out.push(InvocationEvent {
                ledger_sequence: extracted.ledger_header.as_ref().map(|h| h.sequence).unwrap_or(0),
                closed_at: tx.meta.closed_at.timestamp(),
                tx_index,
                op_index: op_index as u32,
                tx_hash: tx.tx_hash.clone(),
                contract_id,
                function_name,
                args_json: serde_json::Value::Array(args).to_string(),
                call_graph,
                successful: op.successful,
            });
        }
    }
    out
}

fn topic_contains(topics_json: &serde_json::Value, needle: &str) -> bool {
    topics_json
        .as_array()
        .map(|arr| arr.iter().any(|v| v.as_str() == Some(needle)))
        .unwrap_or(false)
}

fn edge_from_json(v: &serde_json::Value) -> ContractCallEdge {
    ContractCallEdge {
        from: v["from"].as_str().unwrap_or_default().to_string(),
        to: v["to"].as_str().unwrap_or_default().to_string(),
        function: v["function"].as_str().unwrap_or_default().to_string(),
        depth: v["depth"].as_u64().unwrap_or(0) as u32,
        order: v["order"].as_u64().unwrap_or(0) as u32,
        successful: v["successful"].as_bool().unwrap_or(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_contains_matches_string_entries() {
        let topics = serde_json::json!(["transfer", "USDC"]);
        assert!(topic_contains(&topics, "transfer"));
        assert!(!topic_contains(&topics, "mint"));
    }

    #[test]
    fn edge_from_json_round_trips_fields() {
        let v = serde_json::json!({"from": "A", "to": "B", "function": "swap", "depth": 2, "order": 1, "successful": false});
        let edge = edge_from_json(&v);
        assert_eq!(edge.from, "A");
        assert_eq!(edge.depth, 2);
        assert!(!edge.successful);
    }
}
