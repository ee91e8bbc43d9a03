//! Contract-to-contract call graph, recovered from diagnostic event topics
//! (spec §4.2 "operation.contract_calls_json"). Soroban emits a `fn_call`
//! diagnostic event when a contract invokes another and a matching
//! `fn_return` when control comes back; we pair them up by call depth to
//! reconstruct the graph without needing the host's own call stack.

use serde_json::{json, Value};
use stellar_xdr::curr::{ContractEvent, ContractEventBody, ContractEventType, ScVal};

use crate::extract::scval_json::scval_to_json;
use crate::extract::strkey_util;

/// One edge in the call graph: `from` called `to`'s `function`, nested at
/// `depth` calls deep (0 = the top-level operation's own contract).
/// `order` is the edge's position among the operation's calls in emission
/// order; `successful` mirrors the owning operation's overall result, since
/// `fn_call`/`fn_return` topics carry no per-call outcome of their own
/// (spec §4.2 "an ordered list of `{from, to, function, depth, order,
/// successful}`").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallEdge {
    pub from: Option<String>,
    pub to: String,
    pub function: String,
    pub depth: u32,
    pub order: u32,
    pub successful: bool,
}

/// Walk `events` (an operation's diagnostic events, in emission order) and
/// recover the call graph as a flat, deduplicated edge list. Each edge
/// records its own depth rather than nesting as a tree, so downstream
/// consumers can serialize it without shared pointers (spec §4.2 "flat array
/// with parent indices").
pub fn extract_call_graph(events: &[ContractEvent]) -> Vec<CallEdge> {
    let mut stack: Vec<String> = Vec::new();
    let mut edges: Vec<CallEdge> = Vec::new();
    let mut seen = std::collections::HashSet::new();
    let mut order = 0u32;

    for event in events {
        if event.type_ != ContractEventType::Diagnostic {
            continue;
        }
        let ContractEventBody::V0(body) = &event.body;
        let Some(topic0) = body.topics.first() else {
            continue;
        };
        let Some(topic_name) = symbol_str(topic0) else {
            continue;
        };

        match topic_name.as_str() {
            "fn_call" => {
                let Some(to) = body
                    .topics
                    .get(1)
                    .and_then(contract_id_from_scval)
                else {
                    continue;
                };
                let function = body
                    .topics
                    .get(2)
                    .and_then(symbol_str)
                    .unwrap_or_else(|| "unknown".to_string());
                let depth = stack.len() as u32;
                let from = stack.last().cloned();
                let key = (from.clone(), to.clone(), function.clone(), depth);
                if seen.insert(key) {
                    edges.push(CallEdge {
                        from,
                        to: to.clone(),
                        function,
                        depth,
                        order,
                        successful: true,
                    });
                    order += 1;
                }
                stack.push(to);
            }
            "fn_return" => {
                stack.pop();
            }
            _ => {}
        }
    }

    edges
}

/// Stamp every edge with the owning operation's overall result. Diagnostic
/// events carry no per-call outcome, so every edge from the same operation
/// shares its operation's `successful` flag.
pub fn with_outcome(edges: Vec<CallEdge>, successful: bool) -> Vec<CallEdge> {
    edges.into_iter().map(|e| CallEdge { successful, ..e }).collect()
}

pub fn max_depth(edges: &[CallEdge]) -> u32 {
    edges.iter().map(|e| e.depth).max().unwrap_or(0)
}

pub fn contracts_involved(edges: &[CallEdge]) -> Vec<String> {
    let mut set: Vec<String> = Vec::new();
    for edge in edges {
        if let Some(from) = &edge.from {
            if !set.contains(from) {
                set.push(from.clone());
            }
        }
        if !set.contains(&edge.to) {
            set.push(edge.to.clone());
        }
    }
    set
}

pub fn edges_to_json(edges: &[CallEdge]) -> Value {
    Value::Array(
        edges
            .iter()
            .map(|e| {
                json!({
                    "from": e.from,
                    "to": e.to,
                    "function": e.function,
                    "depth": e.depth,
                    "order": e.order,
                    "successful": e.successful,
                })
            })
            .collect(),
    )
}

fn symbol_str(val: &ScVal) -> Option<String> {
    match val {
        ScVal::Symbol(s) => Some(s.to_utf8_string_lossy()),
        ScVal::String(s) => Some(s.to_utf8_string_lossy()),
        _ => None,
    }
}

fn contract_id_from_scval(val: &ScVal) -> Option<String> {
    match val {
        ScVal::Address(stellar_xdr::curr::ScAddress::Contract(hash)) => {
            Some(strkey_util::contract_id_to_strkey(hash))
        }
        ScVal::Bytes(bytes) if bytes.len() == 32 => {
            let hash = stellar_xdr::curr::Hash(bytes.as_slice().try_into().ok()?);
            Some(strkey_util::contract_id_to_strkey(&hash))
        }
        other => {
            let rendered = scval_to_json(other);
            rendered.as_str().map(str::to_string)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stellar_xdr::curr::{ContractEventBodyV0, ContractEventType, ExtensionPoint, ScSymbol, StringM, VecM};

    fn diagnostic_event(topics: Vec<ScVal>) -> ContractEvent {
        ContractEvent {
            ext: ExtensionPoint::V0,
            contract_id: None,
            type_: ContractEventType::Diagnostic,
            body: ContractEventBody::V0(ContractEventBodyV0 {
                topics: VecM::try_from(topics).unwrap(),
                data: ScVal::Void,
            }),
        }
    }

    fn symbol(s: &str) -> ScVal {
        ScVal::Symbol(ScSymbol(StringM::try_from(s).unwrap()))
    }

    #[test]
    fn single_call_produces_one_edge_at_depth_zero() {
        let contract_hash = stellar_xdr::curr::Hash([4u8; 32]);
        let events = vec![
            diagnostic_event(vec![
                symbol("fn_call"),
                ScVal::Address(stellar_xdr::curr::ScAddress::Contract(contract_hash)),
                symbol("transfer"),
            ]),
            diagnostic_event(vec![symbol("fn_return")]),
        ];
        let edges = extract_call_graph(&events);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].depth, 0);
        assert_eq!(edges[0].from, None);
        assert_eq!(edges[0].function, "transfer");
    }

    #[test]
    fn nested_calls_increase_depth() {
        let a = stellar_xdr::curr::Hash([1u8; 32]);
        let b = stellar_xdr::curr::Hash([2u8; 32]);
        let events = vec![
            diagnostic_event(vec![
                symbol("fn_call"),
                ScVal::Address(stellar_xdr::curr::ScAddress::Contract(a)),
                symbol("outer"),
            ]),
            diagnostic_event(vec![
                symbol("fn_call"),
                ScVal::Address(stellar_xdr::curr::ScAddress::Contract(b)),
                symbol("inner"),
            ]),
            diagnostic_event(vec![symbol("fn_return")]),
            diagnostic_event(vec![symbol("fn_return")]),
        ];
        let edges = extract_call_graph(&events);
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].depth, 0);
        assert_eq!(edges[1].depth, 1);
        assert_eq!(max_depth(&edges), 1);
    }

    #[test]
    fn non_diagnostic_events_are_ignored() {
        let mut event = diagnostic_event(vec![symbol("fn_call")]);
        event.type_ = ContractEventType::Contract;
        assert!(extract_call_graph(&[event]).is_empty());
    }
}
