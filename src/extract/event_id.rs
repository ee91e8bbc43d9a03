//! Contract event identifiers (spec §3.1 "contract_event.event_id", §4.2).
//!
//! An event ID encodes enough of its own position (ledger, execution phase,
//! tx index, operation index, event index) that sorting by ID also sorts by
//! execution order. `TransactionMeta::V4` enumerates events per-operation
//! with the event index reset to zero for each operation, so the operation
//! index has to be part of the identity or two operations in the same
//! transaction collide on their first event. The internal form is a
//! fixed-width decimal string, kept human-legible for logs and SQL
//! `ORDER BY`; the opaque form is what cursors and the broadcaster wire
//! formats hand to callers, so they can't depend on its internal layout.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

/// Execution phase of a contract event within a ledger. Ordering matches
/// execution order: ledger-wide setup events, then per-operation events,
/// then per-transaction wrap-up events, then ledger-wide teardown events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventPhase {
    BeforeAllTxs,
    Operation,
    AfterTx,
    AfterAllTxs,
}

impl EventPhase {
    fn as_phase_sub(&self) -> (u8, u8) {
        match self {
            EventPhase::BeforeAllTxs => (0, 0),
            EventPhase::Operation => (1, 0),
            EventPhase::AfterTx => (1, 1),
            EventPhase::AfterAllTxs => (2, 0),
        }
    }

    fn from_phase_sub(phase: u8, sub: u8) -> Option<Self> {
        match (phase, sub) {
            (0, 0) => Some(EventPhase::BeforeAllTxs),
            (1, 0) => Some(EventPhase::Operation),
            (1, 1) => Some(EventPhase::AfterTx),
            (2, 0) => Some(EventPhase::AfterAllTxs),
            _ => None,
        }
    }
}

/// Build the internal, order-preserving event ID.
pub fn event_id(
    ledger_sequence: u32,
    phase: EventPhase,
    tx_index: u32,
    op_index: u32,
    event_index: u32,
) -> String {
    let (p, sub) = phase.as_phase_sub();
    format!(
        "evt_{:010}_{:01}_{:04}_{:01}_{:04}_{:04}",
        ledger_sequence, p, tx_index, sub, op_index, event_index
    )
}

pub fn parse_event_id(id: &str) -> Option<(u32, EventPhase, u32, u32, u32)> {
    let parts: Vec<&str> = id.strip_prefix("evt_")?.split('_').collect();
    if parts.len() != 6 {
        return None;
    }
    let ledger_sequence: u32 = parts[0].parse().ok()?;
    let phase: u8 = parts[1].parse().ok()?;
    let tx_index: u32 = parts[2].parse().ok()?;
    let sub: u8 = parts[3].parse().ok()?;
    let op_index: u32 = parts[4].parse().ok()?;
    let event_index: u32 = parts[5].parse().ok()?;
    let phase = EventPhase::from_phase_sub(phase, sub)?;
    Some((ledger_sequence, phase, tx_index, op_index, event_index))
}

const XOR_KEY: [u8; 18] = [
    0xa3, 0x7b, 0x1c, 0xf0, 0x5e, 0xd2, 0x94, 0x68, 0x0b, 0xe7, 0x3f, 0x81, 0xc6, 0x4d, 0x52, 0x9a,
    0x17, 0x2e,
];

/// Encode an event's position as an opaque, URL-safe external ID. Internal
/// callers never need to decode this; it exists so that broadcaster
/// subscribers and the event cursor never see the internal string layout.
pub fn encode_external_id(
    ledger_sequence: u32,
    phase: EventPhase,
    tx_index: u32,
    op_index: u32,
    event_index: u32,
) -> String {
    let (p, sub) = phase.as_phase_sub();
    let mut buf = [0u8; 18];
    buf[0..4].copy_from_slice(&ledger_sequence.to_be_bytes());
    buf[4] = p;
    buf[5..9].copy_from_slice(&tx_index.to_be_bytes());
    buf[9] = sub;
    buf[10..14].copy_from_slice(&op_index.to_be_bytes());
    buf[14..18].copy_from_slice(&event_index.to_be_bytes());
    for (b, k) in buf.iter_mut().zip(XOR_KEY.iter()) {
        *b ^= k;
    }
    format!("evt_{}", URL_SAFE_NO_PAD.encode(buf))
}

pub fn decode_external_id(id: &str) -> Option<(u32, EventPhase, u32, u32, u32)> {
    let payload = id.strip_prefix("evt_")?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    if bytes.len() != 18 {
        return None;
    }
    let mut buf = [0u8; 18];
    buf.copy_from_slice(&bytes);
    for (b, k) in buf.iter_mut().zip(XOR_KEY.iter()) {
        *b ^= k;
    }
    let ledger_sequence = u32::from_be_bytes(buf[0..4].try_into().ok()?);
    let phase = buf[4];
    let tx_index = u32::from_be_bytes(buf[5..9].try_into().ok()?);
    let sub = buf[9];
    let op_index = u32::from_be_bytes(buf[10..14].try_into().ok()?);
    let event_index = u32::from_be_bytes(buf[14..18].try_into().ok()?);
    let phase = EventPhase::from_phase_sub(phase, sub)?;
    Some((ledger_sequence, phase, tx_index, op_index, event_index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_id_roundtrips() {
        let id = event_id(58_000_000, EventPhase::Operation, 3, 2, 7);
        assert_eq!(id, "evt_0058000000_1_0003_0_0002_0007");
        let (seq, phase, tx, op, evt) = parse_event_id(&id).unwrap();
        assert_eq!(seq, 58_000_000);
        assert_eq!(phase, EventPhase::Operation);
        assert_eq!(tx, 3);
        assert_eq!(op, 2);
        assert_eq!(evt, 7);
    }

    #[test]
    fn distinct_operations_in_the_same_transaction_do_not_collide() {
        let first_op = event_id(100, EventPhase::Operation, 0, 0, 0);
        let second_op = event_id(100, EventPhase::Operation, 0, 1, 0);
        assert_ne!(first_op, second_op);
    }

    #[test]
    fn phases_sort_in_execution_order() {
        let before = event_id(100, EventPhase::BeforeAllTxs, 0, 0, 0);
        let op = event_id(100, EventPhase::Operation, 0, 0, 0);
        let after_tx = event_id(100, EventPhase::AfterTx, 0, 0, 0);
        let after_all = event_id(100, EventPhase::AfterAllTxs, 0, 0, 0);
        assert!(before < op && op < after_tx && after_tx < after_all);
    }

    #[test]
    fn external_id_is_url_safe_and_roundtrips() {
        let external = encode_external_id(58_000_000, EventPhase::AfterTx, 3, 2, 7);
        assert!(external.starts_with("evt_"));
        let payload = external.strip_prefix("evt_").unwrap();
        assert!(payload
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        let (seq, phase, tx, op, evt) = decode_external_id(&external).unwrap();
        assert_eq!((seq, phase, tx, op, evt), (58_000_000, EventPhase::AfterTx, 3, 2, 7));
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(parse_event_id("invalid").is_none());
        assert!(parse_event_id("evt_1_2").is_none());
        assert!(decode_external_id("evt_!!!").is_none());
        assert!(decode_external_id("evt_AAAA").is_none());
    }
}
