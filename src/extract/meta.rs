//! Version-aware `LedgerCloseMeta` accessors (spec §3.2, §4.2 "Ledger
//! Header"). Every extractor dispatches on the same three protocol
//! generations, so the header fields they all need are centralized here
//! rather than re-matched in each per-stream module.

use chrono::{DateTime, Utc};
use stellar_xdr::curr::{LedgerCloseMeta, TransactionMeta};

/// The ledger sequence number, common to all three `LedgerCloseMeta`
/// generations.
pub fn ledger_sequence(meta: &LedgerCloseMeta) -> u32 {
    match meta {
        LedgerCloseMeta::V0(v0) => v0.ledger_header.header.ledger_seq,
        LedgerCloseMeta::V1(v1) => v1.ledger_header.header.ledger_seq,
        LedgerCloseMeta::V2(v2) => v2.ledger_header.header.ledger_seq,
    }
}

/// The ledger's close time, converted from the SCP value's Unix timestamp.
pub fn closed_at(meta: &LedgerCloseMeta) -> DateTime<Utc> {
    let secs = match meta {
        LedgerCloseMeta::V0(v0) => v0.ledger_header.header.scp_value.close_time.0 as i64,
        LedgerCloseMeta::V1(v1) => v1.ledger_header.header.scp_value.close_time.0 as i64,
        LedgerCloseMeta::V2(v2) => v2.ledger_header.header.scp_value.close_time.0 as i64,
    };
    DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
}

/// The ledger protocol version, needed to decide which `TransactionMeta`
/// variants (V3 vs V4) and change-record shapes (V0 ClaimAtom vs later) are
/// expected (spec §3.2, §9).
pub fn protocol_version(meta: &LedgerCloseMeta) -> u32 {
    match meta {
        LedgerCloseMeta::V0(v0) => v0.ledger_header.header.ledger_version,
        LedgerCloseMeta::V1(v1) => v1.ledger_header.header.ledger_version,
        LedgerCloseMeta::V2(v2) => v2.ledger_header.header.ledger_version,
    }
}

/// This ledger's own hash, as recorded in the history entry wrapper (not
/// the header's own fields, which only know the previous ledger's hash).
pub fn ledger_hash(meta: &LedgerCloseMeta) -> [u8; 32] {
    match meta {
        LedgerCloseMeta::V0(v0) => v0.ledger_header.hash.0,
        LedgerCloseMeta::V1(v1) => v1.ledger_header.hash.0,
        LedgerCloseMeta::V2(v2) => v2.ledger_header.hash.0,
    }
}

pub fn previous_ledger_hash(meta: &LedgerCloseMeta) -> [u8; 32] {
    match meta {
        LedgerCloseMeta::V0(v0) => v0.ledger_header.header.previous_ledger_hash.0,
        LedgerCloseMeta::V1(v1) => v1.ledger_header.header.previous_ledger_hash.0,
        LedgerCloseMeta::V2(v2) => v2.ledger_header.header.previous_ledger_hash.0,
    }
}

pub fn total_coins(meta: &LedgerCloseMeta) -> i64 {
    match meta {
        LedgerCloseMeta::V0(v0) => v0.ledger_header.header.total_coins,
        LedgerCloseMeta::V1(v1) => v1.ledger_header.header.total_coins,
        LedgerCloseMeta::V2(v2) => v2.ledger_header.header.total_coins,
    }
}

pub fn fee_pool(meta: &LedgerCloseMeta) -> i64 {
    match meta {
        LedgerCloseMeta::V0(v0) => v0.ledger_header.header.fee_pool,
        LedgerCloseMeta::V1(v1) => v1.ledger_header.header.fee_pool,
        LedgerCloseMeta::V2(v2) => v2.ledger_header.header.fee_pool,
    }
}

pub fn base_fee(meta: &LedgerCloseMeta) -> u32 {
    match meta {
        LedgerCloseMeta::V0(v0) => v0.ledger_header.header.base_fee,
        LedgerCloseMeta::V1(v1) => v1.ledger_header.header.base_fee,
        LedgerCloseMeta::V2(v2) => v2.ledger_header.header.base_fee,
    }
}

pub fn base_reserve(meta: &LedgerCloseMeta) -> u32 {
    match meta {
        LedgerCloseMeta::V0(v0) => v0.ledger_header.header.base_reserve,
        LedgerCloseMeta::V1(v1) => v1.ledger_header.header.base_reserve,
        LedgerCloseMeta::V2(v2) => v2.ledger_header.header.base_reserve,
    }
}

pub fn max_tx_set_size(meta: &LedgerCloseMeta) -> u32 {
    match meta {
        LedgerCloseMeta::V0(v0) => v0.ledger_header.header.max_tx_set_size,
        LedgerCloseMeta::V1(v1) => v1.ledger_header.header.max_tx_set_size,
        LedgerCloseMeta::V2(v2) => v2.ledger_header.header.max_tx_set_size,
    }
}

/// Count of evicted keys recorded directly on the header, where the protocol
/// version provides it (V2 onward). `None` means the generation predates the
/// field, not that nothing was evicted.
pub fn evicted_keys_count(meta: &LedgerCloseMeta) -> Option<u32> {
    match meta {
        LedgerCloseMeta::V2(v2) => Some(v2.evicted_temporary_ledger_keys.len() as u32),
        _ => None,
    }
}

/// Which `TransactionMeta` generation a transaction-result-meta triple
/// carries. V3 has flat per-operation changes and a single Soroban meta; V4
/// (protocol 22+) moves to per-operation meta entries with their own events.
pub fn is_v4(tx_meta: &TransactionMeta) -> bool {
    matches!(tx_meta, TransactionMeta::V4(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stellar_xdr::curr::{
        Hash as XdrHash, LedgerCloseMetaV0, LedgerHeader, LedgerHeaderExt,
        LedgerHeaderHistoryEntry, LedgerHeaderHistoryEntryExt, StellarValue, StellarValueExt,
        TimePoint, TransactionSet, VecM,
    };

    fn dummy_ledger_header(seq: u32, close_time: u64) -> LedgerHeader {
        LedgerHeader {
            ledger_version: 22,
            previous_ledger_hash: XdrHash([1u8; 32]),
            scp_value: StellarValue {
                tx_set_hash: XdrHash([0u8; 32]),
                close_time: TimePoint(close_time),
                upgrades: VecM::default(),
                ext: StellarValueExt::Basic,
            },
            tx_set_result_hash: XdrHash([0u8; 32]),
            bucket_list_hash: XdrHash([0u8; 32]),
            ledger_seq: seq,
            total_coins: 1_000_000_000,
            fee_pool: 42,
            inflation_seq: 0,
            id_pool: 0,
            base_fee: 100,
            base_reserve: 5_000_000,
            max_tx_set_size: 1000,
            skip_list: [
                XdrHash([0u8; 32]),
                XdrHash([0u8; 32]),
                XdrHash([0u8; 32]),
                XdrHash([0u8; 32]),
            ],
            ext: LedgerHeaderExt::V0,
        }
    }

    fn dummy_v0(seq: u32) -> LedgerCloseMeta {
        LedgerCloseMeta::V0(LedgerCloseMetaV0 {
            ledger_header: LedgerHeaderHistoryEntry {
                hash: XdrHash([0u8; 32]),
                header: dummy_ledger_header(seq, 1_700_000_000),
                ext: LedgerHeaderHistoryEntryExt::V0,
            },
            tx_set: TransactionSet {
                previous_ledger_hash: XdrHash([2u8; 32]),
                txs: VecM::default(),
            },
            tx_processing: VecM::default(),
            upgrades_processing: VecM::default(),
            scp_info: VecM::default(),
        })
    }

    #[test]
    fn reads_sequence_and_close_time_from_v0() {
        let meta = dummy_v0(12345);
        assert_eq!(ledger_sequence(&meta), 12345);
        assert_eq!(closed_at(&meta).timestamp(), 1_700_000_000);
        assert_eq!(protocol_version(&meta), 22);
    }

    #[test]
    fn v0_has_no_evicted_keys_field() {
        let meta = dummy_v0(1);
        assert_eq!(evicted_keys_count(&meta), None);
    }
}
