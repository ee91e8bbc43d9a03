//! L1 Extractor Set: turns one ledger's `LedgerCloseMeta` into the nineteen
//! typed row streams of [`rows`] (spec §4.2).
//!
//! Extraction never fails the whole ledger because of one bad row: a row
//! that can't be parsed is logged and skipped ([`crate::error::Error::RowParse`]),
//! the rest of the ledger still gets extracted and handed to L2.

pub mod call_graph;
pub mod changes;
pub mod dedup;
pub mod event_id;
pub mod ledger_header;
pub mod meta;
pub mod rows;
pub mod sac;
pub mod scval_json;
pub mod strkey_util;
pub mod transaction;
pub mod wasm;

use sha2::{Digest, Sha256};
use stellar_xdr::curr::LedgerCloseMeta;
use tracing::warn;

use crate::extract::rows::{EvictedKeyRow, ExtractedLedger};

/// Extract every row stream from a single closed ledger. `network_passphrase`
/// is needed only for SAC detection in [`changes`].
pub fn extract_ledger(meta: &LedgerCloseMeta, network_passphrase: &str) -> ExtractedLedger {
    let ledger_sequence = self::meta::ledger_sequence(meta);
    let closed_at = self::meta::closed_at(meta);
    let row_meta = rows::RowMeta::new(ledger_sequence, closed_at);

    let mut extracted = ExtractedLedger {
        ledger_header: Some(ledger_header::extract(meta, &row_meta)),
        ..Default::default()
    };

    let tx_processing = transaction::tx_processing_entries(meta);
    let envelopes = transaction::tx_envelopes(meta);
    let mut sac_assets = changes::SacAssetCache::new();
    for (tx_index, entry) in tx_processing.iter().enumerate() {
        let envelope = envelopes.get(tx_index);
        match transaction::extract_transaction(entry, envelope, tx_index as u32, &row_meta) {
            Ok(bundle) => {
                extracted.transactions.push(bundle.transaction);
                extracted.operations.extend(bundle.operations);
                extracted.effects.extend(bundle.effects);
                extracted.trades.extend(bundle.trades);
                extracted.contract_events.extend(bundle.contract_events);
            }
            Err(e) => warn!(ledger_sequence, tx_index, error = %e, "skipping transaction row"),
        }
        match changes::extract_changes(entry, envelope, &row_meta, network_passphrase, &mut sac_assets) {
            Ok(changes) => changes.merge_into(&mut extracted),
            Err(e) => warn!(ledger_sequence, tx_index, error = %e, "skipping change-derived rows"),
        }
    }

    if let LedgerCloseMeta::V2(v2) = meta {
        for key in v2.evicted_temporary_ledger_keys.iter() {
            let key_xdr = serde_json::to_string(key).unwrap_or_default();
            let key_hash = hex::encode(Sha256::digest(key_xdr.as_bytes()));
            extracted.evicted_keys.push(EvictedKeyRow {
                meta: row_meta.clone(),
                key_hash,
                key_xdr,
            });
        }
    }

    dedup_in_place(&mut extracted);
    extracted
}

/// Apply the natural-key dedup policy (spec §4.2) to every stream that
/// carries one. Streams with no natural key (transactions, operations,
/// effects, trades, contract events) are append-only and untouched.
fn dedup_in_place(extracted: &mut ExtractedLedger) {
    extracted.account_snapshots = dedup::dedup_last_by(
        std::mem::take(&mut extracted.account_snapshots),
        |r| r.account_id.clone(),
    );
    extracted.trustline_snapshots = dedup::dedup_last_by(
        std::mem::take(&mut extracted.trustline_snapshots),
        |r| (r.account_id.clone(), r.asset_code.clone(), r.asset_issuer.clone()),
    );
    extracted.native_balances = dedup::dedup_last_by(
        std::mem::take(&mut extracted.native_balances),
        |r| r.account_id.clone(),
    );
    extracted.account_signers = dedup::dedup_last_by(
        std::mem::take(&mut extracted.account_signers),
        |r| (r.account_id.clone(), r.signer_key.clone()),
    );
    extracted.offers = dedup::dedup_last_by(std::mem::take(&mut extracted.offers), |r| r.offer_id);
    extracted.liquidity_pools = dedup::dedup_last_by(
        std::mem::take(&mut extracted.liquidity_pools),
        |r| r.pool_id.clone(),
    );
    extracted.claimable_balances = dedup::dedup_last_by(
        std::mem::take(&mut extracted.claimable_balances),
        |r| r.balance_id.clone(),
    );
    extracted.contract_data = dedup::dedup_last_by(
        std::mem::take(&mut extracted.contract_data),
        |r| (r.contract_id.clone(), r.key_hash.clone()),
    );
    extracted.contract_code = dedup::dedup_last_by(
        std::mem::take(&mut extracted.contract_code),
        |r| r.code_hash.clone(),
    );
    extracted.config_settings = dedup::dedup_last_by(
        std::mem::take(&mut extracted.config_settings),
        |r| r.setting_id.clone(),
    );
    extracted.ttls = dedup::dedup_last_by(std::mem::take(&mut extracted.ttls), |r| r.key_hash.clone());
    extracted.restored_keys = dedup::dedup_last_by(
        std::mem::take(&mut extracted.restored_keys),
        |r| r.key_hash.clone(),
    );
}
