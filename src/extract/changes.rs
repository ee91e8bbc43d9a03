//! Ledger-entry-change-derived row streams (spec §4.2): account/trustline/
//! offer/pool/claimable-balance/contract snapshots, plus config settings and
//! TTL bumps. Every one of these is a before/after pair recovered from a
//! `LedgerEntryChanges` list rather than from the transaction's own
//! operations, because that's the only place the ledger records the actual
//! resulting state (as opposed to the requested one).

use std::collections::HashMap;

use stellar_xdr::curr::{
    ContractDataDurability, LedgerEntryChange, LedgerEntryChanges, LedgerEntryData, LedgerKey,
    Limits, OperationBody, ScAddress, ScVal, TransactionEnvelope, TransactionExt, TransactionMeta,
    TransactionResultMeta, WriteXdr,
};

use crate::error::Result;
use crate::extract::rows::{
    AccountSignerRow, AccountSnapshotRow, ClaimableBalanceRow, ConfigSettingRow, ContractCodeRow,
    ContractDataRow, ExtractedLedger, LiquidityPoolRow, NativeBalanceRow, OfferRow, RestoredKeyRow,
    RowMeta, TrustlineSnapshotRow, TtlRow,
};
use crate::extract::sac::{self, ClassicAsset};
use crate::extract::strkey_util;
use crate::extract::transaction::inner_v1_envelope;
use crate::extract::wasm;

/// Contract IDs recognized as SACs earlier in this ledger, keyed by strkey.
/// A SAC's instance storage carries its wrapped-asset identity, but its
/// per-holder balance entries don't - they only become attributable to an
/// asset once the instance entry for the same contract has been seen, so
/// this cache is threaded across every transaction in a ledger rather than
/// reset per transaction.
pub type SacAssetCache = HashMap<String, ClassicAsset>;

#[derive(Default)]
pub struct ChangeBundle {
    pub account_snapshots: Vec<AccountSnapshotRow>,
    pub trustline_snapshots: Vec<TrustlineSnapshotRow>,
    pub native_balances: Vec<NativeBalanceRow>,
    pub account_signers: Vec<AccountSignerRow>,
    pub offers: Vec<OfferRow>,
    pub liquidity_pools: Vec<LiquidityPoolRow>,
    pub claimable_balances: Vec<ClaimableBalanceRow>,
    pub contract_data: Vec<ContractDataRow>,
    pub contract_code: Vec<ContractCodeRow>,
    pub config_settings: Vec<ConfigSettingRow>,
    pub ttls: Vec<TtlRow>,
    pub restored_keys: Vec<RestoredKeyRow>,
}

impl ChangeBundle {
    pub fn merge_into(self, extracted: &mut ExtractedLedger) {
        extracted.account_snapshots.extend(self.account_snapshots);
        extracted.trustline_snapshots.extend(self.trustline_snapshots);
        extracted.native_balances.extend(self.native_balances);
        extracted.account_signers.extend(self.account_signers);
        extracted.offers.extend(self.offers);
        extracted.liquidity_pools.extend(self.liquidity_pools);
        extracted.claimable_balances.extend(self.claimable_balances);
        extracted.contract_data.extend(self.contract_data);
        extracted.contract_code.extend(self.contract_code);
        extracted.config_settings.extend(self.config_settings);
        extracted.ttls.extend(self.ttls);
        extracted.restored_keys.extend(self.restored_keys);
    }
}

pub fn extract_changes(
    entry: &TransactionResultMeta,
    envelope: Option<&TransactionEnvelope>,
    row_meta: &RowMeta,
    network_passphrase: &str,
    sac_assets: &mut SacAssetCache,
) -> Result<ChangeBundle> {
    let mut bundle = ChangeBundle::default();

    apply_changes(&entry.fee_processing, row_meta, network_passphrase, sac_assets, &mut bundle);

    match &entry.tx_apply_processing {
        TransactionMeta::V3(v3) => {
            apply_changes(&v3.tx_changes_before, row_meta, network_passphrase, sac_assets, &mut bundle);
            for op in v3.operations.iter() {
                apply_changes(&op.changes, row_meta, network_passphrase, sac_assets, &mut bundle);
            }
            apply_changes(&v3.tx_changes_after, row_meta, network_passphrase, sac_assets, &mut bundle);
        }
        TransactionMeta::V4(v4) => {
            apply_changes(&v4.tx_changes_before, row_meta, network_passphrase, sac_assets, &mut bundle);
            for op in v4.operations.iter() {
                apply_changes(&op.changes, row_meta, network_passphrase, sac_assets, &mut bundle);
            }
            apply_changes(&v4.tx_changes_after, row_meta, network_passphrase, sac_assets, &mut bundle);
        }
        _ => {}
    }

    bundle.restored_keys = restored_keys_from_envelope(envelope, row_meta);

    Ok(bundle)
}

/// Walk the transaction envelope's Soroban footprint and emit one
/// `RestoredKeyRow` per `readWrite` key, for transactions that include a
/// `RestoreFootprint` operation (spec §4.2 "RestoreFootprint parsing").
/// `restored_from_ledger` is left unset here: a single-ledger, stateless
/// extractor has no memory of which ledger last evicted a given key, so
/// resolving it is left to whatever downstream step can join against the
/// `evicted_keys` stream by `key_hash`.
fn restored_keys_from_envelope(
    envelope: Option<&TransactionEnvelope>,
    row_meta: &RowMeta,
) -> Vec<RestoredKeyRow> {
    use sha2::{Digest, Sha256};

    let Some(tx1) = envelope.and_then(inner_v1_envelope) else {
        return Vec::new();
    };
    let has_restore_op = tx1
        .tx
        .operations
        .iter()
        .any(|op| matches!(op.body, OperationBody::RestoreFootprint(_)));
    if !has_restore_op {
        return Vec::new();
    }
    let TransactionExt::V1(soroban_data) = &tx1.tx.ext else {
        return Vec::new();
    };

    soroban_data
        .resources
        .footprint
        .read_write
        .iter()
        .filter_map(|key| {
            let xdr_bytes = key.to_xdr(Limits::none()).ok()?;
            Some(RestoredKeyRow {
                meta: row_meta.clone(),
                key_hash: hex::encode(Sha256::digest(&xdr_bytes)),
                restored_from_ledger: None,
            })
        })
        .collect()
}

fn apply_changes(
    changes: &LedgerEntryChanges,
    row_meta: &RowMeta,
    network_passphrase: &str,
    sac_assets: &mut SacAssetCache,
    bundle: &mut ChangeBundle,
) {
    for change in changes.iter() {
        match change {
            LedgerEntryChange::Created(entry) | LedgerEntryChange::Updated(entry) | LedgerEntryChange::State(entry) => {
                apply_live_entry(&entry.data, row_meta, network_passphrase, sac_assets, bundle)
            }
            LedgerEntryChange::Removed(key) => apply_removed_key(key, row_meta, bundle),
        }
    }
}

fn apply_live_entry(
    data: &LedgerEntryData,
    row_meta: &RowMeta,
    network_passphrase: &str,
    sac_assets: &mut SacAssetCache,
    bundle: &mut ChangeBundle,
) {
    match data {
        LedgerEntryData::Account(account) => {
            let account_id = strkey_util::account_id_to_strkey(&account.account_id);
            bundle.account_snapshots.push(AccountSnapshotRow {
                meta: row_meta.clone(),
                account_id: account_id.clone(),
                balance: account.balance,
                sequence_number: account.seq_num.0,
                num_subentries: account.num_sub_entries,
                inflation_dest: account
                    .inflation_dest
                    .as_ref()
                    .map(strkey_util::account_id_to_strkey),
                home_domain: Some(account.home_domain.to_string()),
                master_weight: account.thresholds.0[0] as u32,
                threshold_low: account.thresholds.0[1] as u32,
                threshold_medium: account.thresholds.0[2] as u32,
                threshold_high: account.thresholds.0[3] as u32,
                deleted: false,
            });
            bundle.native_balances.push(NativeBalanceRow {
                meta: row_meta.clone(),
                account_id: account_id.clone(),
                balance: account.balance,
            });
            for signer in account.signers.iter() {
                bundle.account_signers.push(AccountSignerRow {
                    meta: row_meta.clone(),
                    account_id: account_id.clone(),
                    signer_key: format!("{:?}", signer.key),
                    weight: signer.weight,
                    deleted: false,
                });
            }
        }
        LedgerEntryData::Trustline(trustline) => {
            let (asset_code, asset_issuer) = asset_code_issuer(&trustline.asset);
            bundle.trustline_snapshots.push(TrustlineSnapshotRow {
                meta: row_meta.clone(),
                account_id: strkey_util::account_id_to_strkey(&trustline.account_id),
                asset_code,
                asset_issuer,
                balance: trustline.balance,
                limit: trustline.limit,
                flags: trustline.flags,
                deleted: false,
            });
        }
        LedgerEntryData::Offer(offer) => {
            let (selling_code, selling_issuer) = asset_code_issuer(&offer.selling);
            let (buying_code, buying_issuer) = asset_code_issuer(&offer.buying);
            bundle.offers.push(OfferRow {
                meta: row_meta.clone(),
                offer_id: offer.offer_id,
                seller_id: strkey_util::account_id_to_strkey(&offer.seller_id),
                selling_asset_code: selling_code,
                selling_asset_issuer: selling_issuer,
                buying_asset_code: buying_code,
                buying_asset_issuer: buying_issuer,
                amount: offer.amount,
                price_n: offer.price.n,
                price_d: offer.price.d,
                flags: offer.flags,
                deleted: false,
            });
        }
        LedgerEntryData::LiquidityPool(pool) => {
            let stellar_xdr::curr::LiquidityPoolEntryBody::LiquidityPoolConstantProduct(body) =
                &pool.body;
            let (a_code, a_issuer) = asset_code_issuer(&body.params.asset_a);
            let (b_code, b_issuer) = asset_code_issuer(&body.params.asset_b);
            bundle.liquidity_pools.push(LiquidityPoolRow {
                meta: row_meta.clone(),
                pool_id: hex::encode(pool.liquidity_pool_id.0),
                asset_a_code: a_code,
                asset_a_issuer: a_issuer,
                asset_b_code: b_code,
                asset_b_issuer: b_issuer,
                reserve_a: body.reserve_a,
                reserve_b: body.reserve_b,
                total_pool_shares: body.total_pool_shares,
                pool_shares_trust_line_count: body.pool_shares_trust_line_count,
                fee_bp: body.params.fee as u32,
                deleted: false,
            });
        }
        LedgerEntryData::ClaimableBalance(cb) => {
            let (code, issuer) = asset_code_issuer(&cb.asset);
            bundle.claimable_balances.push(ClaimableBalanceRow {
                meta: row_meta.clone(),
                balance_id: hex::encode(claimable_balance_id_bytes(&cb.balance_id)),
                asset_code: code,
                asset_issuer: issuer,
                amount: cb.amount,
                sponsor: None,
                claimants_json: serde_json::to_value(&cb.claimants).unwrap_or(serde_json::Value::Null),
                deleted: false,
            });
        }
        LedgerEntryData::ContractData(cd) => {
            let contract_id = match &cd.contract {
                stellar_xdr::curr::ScAddress::Contract(hash) => {
                    strkey_util::contract_id_to_strkey(hash)
                }
                _ => "unknown".to_string(),
            };
            let durability = match cd.durability {
                ContractDataDurability::Temporary => "temporary",
                ContractDataDurability::Persistent => "persistent",
            };
            let key_xdr = serde_json::to_string(&cd.key).unwrap_or_default();
            let value_xdr = serde_json::to_string(&cd.val).unwrap_or_default();
            let key_hash = short_hash(&key_xdr);

            let sac = contract_data_sac_fields(&cd.contract, &cd.key, &cd.val, network_passphrase, sac_assets);

            bundle.contract_data.push(ContractDataRow {
                meta: row_meta.clone(),
                contract_id,
                key_hash,
                durability,
                key_xdr,
                value_xdr,
                is_sac: sac.is_sac,
                asset_code: sac.asset_code,
                asset_issuer: sac.asset_issuer,
                asset_type: sac.asset_type,
                balance_holder: sac.balance_holder,
                balance: sac.balance,
                deleted: false,
            });
        }
        LedgerEntryData::ContractCode(code) => {
            let code_bytes = code.code.as_slice();
            let metrics = wasm::extract_metrics(code_bytes);
            bundle.contract_code.push(ContractCodeRow {
                meta: row_meta.clone(),
                code_hash: hex::encode(code.hash.0),
                size_bytes: metrics.size_bytes,
                n_instructions: metrics.n_instructions,
                n_functions: metrics.n_functions,
                n_globals: metrics.n_globals,
                n_table_entries: metrics.n_table_entries,
                n_types: metrics.n_types,
                n_data_segments: metrics.n_data_segments,
                n_elem_segments: metrics.n_elem_segments,
                n_imports: metrics.n_imports,
                n_exports: metrics.n_exports,
                n_data_segment_bytes: metrics.n_data_segment_bytes,
                deleted: false,
            });
        }
        LedgerEntryData::ConfigSetting(setting) => {
            bundle.config_settings.push(ConfigSettingRow {
                meta: row_meta.clone(),
                setting_id: format!("{:?}", std::mem::discriminant(setting)),
                value_json: serde_json::to_value(setting).unwrap_or(serde_json::Value::Null),
            });
        }
        LedgerEntryData::Ttl(ttl) => {
            bundle.ttls.push(TtlRow {
                meta: row_meta.clone(),
                key_hash: hex::encode(ttl.key_hash.0),
                live_until_ledger_seq: ttl.live_until_ledger_seq,
                deleted: false,
            });
        }
        LedgerEntryData::Data(_) => {}
    }
}

fn apply_removed_key(key: &LedgerKey, row_meta: &RowMeta, bundle: &mut ChangeBundle) {
    match key {
        LedgerKey::Account(k) => {
            let account_id = strkey_util::account_id_to_strkey(&k.account_id);
            bundle.account_snapshots.push(AccountSnapshotRow {
                meta: row_meta.clone(),
                account_id,
                balance: 0,
                sequence_number: 0,
                num_subentries: 0,
                inflation_dest: None,
                home_domain: None,
                master_weight: 0,
                threshold_low: 0,
                threshold_medium: 0,
                threshold_high: 0,
                deleted: true,
            });
        }
        LedgerKey::Trustline(k) => {
            let (asset_code, asset_issuer) = asset_code_issuer(&k.asset);
            bundle.trustline_snapshots.push(TrustlineSnapshotRow {
                meta: row_meta.clone(),
                account_id: strkey_util::account_id_to_strkey(&k.account_id),
                asset_code,
                asset_issuer,
                balance: 0,
                limit: 0,
                flags: 0,
                deleted: true,
            });
        }
        LedgerKey::Offer(k) => {
            bundle.offers.push(OfferRow {
                meta: row_meta.clone(),
                offer_id: k.offer_id,
                seller_id: strkey_util::account_id_to_strkey(&k.seller_id),
                selling_asset_code: None,
                selling_asset_issuer: None,
                buying_asset_code: None,
                buying_asset_issuer: None,
                amount: 0,
                price_n: 0,
                price_d: 1,
                flags: 0,
                deleted: true,
            });
        }
        LedgerKey::ClaimableBalance(k) => {
            bundle.claimable_balances.push(ClaimableBalanceRow {
                meta: row_meta.clone(),
                balance_id: hex::encode(claimable_balance_id_bytes(&k.balance_id)),
                asset_code: None,
                asset_issuer: None,
                amount: 0,
                sponsor: None,
                claimants_json: serde_json::Value::Null,
                deleted: true,
            });
        }
        LedgerKey::LiquidityPool(k) => {
            bundle.liquidity_pools.push(LiquidityPoolRow {
                meta: row_meta.clone(),
                pool_id: hex::encode(k.liquidity_pool_id.0),
                asset_a_code: None,
                asset_a_issuer: None,
                asset_b_code: None,
                asset_b_issuer: None,
                reserve_a: 0,
                reserve_b: 0,
                total_pool_shares: 0,
                pool_shares_trust_line_count: 0,
                fee_bp: 0,
                deleted: true,
            });
        }
        LedgerKey::ContractData(k) => {
            let contract_id = match &k.contract {
                stellar_xdr::curr::ScAddress::Contract(hash) => {
                    strkey_util::contract_id_to_strkey(hash)
                }
                _ => "unknown".to_string(),
            };
            let key_xdr = serde_json::to_string(&k.key).unwrap_or_default();
            bundle.contract_data.push(ContractDataRow {
                meta: row_meta.clone(),
                contract_id,
                key_hash: short_hash(&key_xdr),
                durability: match k.durability {
                    ContractDataDurability::Temporary => "temporary",
                    ContractDataDurability::Persistent => "persistent",
                },
                key_xdr,
                value_xdr: String::new(),
                is_sac: false,
                asset_code: None,
                asset_issuer: None,
                asset_type: None,
                balance_holder: None,
                balance: None,
                deleted: true,
            });
        }
        LedgerKey::ContractCode(k) => {
            bundle.contract_code.push(ContractCodeRow {
                meta: row_meta.clone(),
                code_hash: hex::encode(k.hash.0),
                size_bytes: 0,
                n_instructions: None,
                n_functions: None,
                n_globals: None,
                n_table_entries: None,
                n_types: None,
                n_data_segments: None,
                n_elem_segments: None,
                n_imports: None,
                n_exports: None,
                n_data_segment_bytes: None,
                deleted: true,
            });
        }
        LedgerKey::Ttl(k) => {
            bundle.ttls.push(TtlRow {
                meta: row_meta.clone(),
                key_hash: hex::encode(k.key_hash.0),
                live_until_ledger_seq: 0,
                deleted: true,
            });
        }
        _ => {}
    }
}

pub(crate) fn asset_code_issuer(asset: &stellar_xdr::curr::Asset) -> (Option<String>, Option<String>) {
    use stellar_xdr::curr::Asset;
    match asset {
        Asset::Native => (Some("native".to_string()), None),
        Asset::CreditAlphanum4(a) => (
            Some(trimmed_code(&a.asset_code.0)),
            Some(strkey_util::account_id_to_strkey(&a.issuer)),
        ),
        Asset::CreditAlphanum12(a) => (
            Some(trimmed_code(&a.asset_code.0)),
            Some(strkey_util::account_id_to_strkey(&a.issuer)),
        ),
    }
}

pub(crate) fn trimmed_code(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim_end_matches('\0').to_string()
}

fn claimable_balance_id_bytes(id: &stellar_xdr::curr::ClaimableBalanceId) -> [u8; 32] {
    match id {
        stellar_xdr::curr::ClaimableBalanceId::ClaimableBalanceIdTypeV0(hash) => hash.0,
    }
}

fn short_hash(s: &str) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(s.as_bytes()))
}

struct SacFields {
    is_sac: bool,
    asset_code: Option<String>,
    asset_issuer: Option<String>,
    asset_type: Option<&'static str>,
    balance_holder: Option<String>,
    balance: Option<String>,
}

impl SacFields {
    fn none() -> Self {
        SacFields {
            is_sac: false,
            asset_code: None,
            asset_issuer: None,
            asset_type: None,
            balance_holder: None,
            balance: None,
        }
    }
}

/// SAC asset metadata / balance fields for one `ContractData` entry (spec
/// §4.2 "Smart-Contract-Asset detection"). Two entry shapes carry a SAC's
/// data: the contract's single instance entry, whose storage holds the
/// wrapped classic asset's identity, and its per-holder balance entries,
/// which carry only an amount. A contract is only ever flagged `is_sac` once
/// [`sac::is_sac_for`] confirms its ID is the deterministic derivation for
/// the candidate asset - matching the entry shape alone is not enough.
fn contract_data_sac_fields(
    contract: &ScAddress,
    key: &ScVal,
    val: &ScVal,
    network_passphrase: &str,
    sac_assets: &mut SacAssetCache,
) -> SacFields {
    let ScAddress::Contract(hash) = contract else {
        return SacFields::none();
    };
    let contract_key = strkey_util::contract_id_to_strkey(hash);

    if let Some(asset) = classic_asset_from_instance(val) {
        if sac::is_sac_for(hash, &asset, network_passphrase) {
            let fields = SacFields {
                is_sac: true,
                asset_code: Some(asset.code.clone()),
                asset_issuer: asset_issuer_strkey(&asset),
                asset_type: asset_type_label(&asset),
                balance_holder: None,
                balance: None,
            };
            sac_assets.insert(contract_key, asset);
            return fields;
        }
    }

    if let Some((holder, amount)) = balance_entry(key, val) {
        if let Some(asset) = sac_assets.get(&contract_key) {
            if sac::is_sac_for(hash, asset, network_passphrase) {
                return SacFields {
                    is_sac: true,
                    asset_code: Some(asset.code.clone()),
                    asset_issuer: asset_issuer_strkey(asset),
                    asset_type: asset_type_label(asset),
                    balance_holder: Some(holder),
                    balance: Some(amount),
                };
            }
        }
    }

    SacFields::none()
}

fn asset_type_label(asset: &ClassicAsset) -> Option<&'static str> {
    Some(if asset.issuer.is_none() {
        "native"
    } else if asset.code.len() <= 4 {
        "credit_alphanum4"
    } else {
        "credit_alphanum12"
    })
}

fn asset_issuer_strkey(asset: &ClassicAsset) -> Option<String> {
    asset.issuer.as_ref().map(strkey_util::account_id_to_strkey)
}

/// Decode a classic asset identity from a SAC's instance storage. The
/// reference token contract's `name()` for a wrapped classic asset returns
/// `"{code}:{issuer}"` (`"native"` for XLM); the instance's `METADATA` entry
/// stores that same string, which this reads back without invoking the
/// contract.
fn classic_asset_from_instance(val: &ScVal) -> Option<ClassicAsset> {
    let ScVal::ContractInstance(instance) = val else {
        return None;
    };
    let storage = instance.storage.as_ref()?;
    let name = storage.iter().find_map(|entry| {
        if !is_symbol_tagged_key(&entry.key, "METADATA") {
            return None;
        }
        let ScVal::Map(Some(fields)) = &entry.val else {
            return None;
        };
        fields.iter().find_map(|f| match (&f.key, &f.val) {
            (ScVal::Symbol(s), ScVal::String(name)) if s.to_utf8_string_lossy() == "name" => {
                Some(name.to_utf8_string_lossy())
            }
            _ => None,
        })
    })?;
    classic_asset_from_name(&name)
}

fn classic_asset_from_name(name: &str) -> Option<ClassicAsset> {
    if name == "native" {
        return Some(ClassicAsset {
            code: "native".to_string(),
            issuer: None,
        });
    }
    let (code, issuer) = name.split_once(':')?;
    let issuer = strkey_util::strkey_to_account_id(issuer)?;
    Some(ClassicAsset {
        code: code.to_string(),
        issuer: Some(issuer),
    })
}

/// Decode `(holder_strkey, amount)` from a SAC per-holder balance entry
/// (key = `Vec![Symbol("Balance"), Address(holder)]`, value a map carrying
/// at least an `amount` field).
fn balance_entry(key: &ScVal, val: &ScVal) -> Option<(String, String)> {
    if !is_symbol_tagged_key(key, "Balance") {
        return None;
    }
    let ScVal::Vec(Some(parts)) = key else {
        return None;
    };
    let mut iter = parts.iter();
    iter.next()?; // the "Balance" tag, already checked above
    let ScVal::Address(holder) = iter.next()? else {
        return None;
    };
    if iter.next().is_some() {
        return None;
    }
    let holder = match holder {
        ScAddress::Account(account_id) => strkey_util::account_id_to_strkey(account_id),
        ScAddress::Contract(hash) => strkey_util::contract_id_to_strkey(hash),
        _ => return None,
    };

    let ScVal::Map(Some(fields)) = val else {
        return None;
    };
    let amount = fields.iter().find_map(|f| match (&f.key, &f.val) {
        (ScVal::Symbol(s), ScVal::I128(parts)) if s.to_utf8_string_lossy() == "amount" => {
            Some(i128_to_string(parts.hi, parts.lo))
        }
        (ScVal::Symbol(s), ScVal::U128(parts)) if s.to_utf8_string_lossy() == "amount" => {
            Some(u128_to_string(parts.hi, parts.lo))
        }
        _ => None,
    })?;

    Some((holder, amount))
}

/// Whether `key` is shaped `Vec![Symbol(tag), ..]` - the Soroban SDK's
/// standard encoding for a single-variant-plus-arguments storage key.
fn is_symbol_tagged_key(key: &ScVal, tag: &str) -> bool {
    let ScVal::Vec(Some(parts)) = key else {
        return false;
    };
    matches!(parts.iter().next(), Some(ScVal::Symbol(s)) if s.to_utf8_string_lossy() == tag)
}

fn i128_to_string(hi: i64, lo: u64) -> String {
    (((hi as i128) << 64) | lo as i128).to_string()
}

fn u128_to_string(hi: u64, lo: u64) -> String {
    (((hi as u128) << 64) | lo as u128).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stellar_xdr::curr::{
        AccountId, Hash, Int128Parts, PublicKey, ScMap, ScMapEntry, ScSymbol, ScVec, StringM,
        Uint256,
    };

    #[test]
    fn trimmed_code_strips_null_padding() {
        assert_eq!(trimmed_code(b"USD\0"), "USD");
        assert_eq!(trimmed_code(b"USDC"), "USDC");
    }

    fn symbol(s: &str) -> ScVal {
        ScVal::Symbol(ScSymbol(StringM::try_from(s).unwrap()))
    }

    fn balance_key(holder: &ScAddress) -> ScVal {
        ScVal::Vec(Some(ScVec(
            vec![symbol("Balance"), ScVal::Address(holder.clone())]
                .try_into()
                .unwrap(),
        )))
    }

    fn amount_map(field: &str, val: ScVal) -> ScVal {
        ScVal::Map(Some(ScMap(
            vec![ScMapEntry { key: symbol(field), val }].try_into().unwrap(),
        )))
    }

    #[test]
    fn classic_asset_from_name_handles_native_and_issued() {
        let issuer = AccountId(PublicKey::PublicKeyTypeEd25519(Uint256([6u8; 32])));
        let issuer_strkey = strkey_util::account_id_to_strkey(&issuer);

        assert_eq!(
            classic_asset_from_name("native"),
            Some(ClassicAsset { code: "native".to_string(), issuer: None })
        );
        assert_eq!(
            classic_asset_from_name(&format!("USDC:{issuer_strkey}")),
            Some(ClassicAsset { code: "USDC".to_string(), issuer: Some(issuer) })
        );
        assert_eq!(classic_asset_from_name("not-an-asset-name"), None);
        assert_eq!(classic_asset_from_name("USDC:not-a-strkey"), None);
    }

    #[test]
    fn balance_entry_decodes_holder_and_amount() {
        let holder = AccountId(PublicKey::PublicKeyTypeEd25519(Uint256([4u8; 32])));
        let key = balance_key(&ScAddress::Account(holder.clone()));
        let val = amount_map("amount", ScVal::I128(Int128Parts { hi: 0, lo: 1_000_000 }));

        let (holder_strkey, amount) = balance_entry(&key, &val).expect("shaped as a balance entry");
        assert_eq!(holder_strkey, strkey_util::account_id_to_strkey(&holder));
        assert_eq!(amount, "1000000");
    }

    #[test]
    fn balance_entry_rejects_wrong_tag_or_missing_amount() {
        let holder = AccountId(PublicKey::PublicKeyTypeEd25519(Uint256([4u8; 32])));
        let not_balance = ScVal::Vec(Some(ScVec(vec![symbol("Allowance")].try_into().unwrap())));
        assert!(balance_entry(&not_balance, &ScVal::Void).is_none());

        let key = balance_key(&ScAddress::Account(holder));
        let val_without_amount = amount_map("other_field", ScVal::U32(1));
        assert!(balance_entry(&key, &val_without_amount).is_none());
    }

    #[test]
    fn contract_data_sac_fields_uses_cached_asset_for_balance_rows() {
        let passphrase = "Test SDF Network ; September 2015";
        let issuer = AccountId(PublicKey::PublicKeyTypeEd25519(Uint256([9u8; 32])));
        let asset = ClassicAsset { code: "USDC".to_string(), issuer: Some(issuer) };
        let contract_hash = sac::derive_contract_id(&asset, passphrase).expect("derivable");
        let contract = ScAddress::Contract(contract_hash.clone());

        let mut cache = SacAssetCache::new();
        cache.insert(strkey_util::contract_id_to_strkey(&contract_hash), asset);

        let holder = AccountId(PublicKey::PublicKeyTypeEd25519(Uint256([4u8; 32])));
        let key = balance_key(&ScAddress::Account(holder.clone()));
        let val = amount_map("amount", ScVal::I128(Int128Parts { hi: 0, lo: 1_000_000 }));

        let fields = contract_data_sac_fields(&contract, &key, &val, passphrase, &mut cache);
        assert!(fields.is_sac);
        assert_eq!(fields.asset_code.as_deref(), Some("USDC"));
        assert_eq!(
            fields.balance_holder.as_deref(),
            Some(strkey_util::account_id_to_strkey(&holder)).as_deref()
        );
        assert_eq!(fields.balance.as_deref(), Some("1000000"));
    }

    #[test]
    fn contract_data_sac_fields_is_not_sac_without_a_cached_match() {
        let contract = ScAddress::Contract(Hash([1u8; 32]));
        let mut cache = SacAssetCache::new();
        let fields = contract_data_sac_fields(&contract, &ScVal::Void, &ScVal::Void, "x", &mut cache);
        assert!(!fields.is_sac);
        assert!(fields.asset_code.is_none());
    }
}
