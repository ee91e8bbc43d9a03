//! The nineteen typed row shapes emitted by the extractor set (spec §3.1,
//! §6.3). Every row carries the same four metadata columns; natural keys are
//! documented per-stream in the dedup table (spec §4.2) and enforced by
//! [`crate::extract::dedup`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Metadata columns shared by all nineteen row streams (spec §3.1).
#[derive(Debug, Clone, Serialize)]
pub struct RowMeta {
    pub ledger_sequence: u32,
    pub ledger_range: u64,
    pub closed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl RowMeta {
    pub fn new(ledger_sequence: u32, closed_at: DateTime<Utc>) -> Self {
        Self {
            ledger_sequence,
            ledger_range: ledger_range_of(ledger_sequence),
            closed_at,
            created_at: Utc::now(),
        }
    }
}

/// `ledger_range = (ledger_sequence / 10_000) * 10_000` (spec §3.1, invariant 2).
pub fn ledger_range_of(ledger_sequence: u32) -> u64 {
    (ledger_sequence as u64 / 10_000) * 10_000
}

#[derive(Debug, Clone, Serialize)]
pub struct LedgerHeaderRow {
    pub meta: RowMeta,
    pub sequence: u32,
    pub ledger_hash: String,
    pub previous_ledger_hash: String,
    pub protocol_version: u32,
    pub total_coins: i64,
    pub fee_pool: i64,
    pub base_fee: u32,
    pub base_reserve: u32,
    pub max_tx_set_size: u32,
    pub tx_count: u32,
    pub successful_tx_count: u32,
    pub failed_tx_count: u32,
    pub evicted_keys_count: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionRow {
    pub meta: RowMeta,
    pub tx_hash: String,
    pub source_account: String,
    pub fee_charged: i64,
    pub max_fee: i64,
    pub sequence_number: i64,
    pub memo: Option<String>,
    pub successful: bool,
    pub result_code: String,
    pub operation_count: u32,
    pub envelope_xdr: String,
    pub result_xdr: String,
    pub tx_meta_xdr: String,
    pub soroban_resource_fee: Option<i64>,
    pub soroban_instructions: Option<u32>,
    pub muxed_source_account: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OperationRow {
    pub meta: RowMeta,
    pub tx_hash: String,
    pub op_index: u32,
    pub type_code: i32,
    pub type_string: &'static str,
    pub source_account: Option<String>,
    pub successful: bool,
    pub details_json: Value,
    pub contract_calls_json: Value,
    pub contracts_involved: Vec<String>,
    pub max_call_depth: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct EffectRow {
    pub meta: RowMeta,
    pub tx_hash: String,
    pub op_index: u32,
    pub effect_index: u32,
    pub effect_type: &'static str,
    pub account_id: Option<String>,
    pub details_json: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct TradeRow {
    pub meta: RowMeta,
    pub tx_hash: String,
    pub op_index: u32,
    pub trade_index: u32,
    pub seller_id: Option<String>,
    pub buyer_id: Option<String>,
    pub sold_asset_code: Option<String>,
    pub sold_asset_issuer: Option<String>,
    pub sold_amount: Option<i64>,
    pub bought_asset_code: Option<String>,
    pub bought_asset_issuer: Option<String>,
    pub bought_amount: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountSnapshotRow {
    pub meta: RowMeta,
    pub account_id: String,
    pub balance: i64,
    pub sequence_number: i64,
    pub num_subentries: u32,
    pub inflation_dest: Option<String>,
    pub home_domain: Option<String>,
    pub master_weight: u32,
    pub threshold_low: u32,
    pub threshold_medium: u32,
    pub threshold_high: u32,
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrustlineSnapshotRow {
    pub meta: RowMeta,
    pub account_id: String,
    pub asset_code: String,
    pub asset_issuer: String,
    pub balance: i64,
    pub limit: i64,
    pub flags: u32,
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct NativeBalanceRow {
    pub meta: RowMeta,
    pub account_id: String,
    pub balance: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountSignerRow {
    pub meta: RowMeta,
    pub account_id: String,
    pub signer_key: String,
    pub weight: u32,
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OfferRow {
    pub meta: RowMeta,
    pub offer_id: i64,
    pub seller_id: String,
    pub selling_asset_code: Option<String>,
    pub selling_asset_issuer: Option<String>,
    pub buying_asset_code: Option<String>,
    pub buying_asset_issuer: Option<String>,
    pub amount: i64,
    pub price_n: i32,
    pub price_d: i32,
    pub flags: u32,
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LiquidityPoolRow {
    pub meta: RowMeta,
    pub pool_id: String,
    pub asset_a_code: Option<String>,
    pub asset_a_issuer: Option<String>,
    pub asset_b_code: Option<String>,
    pub asset_b_issuer: Option<String>,
    pub reserve_a: i64,
    pub reserve_b: i64,
    pub total_pool_shares: i64,
    pub pool_shares_trust_line_count: i64,
    pub fee_bp: u32,
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClaimableBalanceRow {
    pub meta: RowMeta,
    pub balance_id: String,
    pub asset_code: Option<String>,
    pub asset_issuer: Option<String>,
    pub amount: i64,
    pub sponsor: Option<String>,
    pub claimants_json: Value,
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContractEventRow {
    pub meta: RowMeta,
    pub event_id: String,
    pub tx_hash: String,
    pub tx_index: u32,
    pub op_index: u32,
    pub event_index: u32,
    pub contract_id: Option<String>,
    pub event_type: &'static str,
    pub topics_raw: String,
    pub topics_json: Value,
    pub data_raw: String,
    pub data_json: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContractDataRow {
    pub meta: RowMeta,
    pub contract_id: String,
    pub key_hash: String,
    pub durability: &'static str,
    pub key_xdr: String,
    pub value_xdr: String,
    pub is_sac: bool,
    pub asset_code: Option<String>,
    pub asset_issuer: Option<String>,
    pub asset_type: Option<&'static str>,
    pub balance_holder: Option<String>,
    pub balance: Option<String>,
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContractCodeRow {
    pub meta: RowMeta,
    pub code_hash: String,
    pub size_bytes: u32,
    pub n_instructions: Option<u64>,
    pub n_functions: Option<u32>,
    pub n_globals: Option<u32>,
    pub n_table_entries: Option<u32>,
    pub n_types: Option<u32>,
    pub n_data_segments: Option<u32>,
    pub n_elem_segments: Option<u32>,
    pub n_imports: Option<u32>,
    pub n_exports: Option<u32>,
    pub n_data_segment_bytes: Option<u64>,
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigSettingRow {
    pub meta: RowMeta,
    pub setting_id: String,
    pub value_json: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct TtlRow {
    pub meta: RowMeta,
    pub key_hash: String,
    pub live_until_ledger_seq: u32,
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvictedKeyRow {
    pub meta: RowMeta,
    pub key_hash: String,
    pub key_xdr: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RestoredKeyRow {
    pub meta: RowMeta,
    pub key_hash: String,
    pub restored_from_ledger: Option<u32>,
}

/// One ledger's worth of extracted rows across all nineteen streams, already
/// deduplicated within the ledger. This is what L1 hands to L2 (spec §4.1
/// "Extracted row batches are owned by the L2 writer until commit").
#[derive(Debug, Clone, Default)]
pub struct ExtractedLedger {
    pub ledger_header: Option<LedgerHeaderRow>,
    pub transactions: Vec<TransactionRow>,
    pub operations: Vec<OperationRow>,
    pub effects: Vec<EffectRow>,
    pub trades: Vec<TradeRow>,
    pub account_snapshots: Vec<AccountSnapshotRow>,
    pub trustline_snapshots: Vec<TrustlineSnapshotRow>,
    pub native_balances: Vec<NativeBalanceRow>,
    pub account_signers: Vec<AccountSignerRow>,
    pub offers: Vec<OfferRow>,
    pub liquidity_pools: Vec<LiquidityPoolRow>,
    pub claimable_balances: Vec<ClaimableBalanceRow>,
    pub contract_events: Vec<ContractEventRow>,
    pub contract_data: Vec<ContractDataRow>,
    pub contract_code: Vec<ContractCodeRow>,
    pub config_settings: Vec<ConfigSettingRow>,
    pub ttls: Vec<TtlRow>,
    pub evicted_keys: Vec<EvictedKeyRow>,
    pub restored_keys: Vec<RestoredKeyRow>,
}

/// Names of the nineteen logical tables, in the fixed insert order the
/// writer uses per batch (spec §4.3 "execute 19 bulk inserts in a fixed
/// order").
pub const TABLE_NAMES: [&str; 19] = [
    "ledger_header",
    "transaction",
    "operation",
    "effect",
    "trade",
    "account_snapshot",
    "trustline_snapshot",
    "native_balance",
    "account_signer",
    "offer",
    "liquidity_pool",
    "claimable_balance",
    "contract_event",
    "contract_data",
    "contract_code",
    "config_setting",
    "ttl",
    "evicted_key",
    "restored_key",
];
