//! Declarative hot-store schema (spec §4.3 "schema bootstrap", §6.3 "hot and
//! cold row catalogs"). Executed idempotently on startup: `CREATE TABLE IF
//! NOT EXISTS` plus `CREATE INDEX IF NOT EXISTS`, so a second process booting
//! against an already-initialized store is a no-op rather than an error.
//!
//! Every table gets the shared metadata columns (`ledger_sequence`,
//! `ledger_range`, `closed_at`, `created_at`) plus exactly two indexes - one
//! on `ledger_range`, one on the sequence column - per spec §6.3. Natural
//! keys get a `UNIQUE` constraint so the writer's upserts (spec invariant 3,
//! "idempotent replay") have a conflict target.

/// One statement per table plus its indexes, executed in order. Order
/// doesn't matter for correctness (no FKs between these tables - spec §4.4
/// "DELETE ... in any order, no FKs to honor") but keeping it in
/// [`crate::extract::rows::TABLE_NAMES`] order makes the two easy to audit
/// against each other.
pub fn bootstrap_statements() -> Vec<&'static str> {
    vec![
        r#"CREATE TABLE IF NOT EXISTS ledger_header (
            sequence BIGINT PRIMARY KEY,
            ledger_range BIGINT NOT NULL,
            closed_at TIMESTAMPTZ NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            ledger_hash TEXT NOT NULL,
            previous_ledger_hash TEXT NOT NULL,
            protocol_version INTEGER NOT NULL,
            total_coins BIGINT NOT NULL,
            fee_pool BIGINT NOT NULL,
            base_fee INTEGER NOT NULL,
            base_reserve INTEGER NOT NULL,
            max_tx_set_size INTEGER NOT NULL,
            tx_count INTEGER NOT NULL,
            successful_tx_count INTEGER NOT NULL,
            failed_tx_count INTEGER NOT NULL,
            evicted_keys_count INTEGER
        )"#,
        "CREATE INDEX IF NOT EXISTS ledger_header_range_idx ON ledger_header (ledger_range)",
        r#"CREATE TABLE IF NOT EXISTS transaction (
            tx_hash TEXT PRIMARY KEY,
            ledger_sequence BIGINT NOT NULL,
            ledger_range BIGINT NOT NULL,
            closed_at TIMESTAMPTZ NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            source_account TEXT NOT NULL,
            fee_charged BIGINT NOT NULL,
            max_fee BIGINT NOT NULL,
            sequence_number BIGINT NOT NULL,
            memo TEXT,
            successful BOOLEAN NOT NULL,
            result_code TEXT NOT NULL,
            operation_count INTEGER NOT NULL,
            envelope_xdr TEXT NOT NULL,
            result_xdr TEXT NOT NULL,
            tx_meta_xdr TEXT NOT NULL,
            soroban_resource_fee BIGINT,
            soroban_instructions BIGINT,
            muxed_source_account TEXT
        )"#,
        "CREATE INDEX IF NOT EXISTS transaction_range_idx ON transaction (ledger_range)",
        "CREATE INDEX IF NOT EXISTS transaction_seq_idx ON transaction (ledger_sequence)",
        r#"CREATE TABLE IF NOT EXISTS operation (
            tx_hash TEXT NOT NULL,
            op_index INTEGER NOT NULL,
            ledger_sequence BIGINT NOT NULL,
            ledger_range BIGINT NOT NULL,
            closed_at TIMESTAMPTZ NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            type_code INTEGER NOT NULL,
            type_string TEXT NOT NULL,
            source_account TEXT,
            successful BOOLEAN NOT NULL,
            details_json JSONB NOT NULL,
            contract_calls_json JSONB NOT NULL,
            contracts_involved TEXT[] NOT NULL,
            max_call_depth INTEGER NOT NULL,
            PRIMARY KEY (tx_hash, op_index)
        )"#,
        "CREATE INDEX IF NOT EXISTS operation_range_idx ON operation (ledger_range)",
        "CREATE INDEX IF NOT EXISTS operation_seq_idx ON operation (ledger_sequence)",
        r#"CREATE TABLE IF NOT EXISTS effect (
            tx_hash TEXT NOT NULL,
            op_index INTEGER NOT NULL,
            effect_index INTEGER NOT NULL,
            ledger_sequence BIGINT NOT NULL,
            ledger_range BIGINT NOT NULL,
            closed_at TIMESTAMPTZ NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            effect_type TEXT NOT NULL,
            account_id TEXT,
            details_json JSONB NOT NULL,
            PRIMARY KEY (tx_hash, op_index, effect_index)
        )"#,
        "CREATE INDEX IF NOT EXISTS effect_range_idx ON effect (ledger_range)",
        "CREATE INDEX IF NOT EXISTS effect_seq_idx ON effect (ledger_sequence)",
        r#"CREATE TABLE IF NOT EXISTS trade (
            ledger_sequence BIGINT NOT NULL,
            tx_hash TEXT NOT NULL,
            op_index INTEGER NOT NULL,
            trade_index INTEGER NOT NULL,
            ledger_range BIGINT NOT NULL,
            closed_at TIMESTAMPTZ NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            seller_id TEXT,
            buyer_id TEXT,
            sold_asset_code TEXT,
            sold_asset_issuer TEXT,
            sold_amount BIGINT,
            bought_asset_code TEXT,
            bought_asset_issuer TEXT,
            bought_amount BIGINT,
            PRIMARY KEY (ledger_sequence, tx_hash, op_index, trade_index)
        )"#,
        "CREATE INDEX IF NOT EXISTS trade_range_idx ON trade (ledger_range)",
        "CREATE INDEX IF NOT EXISTS trade_seq_idx ON trade (ledger_sequence)",
        r#"CREATE TABLE IF NOT EXISTS account_snapshot (
            account_id TEXT PRIMARY KEY,
            ledger_sequence BIGINT NOT NULL,
            ledger_range BIGINT NOT NULL,
            closed_at TIMESTAMPTZ NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            balance BIGINT NOT NULL,
            sequence_number BIGINT NOT NULL,
            num_subentries INTEGER NOT NULL,
            inflation_dest TEXT,
            home_domain TEXT,
            master_weight INTEGER NOT NULL,
            threshold_low INTEGER NOT NULL,
            threshold_medium INTEGER NOT NULL,
            threshold_high INTEGER NOT NULL,
            deleted BOOLEAN NOT NULL
        )"#,
        "CREATE INDEX IF NOT EXISTS account_snapshot_range_idx ON account_snapshot (ledger_range)",
        "CREATE INDEX IF NOT EXISTS account_snapshot_seq_idx ON account_snapshot (ledger_sequence)",
        r#"CREATE TABLE IF NOT EXISTS trustline_snapshot (
            account_id TEXT NOT NULL,
            asset_code TEXT NOT NULL,
            asset_issuer TEXT NOT NULL,
            ledger_sequence BIGINT NOT NULL,
            ledger_range BIGINT NOT NULL,
            closed_at TIMESTAMPTZ NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            balance BIGINT NOT NULL,
            "limit" BIGINT NOT NULL,
            flags INTEGER NOT NULL,
            deleted BOOLEAN NOT NULL,
            PRIMARY KEY (account_id, asset_code, asset_issuer)
        )"#,
        "CREATE INDEX IF NOT EXISTS trustline_snapshot_range_idx ON trustline_snapshot (ledger_range)",
        "CREATE INDEX IF NOT EXISTS trustline_snapshot_seq_idx ON trustline_snapshot (ledger_sequence)",
        r#"CREATE TABLE IF NOT EXISTS native_balance (
            account_id TEXT PRIMARY KEY,
            ledger_sequence BIGINT NOT NULL,
            ledger_range BIGINT NOT NULL,
            closed_at TIMESTAMPTZ NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            balance BIGINT NOT NULL
        )"#,
        "CREATE INDEX IF NOT EXISTS native_balance_range_idx ON native_balance (ledger_range)",
        "CREATE INDEX IF NOT EXISTS native_balance_seq_idx ON native_balance (ledger_sequence)",
        r#"CREATE TABLE IF NOT EXISTS account_signer (
            account_id TEXT NOT NULL,
            signer_key TEXT NOT NULL,
            ledger_sequence BIGINT NOT NULL,
            ledger_range BIGINT NOT NULL,
            closed_at TIMESTAMPTZ NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            weight INTEGER NOT NULL,
            deleted BOOLEAN NOT NULL,
            PRIMARY KEY (account_id, signer_key)
        )"#,
        "CREATE INDEX IF NOT EXISTS account_signer_range_idx ON account_signer (ledger_range)",
        "CREATE INDEX IF NOT EXISTS account_signer_seq_idx ON account_signer (ledger_sequence)",
        r#"CREATE TABLE IF NOT EXISTS offer (
            offer_id BIGINT PRIMARY KEY,
            ledger_sequence BIGINT NOT NULL,
            ledger_range BIGINT NOT NULL,
            closed_at TIMESTAMPTZ NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            seller_id TEXT NOT NULL,
            selling_asset_code TEXT,
            selling_asset_issuer TEXT,
            buying_asset_code TEXT,
            buying_asset_issuer TEXT,
            amount BIGINT NOT NULL,
            price_n INTEGER NOT NULL,
            price_d INTEGER NOT NULL,
            flags INTEGER NOT NULL,
            deleted BOOLEAN NOT NULL
        )"#,
        "CREATE INDEX IF NOT EXISTS offer_range_idx ON offer (ledger_range)",
        "CREATE INDEX IF NOT EXISTS offer_seq_idx ON offer (ledger_sequence)",
        r#"CREATE TABLE IF NOT EXISTS liquidity_pool (
            pool_id TEXT PRIMARY KEY,
            ledger_sequence BIGINT NOT NULL,
            ledger_range BIGINT NOT NULL,
            closed_at TIMESTAMPTZ NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            asset_a_code TEXT,
            asset_a_issuer TEXT,
            asset_b_code TEXT,
            asset_b_issuer TEXT,
            reserve_a BIGINT NOT NULL,
            reserve_b BIGINT NOT NULL,
            total_pool_shares BIGINT NOT NULL,
            pool_shares_trust_line_count BIGINT NOT NULL,
            fee_bp INTEGER NOT NULL,
            deleted BOOLEAN NOT NULL
        )"#,
        "CREATE INDEX IF NOT EXISTS liquidity_pool_range_idx ON liquidity_pool (ledger_range)",
        "CREATE INDEX IF NOT EXISTS liquidity_pool_seq_idx ON liquidity_pool (ledger_sequence)",
        r#"CREATE TABLE IF NOT EXISTS claimable_balance (
            balance_id TEXT PRIMARY KEY,
            ledger_sequence BIGINT NOT NULL,
            ledger_range BIGINT NOT NULL,
            closed_at TIMESTAMPTZ NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            asset_code TEXT,
            asset_issuer TEXT,
            amount BIGINT NOT NULL,
            sponsor TEXT,
            claimants_json JSONB NOT NULL,
            deleted BOOLEAN NOT NULL
        )"#,
        "CREATE INDEX IF NOT EXISTS claimable_balance_range_idx ON claimable_balance (ledger_range)",
        "CREATE INDEX IF NOT EXISTS claimable_balance_seq_idx ON claimable_balance (ledger_sequence)",
        r#"CREATE TABLE IF NOT EXISTS contract_event (
            event_id TEXT PRIMARY KEY,
            ledger_sequence BIGINT NOT NULL,
            ledger_range BIGINT NOT NULL,
            closed_at TIMESTAMPTZ NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            tx_hash TEXT NOT NULL,
            tx_index INTEGER NOT NULL,
            op_index INTEGER NOT NULL,
            event_index INTEGER NOT NULL,
            contract_id TEXT,
            event_type TEXT NOT NULL,
            topics_raw TEXT NOT NULL,
            topics_json JSONB NOT NULL,
            data_raw TEXT NOT NULL,
            data_json JSONB NOT NULL
        )"#,
        "CREATE INDEX IF NOT EXISTS contract_event_range_idx ON contract_event (ledger_range)",
        "CREATE INDEX IF NOT EXISTS contract_event_seq_idx ON contract_event (ledger_sequence)",
        r#"CREATE TABLE IF NOT EXISTS contract_data (
            contract_id TEXT NOT NULL,
            key_hash TEXT NOT NULL,
            ledger_sequence BIGINT NOT NULL,
            ledger_range BIGINT NOT NULL,
            closed_at TIMESTAMPTZ NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            durability TEXT NOT NULL,
            key_xdr TEXT NOT NULL,
            value_xdr TEXT NOT NULL,
            is_sac BOOLEAN NOT NULL,
            asset_code TEXT,
            asset_issuer TEXT,
            asset_type TEXT,
            balance_holder TEXT,
            balance TEXT,
            deleted BOOLEAN NOT NULL,
            PRIMARY KEY (contract_id, key_hash)
        )"#,
        "CREATE INDEX IF NOT EXISTS contract_data_range_idx ON contract_data (ledger_range)",
        "CREATE INDEX IF NOT EXISTS contract_data_seq_idx ON contract_data (ledger_sequence)",
        r#"CREATE TABLE IF NOT EXISTS contract_code (
            code_hash TEXT PRIMARY KEY,
            ledger_sequence BIGINT NOT NULL,
            ledger_range BIGINT NOT NULL,
            closed_at TIMESTAMPTZ NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            size_bytes INTEGER NOT NULL,
            n_instructions BIGINT,
            n_functions INTEGER,
            n_globals INTEGER,
            n_table_entries INTEGER,
            n_types INTEGER,
            n_data_segments INTEGER,
            n_elem_segments INTEGER,
            n_imports INTEGER,
            n_exports INTEGER,
            n_data_segment_bytes BIGINT,
            deleted BOOLEAN NOT NULL
        )"#,
        "CREATE INDEX IF NOT EXISTS contract_code_range_idx ON contract_code (ledger_range)",
        "CREATE INDEX IF NOT EXISTS contract_code_seq_idx ON contract_code (ledger_sequence)",
        r#"CREATE TABLE IF NOT EXISTS config_setting (
            setting_id TEXT PRIMARY KEY,
            ledger_sequence BIGINT NOT NULL,
            ledger_range BIGINT NOT NULL,
            closed_at TIMESTAMPTZ NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            value_json JSONB NOT NULL
        )"#,
        "CREATE INDEX IF NOT EXISTS config_setting_range_idx ON config_setting (ledger_range)",
        "CREATE INDEX IF NOT EXISTS config_setting_seq_idx ON config_setting (ledger_sequence)",
        r#"CREATE TABLE IF NOT EXISTS ttl (
            key_hash TEXT PRIMARY KEY,
            ledger_sequence BIGINT NOT NULL,
            ledger_range BIGINT NOT NULL,
            closed_at TIMESTAMPTZ NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            live_until_ledger_seq BIGINT NOT NULL,
            deleted BOOLEAN NOT NULL
        )"#,
        "CREATE INDEX IF NOT EXISTS ttl_range_idx ON ttl (ledger_range)",
        "CREATE INDEX IF NOT EXISTS ttl_seq_idx ON ttl (ledger_sequence)",
        r#"CREATE TABLE IF NOT EXISTS evicted_key (
            key_hash TEXT PRIMARY KEY,
            ledger_sequence BIGINT NOT NULL,
            ledger_range BIGINT NOT NULL,
            closed_at TIMESTAMPTZ NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            key_xdr TEXT NOT NULL
        )"#,
        "CREATE INDEX IF NOT EXISTS evicted_key_range_idx ON evicted_key (ledger_range)",
        "CREATE INDEX IF NOT EXISTS evicted_key_seq_idx ON evicted_key (ledger_sequence)",
        r#"CREATE TABLE IF NOT EXISTS restored_key (
            key_hash TEXT PRIMARY KEY,
            ledger_sequence BIGINT NOT NULL,
            ledger_range BIGINT NOT NULL,
            closed_at TIMESTAMPTZ NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            restored_from_ledger BIGINT
        )"#,
        "CREATE INDEX IF NOT EXISTS restored_key_range_idx ON restored_key (ledger_range)",
        "CREATE INDEX IF NOT EXISTS restored_key_seq_idx ON restored_key (ledger_sequence)",
        r#"CREATE TABLE IF NOT EXISTS checkpoint (
            id SMALLINT PRIMARY KEY DEFAULT 1,
            last_sequence BIGINT NOT NULL,
            last_hash TEXT NOT NULL,
            total_ledgers_processed BIGINT NOT NULL,
            total_rows_written BIGINT NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL,
            CONSTRAINT checkpoint_singleton CHECK (id = 1)
        )"#,
    ]
}

/// Tables whose sequence column is `sequence` rather than `ledger_sequence`
/// (spec §4.4 "`seq_col` is `sequence` for the header table ... for all
/// others"). Used by both the bootstrap verification and the flush
/// orchestrator's per-table `WHERE` clause.
pub fn seq_column(table: &str) -> &'static str {
    if table == "ledger_header" {
        "sequence"
    } else {
        "ledger_sequence"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::rows::TABLE_NAMES;

    #[test]
    fn only_ledger_header_uses_the_sequence_column() {
        for table in TABLE_NAMES {
            let expected = if table == "ledger_header" { "sequence" } else { "ledger_sequence" };
            assert_eq!(seq_column(table), expected);
        }
    }

    #[test]
    fn every_table_has_a_bootstrap_statement() {
        let statements = bootstrap_statements();
        for table in TABLE_NAMES {
            assert!(
                statements.iter().any(|s| s.contains(&format!("EXISTS {table} "))),
                "missing CREATE TABLE for {table}"
            );
        }
    }
}
