//! Per-table bulk upsert statements (spec §4.3 "19 bulk inserts in a fixed
//! order", invariant 3 "idempotent replay"). Every insert conflicts on the
//! table's natural key (spec §4.2 dedup table) and either updates every
//! other column (snapshot-style streams, so a later-seen state wins even if
//! the batch boundary split a stream's dedup) or does nothing (append-only
//! streams, where a replayed row is byte-identical to the one already
//! there).
//!
//! `sqlx::QueryBuilder::push_values` builds one `INSERT ... VALUES (...),
//! (...), ...` per call, so an empty slice is skipped up front rather than
//! emitting `INSERT ... VALUES` with no rows.

use sqlx::{Postgres, QueryBuilder, Transaction};

use crate::error::Result;
use crate::extract::rows::*;

pub async fn ledger_header(tx: &mut Transaction<'_, Postgres>, row: &LedgerHeaderRow) -> Result<()> {
    sqlx::query(
        r#"INSERT INTO ledger_header
           (sequence, ledger_range, closed_at, created_at, ledger_hash, previous_ledger_hash,
            protocol_version, total_coins, fee_pool, base_fee, base_reserve, max_tx_set_size,
            tx_count, successful_tx_count, failed_tx_count, evicted_keys_count)
           VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16)
           ON CONFLICT (sequence) DO UPDATE SET
             ledger_hash = EXCLUDED.ledger_hash,
             previous_ledger_hash = EXCLUDED.previous_ledger_hash,
             tx_count = EXCLUDED.tx_count,
             successful_tx_count = EXCLUDED.successful_tx_count,
             failed_tx_count = EXCLUDED.failed_tx_count,
             evicted_keys_count = EXCLUDED.evicted_keys_count"#,
    )
    .bind(row.sequence as i64)
    .bind(row.meta.ledger_range as i64)
    .bind(row.meta.closed_at)
    .bind(row.meta.created_at)
    .bind(&row.ledger_hash)
    .bind(&row.previous_ledger_hash)
    .bind(row.protocol_version as i32)
    .bind(row.total_coins)
    .bind(row.fee_pool)
    .bind(row.base_fee as i32)
    .bind(row.base_reserve as i32)
    .bind(row.max_tx_set_size as i32)
    .bind(row.tx_count as i32)
    .bind(row.successful_tx_count as i32)
    .bind(row.failed_tx_count as i32)
    .bind(row.evicted_keys_count.map(|v| v as i32))
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn transactions(tx: &mut Transaction<'_, Postgres>, rows: &[TransactionRow]) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO transaction (tx_hash, ledger_sequence, ledger_range, closed_at, created_at, \
         source_account, fee_charged, max_fee, sequence_number, memo, successful, result_code, \
         operation_count, envelope_xdr, result_xdr, tx_meta_xdr, soroban_resource_fee, \
         soroban_instructions, muxed_source_account) ",
    );
    qb.push_values(rows, |mut b, r| {
        b.push_bind(&r.tx_hash)
            .push_bind(r.meta.ledger_sequence as i64)
            .push_bind(r.meta.ledger_range as i64)
            .push_bind(r.meta.closed_at)
            .push_bind(r.meta.created_at)
            .push_bind(&r.source_account)
            .push_bind(r.fee_charged)
            .push_bind(r.max_fee)
            .push_bind(r.sequence_number)
            .push_bind(&r.memo)
            .push_bind(r.successful)
            .push_bind(&r.result_code)
            .push_bind(r.operation_count as i32)
            .push_bind(&r.envelope_xdr)
            .push_bind(&r.result_xdr)
            .push_bind(&r.tx_meta_xdr)
            .push_bind(r.soroban_resource_fee)
            .push_bind(r.soroban_instructions.map(|v| v as i64))
            .push_bind(&r.muxed_source_account);
    });
    qb.push(" ON CONFLICT (tx_hash) DO NOTHING");
    qb.build().execute(&mut **tx).await?;
    Ok(())
}

pub async fn operations(tx: &mut Transaction<'_, Postgres>, rows: &[OperationRow]) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO operation (tx_hash, op_index, ledger_sequence, ledger_range, closed_at, \
         created_at, type_code, type_string, source_account, successful, details_json, \
         contract_calls_json, contracts_involved, max_call_depth) ",
    );
    qb.push_values(rows, |mut b, r| {
        b.push_bind(&r.tx_hash)
            .push_bind(r.op_index as i32)
            .push_bind(r.meta.ledger_sequence as i64)
            .push_bind(r.meta.ledger_range as i64)
            .push_bind(r.meta.closed_at)
            .push_bind(r.meta.created_at)
            .push_bind(r.type_code)
            .push_bind(r.type_string)
            .push_bind(&r.source_account)
            .push_bind(r.successful)
            .push_bind(&r.details_json)
            .push_bind(&r.contract_calls_json)
            .push_bind(&r.contracts_involved)
            .push_bind(r.max_call_depth as i32);
    });
    qb.push(" ON CONFLICT (tx_hash, op_index) DO NOTHING");
    qb.build().execute(&mut **tx).await?;
    Ok(())
}

pub async fn effects(tx: &mut Transaction<'_, Postgres>, rows: &[EffectRow]) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO effect (tx_hash, op_index, effect_index, ledger_sequence, ledger_range, \
         closed_at, created_at, effect_type, account_id, details_json) ",
    );
    qb.push_values(rows, |mut b, r| {
        b.push_bind(&r.tx_hash)
            .push_bind(r.op_index as i32)
            .push_bind(r.effect_index as i32)
            .push_bind(r.meta.ledger_sequence as i64)
            .push_bind(r.meta.ledger_range as i64)
            .push_bind(r.meta.closed_at)
            .push_bind(r.meta.created_at)
            .push_bind(r.effect_type)
            .push_bind(&r.account_id)
            .push_bind(&r.details_json);
    });
    qb.push(" ON CONFLICT (tx_hash, op_index, effect_index) DO NOTHING");
    qb.build().execute(&mut **tx).await?;
    Ok(())
}

pub async fn trades(tx: &mut Transaction<'_, Postgres>, rows: &[TradeRow]) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO trade (ledger_sequence, tx_hash, op_index, trade_index, ledger_range, \
         closed_at, created_at, seller_id, buyer_id, sold_asset_code, sold_asset_issuer, \
         sold_amount, bought_asset_code, bought_asset_issuer, bought_amount) ",
    );
    qb.push_values(rows, |mut b, r| {
        b.push_bind(r.meta.ledger_sequence as i64)
            .push_bind(&r.tx_hash)
            .push_bind(r.op_index as i32)
            .push_bind(r.trade_index as i32)
            .push_bind(r.meta.ledger_range as i64)
            .push_bind(r.meta.closed_at)
            .push_bind(r.meta.created_at)
            .push_bind(&r.seller_id)
            .push_bind(&r.buyer_id)
            .push_bind(&r.sold_asset_code)
            .push_bind(&r.sold_asset_issuer)
            .push_bind(r.sold_amount)
            .push_bind(&r.bought_asset_code)
            .push_bind(&r.bought_asset_issuer)
            .push_bind(r.bought_amount);
    });
    qb.push(" ON CONFLICT (ledger_sequence, tx_hash, op_index, trade_index) DO NOTHING");
    qb.build().execute(&mut **tx).await?;
    Ok(())
}

pub async fn account_snapshots(tx: &mut Transaction<'_, Postgres>, rows: &[AccountSnapshotRow]) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO account_snapshot (account_id, ledger_sequence, ledger_range, closed_at, \
         created_at, balance, sequence_number, num_subentries, inflation_dest, home_domain, \
         master_weight, threshold_low, threshold_medium, threshold_high, deleted) ",
    );
    qb.push_values(rows, |mut b, r| {
        b.push_bind(&r.account_id)
            .push_bind(r.meta.ledger_sequence as i64)
            .push_bind(r.meta.ledger_range as i64)
            .push_bind(r.meta.closed_at)
            .push_bind(r.meta.created_at)
            .push_bind(r.balance)
            .push_bind(r.sequence_number)
            .push_bind(r.num_subentries as i32)
            .push_bind(&r.inflation_dest)
            .push_bind(&r.home_domain)
            .push_bind(r.master_weight as i32)
            .push_bind(r.threshold_low as i32)
            .push_bind(r.threshold_medium as i32)
            .push_bind(r.threshold_high as i32)
            .push_bind(r.deleted);
    });
    qb.push(
        " ON CONFLICT (account_id) DO UPDATE SET \
          ledger_sequence = EXCLUDED.ledger_sequence, ledger_range = EXCLUDED.ledger_range, \
          closed_at = EXCLUDED.closed_at, balance = EXCLUDED.balance, \
          sequence_number = EXCLUDED.sequence_number, num_subentries = EXCLUDED.num_subentries, \
          inflation_dest = EXCLUDED.inflation_dest, home_domain = EXCLUDED.home_domain, \
          master_weight = EXCLUDED.master_weight, threshold_low = EXCLUDED.threshold_low, \
          threshold_medium = EXCLUDED.threshold_medium, threshold_high = EXCLUDED.threshold_high, \
          deleted = EXCLUDED.deleted",
    );
    qb.build().execute(&mut **tx).await?;
    Ok(())
}

pub async fn trustline_snapshots(tx: &mut Transaction<'_, Postgres>, rows: &[TrustlineSnapshotRow]) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO trustline_snapshot (account_id, asset_code, asset_issuer, ledger_sequence, \
         ledger_range, closed_at, created_at, balance, \"limit\", flags, deleted) ",
    );
    qb.push_values(rows, |mut b, r| {
        b.push_bind(&r.account_id)
            .push_bind(&r.asset_code)
            .push_bind(&r.asset_issuer)
            .push_bind(r.meta.ledger_sequence as i64)
            .push_bind(r.meta.ledger_range as i64)
            .push_bind(r.meta.closed_at)
            .push_bind(r.meta.created_at)
            .push_bind(r.balance)
            .push_bind(r.limit)
            .push_bind(r.flags as i32)
            .push_bind(r.deleted);
    });
    qb.push(
        " ON CONFLICT (account_id, asset_code, asset_issuer) DO UPDATE SET \
          ledger_sequence = EXCLUDED.ledger_sequence, ledger_range = EXCLUDED.ledger_range, \
          closed_at = EXCLUDED.closed_at, balance = EXCLUDED.balance, \"limit\" = EXCLUDED.\"limit\", \
          flags = EXCLUDED.flags, deleted = EXCLUDED.deleted",
    );
    qb.build().execute(&mut **tx).await?;
    Ok(())
}

pub async fn native_balances(tx: &mut Transaction<'_, Postgres>, rows: &[NativeBalanceRow]) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO native_balance (account_id, ledger_sequence, ledger_range, closed_at, created_at, balance) ",
    );
    qb.push_values(rows, |mut b, r| {
        b.push_bind(&r.account_id)
            .push_bind(r.meta.ledger_sequence as i64)
            .push_bind(r.meta.ledger_range as i64)
            .push_bind(r.meta.closed_at)
            .push_bind(r.meta.created_at)
            .push_bind(r.balance);
    });
    qb.push(
        " ON CONFLICT (account_id) DO UPDATE SET \
          ledger_sequence = EXCLUDED.ledger_sequence, ledger_range = EXCLUDED.ledger_range, \
          closed_at = EXCLUDED.closed_at, balance = EXCLUDED.balance",
    );
    qb.build().execute(&mut **tx).await?;
    Ok(())
}

pub async fn account_signers(tx: &mut Transaction<'_, Postgres>, rows: &[AccountSignerRow]) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO account_signer (account_id, signer_key, ledger_sequence, ledger_range, \
         closed_at, created_at, weight, deleted) ",
    );
    qb.push_values(rows, |mut b, r| {
        b.push_bind(&r.account_id)
            .push_bind(&r.signer_key)
            .push_bind(r.meta.ledger_sequence as i64)
            .push_bind(r.meta.ledger_range as i64)
            .push_bind(r.meta.closed_at)
            .push_bind(r.meta.created_at)
            .push_bind(r.weight as i32)
            .push_bind(r.deleted);
    });
    qb.push(
        " ON CONFLICT (account_id, signer_key) DO UPDATE SET \
          ledger_sequence = EXCLUDED.ledger_sequence, ledger_range = EXCLUDED.ledger_range, \
          closed_at = EXCLUDED.closed_at, weight = EXCLUDED.weight, deleted = EXCLUDED.deleted",
    );
    qb.build().execute(&mut **tx).await?;
    Ok(())
}

pub async fn offers(tx: &mut Transaction<'_, Postgres>, rows: &[OfferRow]) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO offer (offer_id, ledger_sequence, ledger_range, closed_at, created_at, \
         seller_id, selling_asset_code, selling_asset_issuer, buying_asset_code, \
         buying_asset_issuer, amount, price_n, price_d, flags, deleted) ",
    );
    qb.push_values(rows, |mut b, r| {
        b.push_bind(r.offer_id)
            .push_bind(r.meta.ledger_sequence as i64)
            .push_bind(r.meta.ledger_range as i64)
            .push_bind(r.meta.closed_at)
            .push_bind(r.meta.created_at)
            .push_bind(&r.seller_id)
            .push_bind(&r.selling_asset_code)
            .push_bind(&r.selling_asset_issuer)
            .push_bind(&r.buying_asset_code)
            .push_bind(&r.buying_asset_issuer)
            .push_bind(r.amount)
            .push_bind(r.price_n)
            .push_bind(r.price_d)
            .push_bind(r.flags as i32)
            .push_bind(r.deleted);
    });
    qb.push(
        " ON CONFLICT (offer_id) DO UPDATE SET \
          ledger_sequence = EXCLUDED.ledger_sequence, ledger_range = EXCLUDED.ledger_range, \
          closed_at = EXCLUDED.closed_at, amount = EXCLUDED.amount, price_n = EXCLUDED.price_n, \
          price_d = EXCLUDED.price_d, flags = EXCLUDED.flags, deleted = EXCLUDED.deleted",
    );
    qb.build().execute(&mut **tx).await?;
    Ok(())
}

pub async fn liquidity_pools(tx: &mut Transaction<'_, Postgres>, rows: &[LiquidityPoolRow]) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO liquidity_pool (pool_id, ledger_sequence, ledger_range, closed_at, \
         created_at, asset_a_code, asset_a_issuer, asset_b_code, asset_b_issuer, reserve_a, \
         reserve_b, total_pool_shares, pool_shares_trust_line_count, fee_bp, deleted) ",
    );
    qb.push_values(rows, |mut b, r| {
        b.push_bind(&r.pool_id)
            .push_bind(r.meta.ledger_sequence as i64)
            .push_bind(r.meta.ledger_range as i64)
            .push_bind(r.meta.closed_at)
            .push_bind(r.meta.created_at)
            .push_bind(&r.asset_a_code)
            .push_bind(&r.asset_a_issuer)
            .push_bind(&r.asset_b_code)
            .push_bind(&r.asset_b_issuer)
            .push_bind(r.reserve_a)
            .push_bind(r.reserve_b)
            .push_bind(r.total_pool_shares)
            .push_bind(r.pool_shares_trust_line_count)
            .push_bind(r.fee_bp as i32)
            .push_bind(r.deleted);
    });
    qb.push(
        " ON CONFLICT (pool_id) DO UPDATE SET \
          ledger_sequence = EXCLUDED.ledger_sequence, ledger_range = EXCLUDED.ledger_range, \
          closed_at = EXCLUDED.closed_at, reserve_a = EXCLUDED.reserve_a, \
          reserve_b = EXCLUDED.reserve_b, total_pool_shares = EXCLUDED.total_pool_shares, \
          pool_shares_trust_line_count = EXCLUDED.pool_shares_trust_line_count, \
          deleted = EXCLUDED.deleted",
    );
    qb.build().execute(&mut **tx).await?;
    Ok(())
}

pub async fn claimable_balances(tx: &mut Transaction<'_, Postgres>, rows: &[ClaimableBalanceRow]) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO claimable_balance (balance_id, ledger_sequence, ledger_range, closed_at, \
         created_at, asset_code, asset_issuer, amount, sponsor, claimants_json, deleted) ",
    );
    qb.push_values(rows, |mut b, r| {
        b.push_bind(&r.balance_id)
            .push_bind(r.meta.ledger_sequence as i64)
            .push_bind(r.meta.ledger_range as i64)
            .push_bind(r.meta.closed_at)
            .push_bind(r.meta.created_at)
            .push_bind(&r.asset_code)
            .push_bind(&r.asset_issuer)
            .push_bind(r.amount)
            .push_bind(&r.sponsor)
            .push_bind(&r.claimants_json)
            .push_bind(r.deleted);
    });
    qb.push(
        " ON CONFLICT (balance_id) DO UPDATE SET \
          ledger_sequence = EXCLUDED.ledger_sequence, ledger_range = EXCLUDED.ledger_range, \
          closed_at = EXCLUDED.closed_at, amount = EXCLUDED.amount, \
          claimants_json = EXCLUDED.claimants_json, deleted = EXCLUDED.deleted",
    );
    qb.build().execute(&mut **tx).await?;
    Ok(())
}

pub async fn contract_events(tx: &mut Transaction<'_, Postgres>, rows: &[ContractEventRow]) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO contract_event (event_id, ledger_sequence, ledger_range, closed_at, \
         created_at, tx_hash, tx_index, op_index, event_index, contract_id, event_type, \
         topics_raw, topics_json, data_raw, data_json) ",
    );
    qb.push_values(rows, |mut b, r| {
        b.push_bind(&r.event_id)
            .push_bind(r.meta.ledger_sequence as i64)
            .push_bind(r.meta.ledger_range as i64)
            .push_bind(r.meta.closed_at)
            .push_bind(r.meta.created_at)
            .push_bind(&r.tx_hash)
            .push_bind(r.tx_index as i32)
            .push_bind(r.op_index as i32)
            .push_bind(r.event_index as i32)
            .push_bind(&r.contract_id)
            .push_bind(r.event_type)
            .push_bind(&r.topics_raw)
            .push_bind(&r.topics_json)
            .push_bind(&r.data_raw)
            .push_bind(&r.data_json);
    });
    // No natural-key conflict target per spec §4.2 ("no dedup"); `event_id`
    // is still unique so replay is idempotent via DO NOTHING.
    qb.push(" ON CONFLICT (event_id) DO NOTHING");
    qb.build().execute(&mut **tx).await?;
    Ok(())
}

pub async fn contract_data(tx: &mut Transaction<'_, Postgres>, rows: &[ContractDataRow]) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO contract_data (contract_id, key_hash, ledger_sequence, ledger_range, \
         closed_at, created_at, durability, key_xdr, value_xdr, is_sac, asset_code, \
         asset_issuer, asset_type, balance_holder, balance, deleted) ",
    );
    qb.push_values(rows, |mut b, r| {
        b.push_bind(&r.contract_id)
            .push_bind(&r.key_hash)
            .push_bind(r.meta.ledger_sequence as i64)
            .push_bind(r.meta.ledger_range as i64)
            .push_bind(r.meta.closed_at)
            .push_bind(r.meta.created_at)
            .push_bind(r.durability)
            .push_bind(&r.key_xdr)
            .push_bind(&r.value_xdr)
            .push_bind(r.is_sac)
            .push_bind(&r.asset_code)
            .push_bind(&r.asset_issuer)
            .push_bind(r.asset_type)
            .push_bind(&r.balance_holder)
            .push_bind(&r.balance)
            .push_bind(r.deleted);
    });
    qb.push(
        " ON CONFLICT (contract_id, key_hash) DO UPDATE SET \
          ledger_sequence = EXCLUDED.ledger_sequence, ledger_range = EXCLUDED.ledger_range, \
          closed_at = EXCLUDED.closed_at, value_xdr = EXCLUDED.value_xdr, \
          is_sac = EXCLUDED.is_sac, asset_code = EXCLUDED.asset_code, \
          asset_issuer = EXCLUDED.asset_issuer, asset_type = EXCLUDED.asset_type, \
          balance_holder = EXCLUDED.balance_holder, balance = EXCLUDED.balance, \
          deleted = EXCLUDED.deleted",
    );
    qb.build().execute(&mut **tx).await?;
    Ok(())
}

pub async fn contract_code(tx: &mut Transaction<'_, Postgres>, rows: &[ContractCodeRow]) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO contract_code (code_hash, ledger_sequence, ledger_range, closed_at, \
         created_at, size_bytes, n_instructions, n_functions, n_globals, n_table_entries, \
         n_types, n_data_segments, n_elem_segments, n_imports, n_exports, \
         n_data_segment_bytes, deleted) ",
    );
    qb.push_values(rows, |mut b, r| {
        b.push_bind(&r.code_hash)
            .push_bind(r.meta.ledger_sequence as i64)
            .push_bind(r.meta.ledger_range as i64)
            .push_bind(r.meta.closed_at)
            .push_bind(r.meta.created_at)
            .push_bind(r.size_bytes as i32)
            .push_bind(r.n_instructions.map(|v| v as i64))
            .push_bind(r.n_functions.map(|v| v as i32))
            .push_bind(r.n_globals.map(|v| v as i32))
            .push_bind(r.n_table_entries.map(|v| v as i32))
            .push_bind(r.n_types.map(|v| v as i32))
            .push_bind(r.n_data_segments.map(|v| v as i32))
            .push_bind(r.n_elem_segments.map(|v| v as i32))
            .push_bind(r.n_imports.map(|v| v as i32))
            .push_bind(r.n_exports.map(|v| v as i32))
            .push_bind(r.n_data_segment_bytes.map(|v| v as i64))
            .push_bind(r.deleted);
    });
    qb.push(
        " ON CONFLICT (code_hash) DO UPDATE SET \
          ledger_sequence = EXCLUDED.ledger_sequence, ledger_range = EXCLUDED.ledger_range, \
          closed_at = EXCLUDED.closed_at, deleted = EXCLUDED.deleted",
    );
    qb.build().execute(&mut **tx).await?;
    Ok(())
}

pub async fn config_settings(tx: &mut Transaction<'_, Postgres>, rows: &[ConfigSettingRow]) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO config_setting (setting_id, ledger_sequence, ledger_range, closed_at, created_at, value_json) ",
    );
    qb.push_values(rows, |mut b, r| {
        b.push_bind(&r.setting_id)
            .push_bind(r.meta.ledger_sequence as i64)
            .push_bind(r.meta.ledger_range as i64)
            .push_bind(r.meta.closed_at)
            .push_bind(r.meta.created_at)
            .push_bind(&r.value_json);
    });
    qb.push(
        " ON CONFLICT (setting_id) DO UPDATE SET \
          ledger_sequence = EXCLUDED.ledger_sequence, ledger_range = EXCLUDED.ledger_range, \
          closed_at = EXCLUDED.closed_at, value_json = EXCLUDED.value_json",
    );
    qb.build().execute(&mut **tx).await?;
    Ok(())
}

pub async fn ttls(tx: &mut Transaction<'_, Postgres>, rows: &[TtlRow]) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO ttl (key_hash, ledger_sequence, ledger_range, closed_at, created_at, live_until_ledger_seq, deleted) ",
    );
    qb.push_values(rows, |mut b, r| {
        b.push_bind(&r.key_hash)
            .push_bind(r.meta.ledger_sequence as i64)
            .push_bind(r.meta.ledger_range as i64)
            .push_bind(r.meta.closed_at)
            .push_bind(r.meta.created_at)
            .push_bind(r.live_until_ledger_seq as i64)
            .push_bind(r.deleted);
    });
    qb.push(
        " ON CONFLICT (key_hash) DO UPDATE SET \
          ledger_sequence = EXCLUDED.ledger_sequence, ledger_range = EXCLUDED.ledger_range, \
          closed_at = EXCLUDED.closed_at, live_until_ledger_seq = EXCLUDED.live_until_ledger_seq, \
          deleted = EXCLUDED.deleted",
    );
    qb.build().execute(&mut **tx).await?;
    Ok(())
}

pub async fn evicted_keys(tx: &mut Transaction<'_, Postgres>, rows: &[EvictedKeyRow]) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO evicted_key (key_hash, ledger_sequence, ledger_range, closed_at, created_at, key_xdr) ",
    );
    qb.push_values(rows, |mut b, r| {
        b.push_bind(&r.key_hash)
            .push_bind(r.meta.ledger_sequence as i64)
            .push_bind(r.meta.ledger_range as i64)
            .push_bind(r.meta.closed_at)
            .push_bind(r.meta.created_at)
            .push_bind(&r.key_xdr);
    });
    qb.push(" ON CONFLICT (key_hash) DO NOTHING");
    qb.build().execute(&mut **tx).await?;
    Ok(())
}

pub async fn restored_keys(tx: &mut Transaction<'_, Postgres>, rows: &[RestoredKeyRow]) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO restored_key (key_hash, ledger_sequence, ledger_range, closed_at, created_at, restored_from_ledger) ",
    );
    qb.push_values(rows, |mut b, r| {
        b.push_bind(&r.key_hash)
            .push_bind(r.meta.ledger_sequence as i64)
            .push_bind(r.meta.ledger_range as i64)
            .push_bind(r.meta.closed_at)
            .push_bind(r.meta.created_at)
            .push_bind(r.restored_from_ledger.map(|v| v as i64));
    });
    qb.push(
        " ON CONFLICT (key_hash) DO UPDATE SET \
          ledger_sequence = EXCLUDED.ledger_sequence, ledger_range = EXCLUDED.ledger_range, \
          closed_at = EXCLUDED.closed_at, restored_from_ledger = EXCLUDED.restored_from_ledger",
    );
    qb.build().execute(&mut **tx).await?;
    Ok(())
}
