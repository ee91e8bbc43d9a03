//! Recursive `ScVal` -> JSON conversion (spec §4.2 "topics_json" / "data_json").
//!
//! Primitives pass through as JSON primitives, binary payloads become base64,
//! addresses become strkey, containers recurse. Anything this crate doesn't
//! know how to represent yet - never anything that should be silently
//! dropped - becomes `{"type": "...", "error": "..."}` so the row is still
//! emitted (spec §4.2 "never drop the row").

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Value};
use stellar_xdr::curr::{ScAddress, ScVal};

use crate::extract::strkey_util;

pub fn scval_to_json(val: &ScVal) -> Value {
    match val {
        ScVal::Bool(b) => json!(b),
        ScVal::Void => Value::Null,
        ScVal::U32(n) => json!(n),
        ScVal::I32(n) => json!(n),
        ScVal::U64(n) => json!(n.to_string()),
        ScVal::I64(n) => json!(n.to_string()),
        ScVal::Timepoint(t) => json!(t.0.to_string()),
        ScVal::Duration(d) => json!(d.0.to_string()),
        ScVal::U128(parts) => json!(u128_to_string(parts.hi, parts.lo)),
        ScVal::I128(parts) => json!(i128_to_string(parts.hi, parts.lo)),
        ScVal::U256(parts) => json!(format!(
            "{:016x}{:016x}{:016x}{:016x}",
            parts.hi_hi, parts.hi_lo, parts.lo_hi, parts.lo_lo
        )),
        ScVal::I256(parts) => json!(format!(
            "{:016x}{:016x}{:016x}{:016x}",
            parts.hi_hi, parts.hi_lo, parts.lo_hi, parts.lo_lo
        )),
        ScVal::Bytes(b) => json!(BASE64.encode(b.as_slice())),
        ScVal::String(s) => json!(s.to_utf8_string_lossy()),
        ScVal::Symbol(s) => json!(s.to_utf8_string_lossy()),
        ScVal::Vec(None) => Value::Null,
        ScVal::Vec(Some(items)) => Value::Array(items.iter().map(scval_to_json).collect()),
        ScVal::Map(None) => Value::Null,
        ScVal::Map(Some(entries)) => {
            let mut obj = serde_json::Map::new();
            for entry in entries.iter() {
                let key = scval_map_key(&entry.key);
                obj.insert(key, scval_to_json(&entry.val));
            }
            Value::Object(obj)
        }
        ScVal::Address(addr) => json!(address_to_strkey(addr)),
        ScVal::ContractInstance(_) => json!({"type": "contract_instance"}),
        ScVal::LedgerKeyContractInstance => json!({"type": "ledger_key_contract_instance"}),
        ScVal::LedgerKeyNonce(nonce) => json!({"type": "ledger_key_nonce", "nonce": nonce.nonce}),
        ScVal::Error(e) => json!({"type": "error", "error": format!("{:?}", e)}),
    }
}

/// Map keys must be strings in JSON; non-string ScVal keys are stringified
/// via their own JSON rendering rather than dropped.
fn scval_map_key(key: &ScVal) -> String {
    match key {
        ScVal::Symbol(s) => s.to_utf8_string_lossy(),
        ScVal::String(s) => s.to_utf8_string_lossy(),
        other => scval_to_json(other).to_string(),
    }
}

fn address_to_strkey(addr: &ScAddress) -> String {
    match addr {
        ScAddress::Account(account_id) => strkey_util::account_id_to_strkey(account_id),
        ScAddress::Contract(hash) => strkey_util::contract_id_to_strkey(hash),
        other => format!("{{unsupported-address:{:?}}}", std::mem::discriminant(other)),
    }
}

fn u128_to_string(hi: u64, lo: u64) -> String {
    (((hi as u128) << 64) | lo as u128).to_string()
}

fn i128_to_string(hi: i64, lo: u64) -> String {
    (((hi as i128) << 64) | lo as i128).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stellar_xdr::curr::{ScMap, ScMapEntry, ScSymbol, ScVec, StringM, VecM};

    #[test]
    fn primitives_pass_through() {
        assert_eq!(scval_to_json(&ScVal::Bool(true)), json!(true));
        assert_eq!(scval_to_json(&ScVal::Void), Value::Null);
        assert_eq!(scval_to_json(&ScVal::U32(7)), json!(7));
    }

    #[test]
    fn large_integers_are_stringified_to_avoid_precision_loss() {
        assert_eq!(scval_to_json(&ScVal::I64(-1)), json!("-1"));
    }

    #[test]
    fn vec_recurses_into_elements() {
        let items: VecM<ScVal> = vec![ScVal::U32(1), ScVal::U32(2)].try_into().unwrap();
        let vec_val = ScVal::Vec(Some(ScVec(items)));
        assert_eq!(scval_to_json(&vec_val), json!([1, 2]));
    }

    #[test]
    fn map_keys_are_stringified() {
        let entries: VecM<ScMapEntry> = vec![ScMapEntry {
            key: ScVal::Symbol(ScSymbol(StringM::try_from("count").unwrap())),
            val: ScVal::U32(5),
        }]
        .try_into()
        .unwrap();
        let map_val = ScVal::Map(Some(ScMap(entries)));
        let json = scval_to_json(&map_val);
        assert_eq!(json["count"], json!(5));
    }

    #[test]
    fn null_vec_and_map_are_null_not_dropped() {
        assert_eq!(scval_to_json(&ScVal::Vec(None)), Value::Null);
        assert_eq!(scval_to_json(&ScVal::Map(None)), Value::Null);
    }
}
