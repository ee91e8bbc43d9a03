//! Within-ledger deduplication, keeping the last observed state per natural
//! key (spec §3.1, §4.2 dedup table).

use std::collections::HashMap;
use std::hash::Hash;

/// Deduplicate `rows` by `key_fn`, keeping the last occurrence for each key
/// while preserving the relative order of first appearance. Streams with no
/// natural key (transaction, operation, effect, trade, contract event) never
/// call this.
pub fn dedup_last_by<T, K, F>(rows: Vec<T>, key_fn: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut last_index: HashMap<K, usize> = HashMap::new();
    for (i, row) in rows.iter().enumerate() {
        last_index.insert(key_fn(row), i);
    }
    let mut keep: Vec<bool> = vec![false; rows.len()];
    for &i in last_index.values() {
        keep[i] = true;
    }
    rows.into_iter()
        .zip(keep)
        .filter_map(|(row, k)| k.then_some(row))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_last_occurrence_per_key() {
        let rows = vec![(1, "a"), (2, "b"), (1, "c")];
        let deduped = dedup_last_by(rows, |r| r.0);
        assert_eq!(deduped, vec![(2, "b"), (1, "c")]);
    }

    #[test]
    fn empty_input_stays_empty() {
        let rows: Vec<(i32, &str)> = vec![];
        assert!(dedup_last_by(rows, |r| r.0).is_empty());
    }
}
