//! Glob-lite matcher for invocation filter argument patterns (spec §4.5
//! "wildcarded argument patterns (`*prefix*`, `suffix*`)"). Only a leading
//! and/or trailing `*` is recognized - no general glob engine, since that's
//! all the filter surface asks for.

/// Match `value` against `pattern`. A `*` at the start means "ends with",
/// a `*` at the end means "starts with", both means "contains", and neither
/// means an exact match.
pub fn matches(pattern: &str, value: &str) -> bool {
    let leading = pattern.starts_with('*');
    let trailing = pattern.ends_with('*') && pattern.len() > 1;
    let core = pattern.trim_start_matches('*').trim_end_matches('*');
    match (leading, trailing) {
        (true, true) => value.contains(core),
        (true, false) => value.ends_with(core),
        (false, true) => value.starts_with(core),
        (false, false) => value == core,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_pattern() {
        assert!(matches("*swap*", "multi_hop_swap_exact"));
        assert!(!matches("*swap*", "transfer"));
    }

    #[test]
    fn prefix_pattern() {
        assert!(matches("transfer*", "transfer_from"));
        assert!(!matches("transfer*", "batch_transfer"));
    }

    #[test]
    fn suffix_pattern() {
        assert!(matches("*_from", "transfer_from"));
        assert!(!matches("*_from", "from_transfer"));
    }

    #[test]
    fn exact_pattern() {
        assert!(matches("swap", "swap"));
        assert!(!matches("swap", "swapped"));
    }
}
