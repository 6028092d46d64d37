/// Upper bound appended to a prefix to form an inclusive range query
pub const PREFIX_RANGE_END: char = '\u{f8ff}';

/// Inclusive `[prefix, prefix + U+F8FF]` bounds for a prefix search
pub fn prefix_range(prefix: &str) -> (String, String) {
    let mut upper = String::with_capacity(prefix.len() + PREFIX_RANGE_END.len_utf8());
    upper.push_str(prefix);
    upper.push(PREFIX_RANGE_END);
    (prefix.to_string(), upper)
}

/// Lexical range check matching the store-side `$gte`/`$lte` filter
pub fn in_prefix_range(value: &str, prefix: &str) -> bool {
    let (lower, upper) = prefix_range(prefix);
    value >= lower.as_str() && value <= upper.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_range_bounds() {
        let (lo, hi) = prefix_range("a");
        assert_eq!(lo, "a");
        assert_eq!(hi, "a\u{f8ff}");
    }

    #[test]
    fn test_in_prefix_range() {
        assert!(in_prefix_range("alice@example.com", "a"));
        assert!(in_prefix_range("a", "a"));
        assert!(!in_prefix_range("bob@example.com", "a"));
        assert!(!in_prefix_range("Alice@example.com", "a"));
        assert!(in_prefix_range("alice@example.com", "ali"));
        assert!(!in_prefix_range("al", "ali"));
    }
}
