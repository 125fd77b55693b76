//! Verification helpers over captured command lines.

/// Asserts that `needle` appears exactly once in the captured lines.
pub fn assert_line_once(lines: &[String], needle: &str) {
    let count = lines.iter().filter(|l| l.as_str() == needle).count();
    assert_eq!(
        count, 1,
        "expected exactly one '{needle}' in {lines:?}, found {count}"
    );
}

/// Asserts that `first` is emitted before `second`.
pub fn assert_ordered(lines: &[String], first: &str, second: &str) {
    let pos = |needle: &str| {
        lines
            .iter()
            .position(|l| l == needle)
            .unwrap_or_else(|| panic!("missing '{needle}' in {lines:?}"))
    };
    assert!(
        pos(first) < pos(second),
        "expected '{first}' before '{second}' in {lines:?}"
    );
}

/// Asserts that every `unset` line (a `no `-prefixed line for the given
/// stem) precedes every matching set line.
pub fn assert_unsets_before_sets(lines: &[String], stem: &str) {
    let last_unset = lines
        .iter()
        .rposition(|l| l.starts_with("no ") && l.contains(stem));
    let first_set = lines
        .iter()
        .position(|l| !l.starts_with("no ") && l.starts_with(stem));
    if let (Some(last_unset), Some(first_set)) = (last_unset, first_set) {
        assert!(
            last_unset < first_set,
            "expected removals before additions for '{stem}' in {lines:?}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_assert_ordered() {
        let lines = lines(&["no confederation peers 1", "confederation peers 3"]);
        assert_ordered(&lines, "no confederation peers 1", "confederation peers 3");
    }

    #[test]
    fn test_assert_unsets_before_sets() {
        let lines = lines(&[
            "router bgp 65537",
            "no confederation peers 1",
            "confederation peers 3",
        ]);
        assert_unsets_before_sets(&lines, "confederation peers");
    }

    #[test]
    #[should_panic(expected = "expected removals before additions")]
    fn test_assert_unsets_before_sets_panics_on_violation() {
        let lines = lines(&["confederation peers 3", "no confederation peers 1"]);
        assert_unsets_before_sets(&lines, "confederation peers");
    }
}
