//! Dollar amount parsing.

/// Parses `"$1,500.00"`, `"1500"`, or `"$ 250"` into a non-negative amount.
///
/// Negative, non-finite, and unparseable values yield `None`.
#[must_use]
pub fn parse_money(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite() && *amount >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_formatted_amounts() {
        assert_eq!(parse_money("$1,500.00"), Some(1500.0));
        assert_eq!(parse_money(" 2000 "), Some(2000.0));
        assert_eq!(parse_money("$ 250"), Some(250.0));
        assert_eq!(parse_money("0"), Some(0.0));
    }

    #[test]
    fn rejects_negative_and_garbage() {
        assert_eq!(parse_money("-5"), None);
        assert_eq!(parse_money("NO BOND"), None);
        assert_eq!(parse_money(""), None);
    }
}
