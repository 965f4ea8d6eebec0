/// Coerce one locale-formatted cell into a number.
///
/// Blank cells and a lone `-` are missing. `%` is stripped and `,` becomes
/// the decimal point; anything that still fails to parse (or parses to a
/// non-finite value) is missing as well. Note that `"1.234,5"` therefore
/// becomes `"1.234.5"` and is missing: grouping dots are not supported.
pub fn normalize_cell(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return None;
    }
    let cleaned = trimmed.replace('%', "").replace(',', ".");
    cleaned.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn normalize_column<S: AsRef<str>>(raw: &[S]) -> Vec<Option<f64>> {
    raw.iter().map(|s| normalize_cell(s.as_ref())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_are_missing() {
        for s in ["", "-", " ", "  -  ", "\t"] {
            assert_eq!(normalize_cell(s), None, "{:?}", s);
        }
    }

    #[test]
    fn test_percent_and_comma_decimal() {
        assert_eq!(normalize_cell("1,23%"), Some(1.23));
        assert_eq!(normalize_cell(" -4,5 % "), Some(-4.5));
        assert_eq!(normalize_cell("12"), Some(12.0));
    }

    #[test]
    fn test_space_before_percent() {
        assert_eq!(normalize_cell("4,5 %"), Some(4.5));
        assert_eq!(normalize_cell("12,50 %"), Some(12.5));
        assert_eq!(normalize_cell("1,5\u{a0}%"), Some(1.5));
    }

    #[test]
    fn test_grouping_separators_are_missing() {
        assert_eq!(normalize_cell("1.234,5"), None);
        assert_eq!(normalize_cell("1,234,5"), None);
    }

    #[test]
    fn test_garbage_and_non_finite() {
        assert_eq!(normalize_cell("n/a"), None);
        assert_eq!(normalize_cell("inf"), None);
        assert_eq!(normalize_cell("NaN"), None);
    }

    #[test]
    fn test_column_keeps_length() {
        let out = normalize_column(&["1", "", "x", "2,5"]);
        assert_eq!(out, vec![Some(1.0), None, None, Some(2.5)]);
    }
}
