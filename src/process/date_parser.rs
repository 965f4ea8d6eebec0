use chrono::{NaiveDate, NaiveDateTime};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y", "%d-%m-%Y", "%m/%d/%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d.%m.%Y %H:%M:%S"];

/// Parse a spreadsheet date cell. Time-of-day, when present, is dropped.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
                .map(|dt| dt.date())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_formats() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        for s in ["2024-03-07", "2024/03/07", "07.03.2024", "07-03-2024", "03/07/2024", " 2024-03-07 12:30:00 "] {
            assert_eq!(parse_date(s), Some(d), "{}", s);
        }
    }

    #[test]
    fn test_parse_date_rejects() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("soon"), None);
        assert_eq!(parse_date("2024-02-30"), None);
    }
}
