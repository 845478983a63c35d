// Coerce-or-drop normalization
// Applied at load, at import and again before aggregation

use crate::record::{ExpenseRecord, LedgerRow};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

/// Timestamp layouts tried in order after RFC 3339.
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Date-only layouts; the time of day becomes midnight.
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Parse a `Date` cell. `None` for anything unrecognized.
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .map(|d| d.and_time(NaiveTime::MIN))
}

/// Parse an `Amount` cell. Non-finite values count as unparseable.
pub fn parse_amount(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite())
}

/// Keep only rows whose date and amount are both present.
///
/// Idempotent: `normalize` of the rows of a normalized table is that table.
pub fn normalize(rows: &[LedgerRow]) -> Vec<ExpenseRecord> {
    let records: Vec<ExpenseRecord> = rows
        .iter()
        .filter_map(|row| match (row.date, row.amount) {
            (Some(date), Some(amount)) => Some(ExpenseRecord {
                date,
                category: row.category.clone(),
                amount,
                description: row.description.clone(),
            }),
            _ => None,
        })
        .collect();

    let dropped = rows.len() - records.len();
    if dropped > 0 {
        tracing::debug!(dropped, kept = records.len(), "dropped rows with missing date or amount");
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_time(NaiveTime::MIN)
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2024-01-01"), Some(ymd(2024, 1, 1)));
        assert_eq!(parse_date(" 2024-01-01 00:00:00 "), Some(ymd(2024, 1, 1)));
        assert_eq!(parse_date("01/15/2025"), Some(ymd(2025, 1, 15)));
        assert_eq!(parse_date("2024/02/29"), Some(ymd(2024, 2, 29)));
        assert_eq!(
            parse_date("2024-03-05T14:30:00"),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap().and_hms_opt(14, 30, 0)
        );
        assert_eq!(
            parse_date("2024-03-05T14:30:00+02:00"),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap().and_hms_opt(14, 30, 0)
        );
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert_eq!(parse_date("not-a-date"), None);
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("2024-13-01"), None);
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("100"), Some(100.0));
        assert_eq!(parse_amount(" -45.99 "), Some(-45.99));
        assert_eq!(parse_amount("0"), Some(0.0));
        assert_eq!(parse_amount("1e3"), Some(1000.0));
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("NaN"), None);
        assert_eq!(parse_amount("inf"), None);
    }

    #[test]
    fn test_normalize_drops_incomplete_rows() {
        let rows = vec![
            LedgerRow {
                date: Some(ymd(2024, 1, 1)),
                category: "Food".to_string(),
                amount: Some(100.0),
                description: String::new(),
            },
            LedgerRow {
                date: None,
                category: "Food".to_string(),
                amount: Some(50.0),
                description: String::new(),
            },
            LedgerRow {
                date: Some(ymd(2024, 1, 2)),
                category: "Travel".to_string(),
                amount: None,
                description: "bus".to_string(),
            },
        ];

        let records = normalize(&rows);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].amount, 100.0);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let rows = vec![
            LedgerRow {
                date: Some(ymd(2024, 1, 1)),
                category: "Food".to_string(),
                amount: Some(12.5),
                description: "lunch".to_string(),
            },
            LedgerRow {
                date: None,
                category: "Bills".to_string(),
                amount: Some(80.0),
                description: String::new(),
            },
        ];

        let once = normalize(&rows);
        let again_rows: Vec<LedgerRow> = once.iter().cloned().map(LedgerRow::from).collect();
        let twice = normalize(&again_rows);

        assert_eq!(once, twice);
    }
}
