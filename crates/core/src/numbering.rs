use chrono::NaiveDate;

use crate::id::AggregateId;

/// Human-facing document number, `PREFIX-yyyymmdd-xxxxxx`.
///
/// The suffix is the last six hex digits of the record id (random bits of a
/// UUIDv7), so numbers are unique in practice without a counter.
pub fn document_number(prefix: &str, date: NaiveDate, id: &AggregateId) -> String {
    let hex = id.as_uuid().simple().to_string();
    let suffix = &hex[hex.len() - 6..];
    format!("{prefix}-{}-{suffix}", date.format("%Y%m%d"))
}

/// Suffix part of a number produced by [`document_number`].
pub fn document_suffix(number: &str) -> &str {
    number.rsplit('-').next().unwrap_or(number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn format_matches_prefix_date_suffix() {
        let id = AggregateId::from_uuid(
            Uuid::parse_str("0192f1c4-7a3b-7cde-8f00-0000deadbeef").unwrap(),
        );
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();

        let n = document_number("ORD", date, &id);
        assert_eq!(n, "ORD-20261019-adbeef");
        assert_eq!(document_suffix(&n), "adbeef");
    }
}
