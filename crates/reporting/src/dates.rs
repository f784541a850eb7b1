use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

/// India Standard Time, UTC+05:30.
pub const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

pub fn ist() -> FixedOffset {
    FixedOffset::east_opt(IST_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// `19/10/2026`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// `19 Oct 2026`
pub fn format_date_long(date: NaiveDate) -> String {
    date.format("%d %b %Y").to_string()
}

/// `19 Oct 2026, 02:05 PM` in IST.
pub fn format_datetime(at: DateTime<Utc>) -> String {
    at.with_timezone(&ist()).format("%d %b %Y, %I:%M %p").to_string()
}

/// Relative wording for activity feeds. Future timestamps read as "just now";
/// anything 30 days or older falls back to a date.
pub fn time_ago(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - at).num_seconds();
    if secs < 0 {
        return "just now".to_string();
    }
    let (n, unit) = match secs {
        0..=59 => return "just now".to_string(),
        60..=3599 => (secs / 60, "minute"),
        3600..=86_399 => (secs / 3600, "hour"),
        _ if secs < 30 * 86_400 => (secs / 86_400, "day"),
        _ => return format_date_long(at.with_timezone(&ist()).date_naive()),
    };
    let plural = if n == 1 { "" } else { "s" };
    format!("{n} {unit}{plural} ago")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, h, m, 0).unwrap()
    }

    #[test]
    fn dates() {
        let d = NaiveDate::from_ymd_opt(2026, 10, 9).unwrap();
        assert_eq!(format_date(d), "09/10/2026");
        assert_eq!(format_date_long(d), "09 Oct 2026");
    }

    #[test]
    fn datetime_is_rendered_in_ist() {
        assert_eq!(format_datetime(at(8, 35)), "19 Oct 2026, 02:05 PM");
        assert_eq!(format_datetime(at(20, 0)), "20 Oct 2026, 01:30 AM");
    }

    #[test]
    fn relative_times() {
        let now = at(12, 0);
        assert_eq!(time_ago(now - Duration::seconds(30), now), "just now");
        assert_eq!(time_ago(now - Duration::minutes(1), now), "1 minute ago");
        assert_eq!(time_ago(now - Duration::minutes(5), now), "5 minutes ago");
        assert_eq!(time_ago(now - Duration::hours(3), now), "3 hours ago");
        assert_eq!(time_ago(now - Duration::days(3), now), "3 days ago");
        assert_eq!(time_ago(now + Duration::minutes(2), now), "just now");
        assert_eq!(time_ago(now - Duration::days(45), now), "04 Sep 2026");
    }
}
