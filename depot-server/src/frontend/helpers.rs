use chrono::{DateTime, Utc};

/// Describe how long ago `date` was, relative to `now`.
pub fn humanize_datetime(date: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(date);

    if elapsed.num_minutes() < 1 {
        return "just now".to_string();
    }
    if elapsed.num_hours() < 1 {
        return plural(elapsed.num_minutes(), "minute");
    }
    if elapsed.num_days() < 1 {
        return plural(elapsed.num_hours(), "hour");
    }
    if elapsed.num_days() < 30 {
        return plural(elapsed.num_days(), "day");
    }
    date.format("%Y-%m-%d").to_string()
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{count} {unit}s ago")
    }
}

/// Format a count with thousands separators (`1234567` → `1,234,567`).
pub fn format_count(count: i64) -> String {
    let digits = count.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if count < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Number of pages needed for `total` items.
pub fn page_count(total: i64, per_page: i64) -> i64 {
    ((total + per_page - 1) / per_page).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_humanize_datetime() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let cases = [
            (Duration::seconds(20), "just now"),
            (Duration::minutes(1), "1 minute ago"),
            (Duration::minutes(45), "45 minutes ago"),
            (Duration::hours(1), "1 hour ago"),
            (Duration::hours(23), "23 hours ago"),
            (Duration::days(3), "3 days ago"),
            (Duration::days(45), "2024-05-01"),
        ];
        for (ago, expected) in cases {
            assert_eq!(humanize_datetime(now - ago, now), expected);
        }
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(1234567), "1,234,567");
        assert_eq!(format_count(-4200), "-4,200");
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 15), 1);
        assert_eq!(page_count(15, 15), 1);
        assert_eq!(page_count(16, 15), 2);
    }
}
