use chrono::{DateTime, SecondsFormat, Utc};

/// Timestamps are stored as fixed-width UTC RFC 3339 strings
/// (`2026-01-31T09:15:00.000Z`) so they order lexicographically.
pub fn to_iso(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn now_iso() -> String {
    to_iso(Utc::now())
}

/// Parse a stored or client supplied timestamp. Accepts RFC 3339 and bare
/// `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_iso(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
