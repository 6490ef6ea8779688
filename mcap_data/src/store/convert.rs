use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// RFC 3339 in UTC. Sub-second digits appear only when present.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Accepts RFC 3339, a naive `YYYY-MM-DD HH:MM:SS[.f]` read as UTC, or a bare date at midnight UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    let naive = NAIVE_FORMATS.iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().map(|d| d.and_hms(0, 0, 0)))?;

    Some(DateTime::from_utc(naive, Utc))
}

pub fn format_value(value: f64) -> String {
    value.to_string()
}

/// Blank cells read as zero. `NaN` and `inf` are accepted as written by `format_value`.
pub fn parse_value(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Some(0f64);
    }
    raw.parse::<f64>().ok()
}
