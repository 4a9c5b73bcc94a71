use chrono::{DateTime, SecondsFormat, Utc};

/// Returns the current time as an ISO-8601 string in UTC with millisecond
/// precision, e.g. `2024-05-01T10:20:30.123Z`.
pub fn current_timestamp_iso() -> String {
    format_timestamp_iso(Utc::now())
}

pub fn format_timestamp_iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
