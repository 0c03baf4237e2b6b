use chrono::{DateTime, SecondsFormat, Utc};

pub fn time_millis() -> i64 {
    let time: DateTime<chrono::Utc> = Utc::now();
    time.timestamp_millis()
}

/// Write stamp strictly after `previous`, so guarded updates see a change
/// even within one millisecond.
pub fn stamp_after(previous: i64) -> i64 {
    time_millis().max(previous.saturating_add(1))
}

/// RFC 3339 timestamp used in API envelopes.
pub fn rfc3339_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
