//! Wall-clock timestamps shared by the receiver and the power correlator.
//!
//! Everything is kept as `NaiveDateTime`: the receiver's clock and the power
//! meter's clock are assumed to be synchronized, the protocol does nothing to
//! make them so.

use chrono::{DateTime, Local, NaiveDateTime, TimeDelta};

/// Format written by the receiver's run log
pub const RUN_LOG_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%a %b %e %H:%M:%S %Y",
];

/// Local wall-clock time of receipt
pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(RUN_LOG_FORMAT).to_string()
}

/// Parse any timestamp form found in power logs and timing files.
///
/// Accepts RFC 3339 (offset dropped, wall time kept), ISO-8601 without an
/// offset, `ctime` output and bare epoch seconds.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let text = raw.trim().trim_matches('"');
    if text.is_empty() {
        return None;
    }

    if let Ok(secs) = text.parse::<f64>() {
        return from_epoch_seconds(secs);
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.naive_local());
    }

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&collapsed, fmt).ok())
}

fn from_epoch_seconds(secs: f64) -> Option<NaiveDateTime> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos).map(|ts| ts.naive_utc())
}

/// Signed seconds from `from` to `to`
pub fn seconds_between(from: &NaiveDateTime, to: &NaiveDateTime) -> f64 {
    delta_seconds(*to - *from)
}

pub fn delta_seconds(delta: TimeDelta) -> f64 {
    delta.num_seconds() as f64 + f64::from(delta.subsec_nanos()) / 1e9
}
