//! Time helpers for order history filters and report output

use chrono::{Duration, NaiveDateTime, TimeZone, Utc};

use crate::error::{Error, Result};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Timestamp `days` away from now, truncated to whole seconds.
///
/// Returns milliseconds when `millis` is set, which is what the trading
/// history endpoints expect.
pub fn move_days_from_now(days: i64, backward: bool, millis: bool) -> i64 {
    let offset = Duration::days(days);
    let target = if backward {
        Utc::now() - offset
    } else {
        Utc::now() + offset
    };
    let secs = target.timestamp();
    if millis {
        secs * 1000
    } else {
        secs
    }
}

/// Interpret `"%Y-%m-%d %H:%M:%S"` as UTC and return the POSIX timestamp.
pub fn convert_strtime(value: &str) -> Result<i64> {
    let naive = NaiveDateTime::parse_from_str(value, TIME_FORMAT).map_err(|e| Error::InvalidTime {
        value: value.to_string(),
        reason: e.to_string(),
    })?;
    Ok(Utc.from_utc_datetime(&naive).timestamp())
}

/// Render a POSIX timestamp as a UTC string without offset suffix.
pub fn convert_timestamp(timestamp: i64) -> Result<String> {
    Utc.timestamp_opt(timestamp, 0)
        .single()
        .map(|dt| dt.format(TIME_FORMAT).to_string())
        .ok_or_else(|| Error::InvalidTime {
            value: timestamp.to_string(),
            reason: "out of range".to_string(),
        })
}

/// Compact duration such as `1d2h3m4s`, `-5m0s` or `42s`.
pub fn pretty_time(seconds: f64) -> String {
    let sign = if seconds < 0.0 { "-" } else { "" };
    let total = seconds.abs() as i64;
    let (days, rem) = (total / 86_400, total % 86_400);
    let (hours, rem) = (rem / 3_600, rem % 3_600);
    let (minutes, secs) = (rem / 60, rem % 60);

    if days > 0 {
        format!("{sign}{days}d{hours}h{minutes}m{secs}s")
    } else if hours > 0 {
        format!("{sign}{hours}h{minutes}m{secs}s")
    } else if minutes > 0 {
        format!("{sign}{minutes}m{secs}s")
    } else {
        format!("{sign}{secs}s")
    }
}
