use chrono::{DateTime, Local, Utc};
use std::time::Duration;

pub fn local_time(ts: &DateTime<Utc>) -> String {
    DateTime::<Local>::from(*ts).format("%Y-%m-%d %H:%M").to_string()
}

/// "5m 12s ago"
pub fn time_ago(ts: &DateTime<Utc>) -> String {
    let secs = (Utc::now() - *ts).num_seconds().max(0) as u64;
    format!("{} ago", humantime::format_duration(Duration::from_secs(secs)))
}
