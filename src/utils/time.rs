use chrono::{DateTime, Local};

pub fn clock_label(time: &DateTime<Local>) -> String {
    time.format("%H:%M:%S").to_string()
}

/// Compact "how long ago" label used next to stale prices.
pub fn age_label(since: &DateTime<Local>, now: &DateTime<Local>) -> String {
    let secs = (*now - *since).num_seconds().max(0);
    match secs {
        0..=59 => format!("{secs}s ago"),
        60..=3599 => format!("{}m ago", secs / 60),
        _ => format!("{}h ago", secs / 3600),
    }
}
