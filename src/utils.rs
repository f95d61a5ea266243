//! Small formatting helpers used by the log output.

use chrono::{DateTime, Local, TimeZone};

/// Truncate a string for logging purposes.
///
/// Strings longer than `max` bytes are cut at the nearest char boundary at or
/// below `max` and suffixed with `"…(+N bytes)"`.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Render a cursor as local `YYYY-MM-DD HH:MM:SS` for progress logs.
///
/// `None` means the run has not been bounded yet and renders as
/// `"beginning"`.
pub fn format_cursor(cursor: Option<i64>) -> String {
    match cursor {
        Some(ts) => match Local.timestamp_opt(ts, 0).single() {
            Some(dt) => format_local(dt),
            None => format!("<invalid {ts}>"),
        },
        None => "beginning".to_string(),
    }
}

fn format_local(dt: DateTime<Local>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}
