use chrono::Duration;

/// Formats minutes the way they are shown to the user: `1h 5m`, `5m 30s` or `42s`.
pub fn format_minutes(minutes: f64) -> String {
    let seconds = (minutes.max(0.) * 60.).floor() as i64;
    format_duration(Duration::seconds(seconds))
}

pub fn format_duration(v: Duration) -> String {
    if v.num_hours() > 0 {
        format!("{}h {}m", v.num_hours(), v.num_minutes() % 60)
    } else if v.num_minutes() > 0 {
        format!("{}m {}s", v.num_minutes() % 60, v.num_seconds() % 60)
    } else {
        format!("{}s", v.num_seconds() % 60)
    }
}
