use chrono::{DateTime, Utc};

use crate::domain::Coordinates;

pub fn format_coordinates(position: Coordinates) -> String {
    format!("{:.6}°, {:.6}°", position.latitude, position.longitude)
}

pub fn format_relative_time(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = now.signed_duration_since(at);
    let (amount, unit, future) = {
        let seconds = delta.num_seconds();
        let future = seconds < 0;
        let seconds = seconds.unsigned_abs();
        if seconds < 45 {
            return "less than a minute ago".to_string();
        }
        let minutes = (seconds + 30) / 60;
        if minutes < 60 {
            (minutes, "minute", future)
        } else if minutes < 60 * 24 {
            ((minutes + 30) / 60, "hour", future)
        } else if minutes < 60 * 24 * 30 {
            ((minutes / (60 * 24)).max(1), "day", future)
        } else if minutes < 60 * 24 * 365 {
            ((minutes / (60 * 24 * 30)).max(1), "month", future)
        } else {
            ((minutes / (60 * 24 * 365)).max(1), "year", future)
        }
    };
    let plural = if amount == 1 { "" } else { "s" };
    if future {
        format!("in {amount} {unit}{plural}")
    } else {
        format!("{amount} {unit}{plural} ago")
    }
}

pub fn memo_count_label(count: usize) -> String {
    if count == 1 {
        "1 memo".to_string()
    } else {
        format!("{count} memos")
    }
}

#[cfg(test)]
#[path = "tests/format_tests.rs"]
mod tests;
