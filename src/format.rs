/// Display helpers for story timestamps

use chrono::{DateTime, Datelike, Local, TimeZone, Timelike};

/// Indonesian short month names, as shown in the app
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "Mei", "Jun", "Jul", "Agu", "Sep", "Okt", "Nov", "Des",
];

/// Render a story's `createdAt` as "08 Jan 2022, 13:34" in local time.
/// Input that doesn't parse is returned unchanged.
pub fn format_created_at(created_at: &str) -> String {
    format_created_at_in(created_at, &Local)
}

pub fn format_created_at_in<Tz: TimeZone>(created_at: &str, tz: &Tz) -> String {
    let parsed = match DateTime::parse_from_rfc3339(created_at) {
        Ok(parsed) => parsed.with_timezone(tz),
        Err(_) => return created_at.to_string(),
    };

    format!(
        "{:02} {} {}, {:02}:{:02}",
        parsed.day(),
        MONTHS[parsed.month0() as usize],
        parsed.year(),
        parsed.hour(),
        parsed.minute()
    )
}
