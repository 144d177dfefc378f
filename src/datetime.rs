//! Timestamp parsing and formatting.
//!
//! Sidecar files store timestamps as `YYYY-MM-DD HH:MM:SS` in the machine's
//! local timezone. That stored form is the single source of truth; everything
//! else (RSS pubDates, the date line on entry pages) is derived from it at
//! render time.
//!
//! RSS 2.0 requires RFC 1123 dates, so [`to_rfc1123_gmt`] converts the local
//! instant to GMT before formatting. [`to_local_display`] keeps the instant
//! in local time and formats it for human-facing pages.

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use thiserror::Error;

/// Format used for timestamps persisted in sidecar files.
pub const STORED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Error, Debug)]
pub enum DateError {
    #[error("Invalid timestamp: {0}")]
    Parse(#[from] chrono::ParseError),
    #[error("Timestamp does not exist in the local timezone: {0}")]
    InvalidLocal(String),
}

/// Current local time in the stored sidecar format.
pub fn now_stored() -> String {
    Local::now().format(STORED_FORMAT).to_string()
}

fn parse_stored(stored: &str) -> Result<DateTime<Local>, DateError> {
    let naive = NaiveDateTime::parse_from_str(stored, STORED_FORMAT)?;
    naive
        .and_local_timezone(Local)
        .earliest()
        .ok_or_else(|| DateError::InvalidLocal(stored.to_string()))
}

/// RSS `pubDate` form: RFC 1123 with the instant converted to GMT.
///
/// `"2024-12-31 23:59:59"` in JST becomes `"Tue, 31 Dec 2024 14:59:59 GMT"`.
pub fn to_rfc1123_gmt(stored: &str) -> Result<String, DateError> {
    let local = parse_stored(stored)?;
    let utc: DateTime<Utc> = local.with_timezone(&Utc);
    Ok(utc.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
}

/// Human-facing form used on entry pages and the index, kept in local time.
pub fn to_local_display(stored: &str) -> Result<String, DateError> {
    let local = parse_stored(stored)?;
    Ok(local.format("%a, %d %b %Y %H:%M:%S %z").to_string())
}
