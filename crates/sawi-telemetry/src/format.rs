//! Display formatting for reading timestamps.
//!
//! Users see timestamps as `DD <bulan> YYYY HH:MM:SS WIB` in Asia/Jakarta
//! time. This is presentation only; ordering always uses the raw UTC value.

use chrono::{DateTime, Datelike, Timelike, Utc};
use chrono_tz::Asia::Jakarta;

const MONTHS_ID: [&str; 12] = [
    "Januari",
    "Februari",
    "Maret",
    "April",
    "Mei",
    "Juni",
    "Juli",
    "Agustus",
    "September",
    "Oktober",
    "November",
    "Desember",
];

/// Indonesian month name for `month` in `1..=12`.
pub fn month_name_id(month: u32) -> Option<&'static str> {
    MONTHS_ID.get(month.checked_sub(1)? as usize).copied()
}

/// Format `ts` as e.g. `05 Januari 2025 14:03:09 WIB`.
pub fn format_wib(ts: DateTime<Utc>) -> String {
    let local = ts.with_timezone(&Jakarta);
    // month() is always 1..=12
    let month = month_name_id(local.month()).unwrap_or("?");
    format!(
        "{:02} {} {} {:02}:{:02}:{:02} WIB",
        local.day(),
        month,
        local.year(),
        local.hour(),
        local.minute(),
        local.second()
    )
}
