use chrono::{DateTime, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::error::{FitlogError, Result};

// ── System timezone detection ─────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

/// Resolve an IANA timezone name, falling back to UTC with a warning.
pub fn resolve_timezone(tz_name: &str) -> Tz {
    tz_name.parse::<Tz>().unwrap_or_else(|_| {
        warn!(
            "unrecognised timezone \"{}\", falling back to UTC",
            tz_name
        );
        Tz::UTC
    })
}

/// Validate that `tz_name` is a recognised IANA timezone identifier.
pub fn validate_timezone(tz_name: &str) -> bool {
    tz_name.parse::<Tz>().is_ok()
}

// ── Day boundaries ────────────────────────────────────────────────────────────

/// The first instant of `date` in `tz`, as UTC.
///
/// Where local midnight does not exist (a DST gap at 00:00), the first valid
/// local time after it is used. An ambiguous midnight resolves to the earlier
/// instant.
pub fn local_midnight(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let mut naive = date.and_time(NaiveTime::MIN);
    // DST gaps are at most a couple of hours; step in 15-minute increments.
    for _ in 0..=12 {
        match tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) => return dt.with_timezone(&Utc),
            LocalResult::Ambiguous(earliest, _) => return earliest.with_timezone(&Utc),
            LocalResult::None => naive += chrono::Duration::minutes(15),
        }
    }
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// Half-open UTC interval `[midnight(date), midnight(date + 1))` in `tz`.
pub fn day_bounds(date: NaiveDate, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = local_midnight(date, tz);
    let end = date
        .succ_opt()
        .map(|next| local_midnight(next, tz))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    (start, end)
}

/// Half-open UTC interval covering the local days `first..=last` in `tz`.
pub fn date_range_bounds(
    first: NaiveDate,
    last: NaiveDate,
    tz: Tz,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let (start, _) = day_bounds(first, tz);
    let (_, end) = day_bounds(last, tz);
    (start, end)
}

/// Calendar date of `ts` as seen in `tz`.
pub fn local_date(ts: DateTime<Utc>, tz: Tz) -> NaiveDate {
    ts.with_timezone(&tz).date_naive()
}

/// Today's date in `tz`.
pub fn today_in(tz: Tz) -> NaiveDate {
    local_date(Utc::now(), tz)
}

// ── Date parsing ──────────────────────────────────────────────────────────────

/// Parse a user-supplied date.
///
/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, or a full RFC 3339 timestamp (whose
/// calendar date in `tz` is used).
pub fn parse_date(s: &str, tz: Tz) -> Result<NaiveDate> {
    let s = s.trim();
    const FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];
    for fmt in FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(local_date(dt.with_timezone(&Utc), tz));
    }
    Err(FitlogError::InvalidDate(s.to_string()))
}
