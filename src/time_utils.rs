// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting and token expiry.

use chrono::{DateTime, Days, NaiveDate, SecondsFormat, TimeDelta, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse an RFC3339 timestamp into UTC, `None` if malformed.
pub fn parse_rfc3339_utc(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Absolute expiry for a token issued `now` with lifetime `expires_in` seconds.
///
/// `None` when the lifetime does not fit in a timestamp.
pub fn expiry_from_now(now: DateTime<Utc>, expires_in: i64) -> Option<DateTime<Utc>> {
    now.checked_add_signed(TimeDelta::try_seconds(expires_in.max(0))?)
}

/// True once `now + margin` has reached `expires_at`.
pub fn is_expired(expires_at: DateTime<Utc>, now: DateTime<Utc>, margin_secs: i64) -> bool {
    now + TimeDelta::seconds(margin_secs) >= expires_at
}

/// Inclusive range of `days` calendar days ending on `end`.
///
/// `None` if the start would fall before the earliest representable date.
pub fn trailing_range(end: NaiveDate, days: u32) -> Option<(NaiveDate, NaiveDate)> {
    let span = u64::from(days.max(1)) - 1;
    Some((end.checked_sub_days(Days::new(span))?, end))
}

/// Format as `YYYY-MM-DD`, the form every metrics endpoint expects.
pub fn format_ymd(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
