// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Plain-text rendering for CLI output.

use std::fmt::Write as _;

use crate::error::ApiError;
use crate::models::metrics::Workouts;
use crate::models::{MetricSeries, Profile};
use crate::services::dashboard::{Card, DashboardSnapshot, FitbitDashboard, WithingsDashboard};

/// Placeholder for values the provider has not recorded.
const MISSING: &str = "--";

/// `12345` -> `12,345`
pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Fractional hours as `7h 24m`.
pub fn format_hours(hours: f64) -> String {
    if !hours.is_finite() || hours < 0.0 {
        return MISSING.to_string();
    }
    let total_minutes = (hours * 60.0).round() as u64;
    format!("{}h {:02}m", total_minutes / 60, total_minutes % 60)
}

pub fn format_kg(kg: f64) -> String {
    format!("{:.1} kg", kg)
}

fn opt<T>(value: Option<T>, f: impl FnOnce(T) -> String) -> String {
    value.map(f).unwrap_or_else(|| MISSING.to_string())
}

fn card_line<T>(out: &mut String, title: &str, card: &Card<T>, body: impl FnOnce(&T) -> String) {
    let text = match card {
        Ok(value) => body(value),
        Err(e) => unavailable(e),
    };
    let _ = writeln!(out, "  {:<12} {}", title, text);
}

fn unavailable(e: &ApiError) -> String {
    match e {
        ApiError::Unauthorized => "unavailable (session expired)".to_string(),
        ApiError::Network(_) => "unavailable (backend unreachable)".to_string(),
        ApiError::Status { status, .. } => format!("unavailable (HTTP {})", status),
        ApiError::Decode(_) => "unavailable (unexpected response)".to_string(),
        ApiError::ProviderMismatch { .. } => "unavailable (wrong provider)".to_string(),
    }
}

pub fn render_dashboard(snapshot: &DashboardSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} dashboard", snapshot.provider().display_name());
    match snapshot {
        DashboardSnapshot::Fitbit(d) => render_fitbit(&mut out, d),
        DashboardSnapshot::Withings(d) => render_withings(&mut out, d),
    }
    out
}

fn render_fitbit(out: &mut String, d: &FitbitDashboard) {
    card_line(out, "Steps", &d.summary, |s| opt(s.steps, format_thousands));
    card_line(out, "Distance", &d.summary, |s| {
        opt(s.total_distance_km(), |km| format!("{:.2} km", km))
    });
    card_line(out, "Calories", &d.overview, |o| {
        opt(o.calories_out, |c| format_thousands(c.round() as u64))
    });
    card_line(out, "Resting HR", &d.overview, |o| {
        opt(o.resting_heart_rate, |hr| format!("{:.0} bpm", hr))
    });
    card_line(out, "Sleep", &d.sleep, |s| opt(s.hours_asleep, format_hours));
    card_line(out, "Weight", &d.weight, |w| match (w.value, w.latest_date) {
        (Some(kg), Some(date)) => format!("{} ({})", format_kg(kg), date),
        (Some(kg), None) => format_kg(kg),
        _ => MISSING.to_string(),
    });
    card_line(out, "SpO2", &d.spo2, |s| {
        opt(s.average, |avg| format!("{:.1} %", avg))
    });
}

fn render_withings(out: &mut String, d: &WithingsDashboard) {
    card_line(out, "Steps", &d.daily, |daily| {
        let steps = opt(daily.steps, format_thousands);
        match daily.fallback_from {
            Some(_) => format!("{} (as of {})", steps, daily.date),
            None => steps,
        }
    });
    card_line(out, "Distance", &d.daily, |daily| {
        opt(daily.distance_km, |km| format!("{:.2} km", km))
    });
    card_line(out, "Calories", &d.daily, |daily| {
        opt(daily.calories, |c| format_thousands(c.round() as u64))
    });
    card_line(out, "Resting HR", &d.overview, |o| {
        opt(o.resting_heart_rate, |hr| format!("{:.0} bpm", hr))
    });
    card_line(out, "Heart rate", &d.heart_rate, |hr| {
        match (hr.hr_average, hr.hr_min, hr.hr_max) {
            (Some(avg), Some(min), Some(max)) => {
                format!("{:.0} bpm avg ({:.0}-{:.0})", avg, min, max)
            }
            (Some(avg), _, _) => format!("{:.0} bpm avg", avg),
            _ => MISSING.to_string(),
        }
    });
    card_line(out, "Sleep", &d.sleep, |s| opt(s.sleep_hours, format_hours));
    card_line(out, "Weight", &d.weight, |w| match (w.value, w.latest_date) {
        (Some(kg), Some(date)) => format!("{} ({})", format_kg(kg), date),
        (Some(kg), None) => format_kg(kg),
        _ => MISSING.to_string(),
    });
}

pub fn render_profile(profile: &Profile) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} ({})",
        profile.display_name,
        profile.provider.display_name()
    );
    if let Some(name) = &profile.full_name {
        let _ = writeln!(out, "  Name:     {}", name);
    }
    if let Some(id) = &profile.user_id {
        let _ = writeln!(out, "  User ID:  {}", id);
    }
    if let Some(tz) = &profile.timezone {
        let _ = writeln!(out, "  Timezone: {}", tz);
    }
    out
}

pub fn render_series(series: &MetricSeries) -> String {
    let mut out = String::new();
    if series.is_empty() {
        let _ = writeln!(out, "No {} data in range", series.kind);
        return out;
    }
    for point in &series.points {
        let _ = writeln!(out, "{}  {:>8.1} {}", point.date, point.value, series.unit);
    }
    out
}

/// One line per workout, newest or oldest first as the backend returned them.
pub fn render_workouts(workouts: &Workouts) -> String {
    let mut out = String::new();
    if workouts.items.is_empty() {
        let _ = writeln!(out, "No workouts after {}", workouts.after_date);
        return out;
    }
    for w in &workouts.items {
        let start = w
            .start_time
            .as_deref()
            .map(|t| t.get(..16).unwrap_or(t).replace('T', " "))
            .unwrap_or_else(|| MISSING.to_string());
        let _ = writeln!(
            out,
            "{}  {:<20} {:>7}  {:>9}  {:>8}  {}",
            start,
            w.activity().unwrap_or_else(|| MISSING.to_string()),
            opt(w.duration_minutes(), |m| format!("{} min", m)),
            opt(w.distance_km, |km| format!("{:.2} km", km)),
            opt(w.calories, |c| format!("{} kcal", format_thousands(c.round() as u64))),
            opt(w.average_heart_rate, |hr| format!("{:.0} bpm", hr)),
        );
    }
    out
}
