// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Metric payloads returned by the backend's `/{provider}/metrics/*` endpoints.
//!
//! The backend mixes camelCase and snake_case field names; every struct here
//! mirrors the JSON it actually sends. Values the provider has not recorded
//! yet arrive as `null` and map to `None`.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ─────────────────────────────────────────────────────────────────────────────
// Fitbit
// ─────────────────────────────────────────────────────────────────────────────

/// `GET /fitbit/metrics/summary`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub date: NaiveDate,
    pub steps: Option<u64>,
    #[serde(default)]
    pub calories: Option<CaloriesBreakdown>,
    #[serde(default)]
    pub distances: Vec<FitbitDistance>,
    #[serde(default)]
    pub active_minutes: Option<ActiveMinutes>,
}

impl DailySummary {
    /// Distance of the `total` activity bucket, in km.
    pub fn total_distance_km(&self) -> Option<f64> {
        self.distances
            .iter()
            .find(|d| d.activity == "total")
            .and_then(|d| d.distance)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaloriesBreakdown {
    pub total: Option<f64>,
    pub active: Option<f64>,
    pub bmr_estimate: Option<f64>,
    pub goal_total: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FitbitDistance {
    pub activity: String,
    pub distance: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActiveMinutes {
    pub fairly: Option<u32>,
    pub very: Option<u32>,
    pub lightly: Option<u32>,
}

/// `GET /fitbit/metrics/resting-hr`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestingHeartRate {
    pub date: NaiveDate,
    pub resting_heart_rate: Option<f64>,
}

/// `GET /fitbit/metrics/sleep`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FitbitSleep {
    pub date: NaiveDate,
    pub total_minutes_asleep: Option<f64>,
    pub hours_asleep: Option<f64>,
    pub hours_asleep_main: Option<f64>,
}

/// `GET /fitbit/metrics/overview`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FitbitOverview {
    pub date: NaiveDate,
    pub steps: Option<u64>,
    pub calories_out: Option<f64>,
    pub activity_calories: Option<f64>,
    pub resting_heart_rate: Option<f64>,
    pub sleep_hours: Option<f64>,
    pub weight: Option<f64>,
    #[serde(rename = "total_km")]
    pub total_km: Option<f64>,
}

/// `GET /fitbit/metrics/weight`
#[derive(Debug, Clone, Deserialize)]
pub struct FitbitWeight {
    pub base_date: NaiveDate,
    pub period: String,
    pub latest_date: Option<NaiveDate>,
    pub value: Option<f64>,
    #[serde(default)]
    pub count: u32,
}

/// `GET /fitbit/metrics/spo2-nightly`
#[derive(Debug, Clone, Deserialize)]
pub struct Spo2Nightly {
    pub date: NaiveDate,
    pub average: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// `GET /fitbit/metrics/hrv`
#[derive(Debug, Clone, Deserialize)]
pub struct HrvSeries {
    #[serde(default)]
    pub items: Vec<HrvPoint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HrvPoint {
    pub date: NaiveDate,
    pub rmssd_ms: Option<f64>,
}

/// `GET /fitbit/metrics/respiratory-rate`
#[derive(Debug, Clone, Deserialize)]
pub struct BreathingRateSeries {
    #[serde(default)]
    pub items: Vec<BreathingRatePoint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BreathingRatePoint {
    pub date: NaiveDate,
    pub breaths_per_min: Option<f64>,
}

/// `GET /fitbit/metrics/temperature` (nightly skin temperature delta)
#[derive(Debug, Clone, Deserialize)]
pub struct SkinTemperature {
    pub latest: Option<SkinTemperaturePoint>,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub items: Vec<SkinTemperaturePoint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SkinTemperaturePoint {
    pub date: NaiveDate,
    pub delta_c: Option<f64>,
}

/// `GET /fitbit/metrics/workouts`
#[derive(Debug, Clone, Deserialize)]
pub struct Workouts {
    #[serde(rename = "afterDate")]
    pub after_date: NaiveDate,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub items: Vec<Workout>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workout {
    pub log_id: Option<u64>,
    pub start_time: Option<String>,
    #[serde(rename = "duration_ms")]
    pub duration_ms: Option<u64>,
    /// Activity name, or the numeric activity type id when Fitbit has no name.
    #[serde(rename = "type", default)]
    kind: Option<serde_json::Value>,
    pub calories: Option<f64>,
    pub average_heart_rate: Option<f64>,
    #[serde(rename = "distance_km")]
    pub distance_km: Option<f64>,
}

impl Workout {
    pub fn activity(&self) -> Option<String> {
        match &self.kind {
            Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(serde_json::Value::Number(n)) => Some(format!("activity {}", n)),
            _ => None,
        }
    }

    pub fn duration_minutes(&self) -> Option<u64> {
        self.duration_ms.map(|ms| ms / 60_000)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Withings
// ─────────────────────────────────────────────────────────────────────────────

/// `GET /withings/metrics/daily`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithingsDaily {
    pub date: NaiveDate,
    pub steps: Option<u64>,
    pub calories: Option<f64>,
    pub sleep_hours: Option<f64>,
    pub distance_km: Option<f64>,
    /// Set when the backend fell back to an earlier day with data.
    #[serde(default)]
    pub fallback_from: Option<NaiveDate>,
}

/// `GET /withings/metrics/overview`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithingsOverview {
    pub weight_kg: Option<f64>,
    pub resting_heart_rate: Option<f64>,
}

/// `GET /withings/metrics/weight/latest`
#[derive(Debug, Clone, Deserialize)]
pub struct WeightLatest {
    pub value: Option<f64>,
    pub latest_date: Option<NaiveDate>,
}

/// `GET /withings/metrics/weight/history`
#[derive(Debug, Clone, Deserialize)]
pub struct WeightHistory {
    #[serde(default)]
    pub items: Vec<WeightPoint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeightPoint {
    pub date: NaiveDate,
    pub weight: f64,
}

/// `GET /withings/metrics/heart-rate/daily`
#[derive(Debug, Clone, Deserialize)]
pub struct HeartRateDaily {
    pub date: NaiveDate,
    pub hr_average: Option<f64>,
    pub hr_min: Option<f64>,
    pub hr_max: Option<f64>,
}

/// `GET /withings/metrics/heart-rate/intraday`
#[derive(Debug, Clone, Deserialize)]
pub struct HeartRateIntraday {
    #[serde(default)]
    pub latest: Option<HeartRateSample>,
    #[serde(default)]
    pub items: Vec<HeartRateSample>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeartRateSample {
    /// Unix seconds
    pub ts: i64,
    pub bpm: f64,
}

/// `GET /withings/metrics/spo2`
///
/// Without a range the backend answers with `latest` only.
#[derive(Debug, Clone, Deserialize)]
pub struct Spo2Readings {
    #[serde(default)]
    pub latest: Option<Spo2Sample>,
    #[serde(default)]
    pub items: Vec<Spo2Sample>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Spo2Sample {
    pub ts: i64,
    pub percent: f64,
}

/// `GET /withings/metrics/temperature`
#[derive(Debug, Clone, Deserialize)]
pub struct TemperatureSeries {
    #[serde(default)]
    pub items: Vec<TemperatureSample>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemperatureSample {
    pub ts: i64,
    pub body_c: Option<f64>,
    pub skin_c: Option<f64>,
}

/// `GET /withings/metrics/sleep`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithingsSleep {
    pub date: NaiveDate,
    pub sleep_hours: Option<f64>,
}

/// `GET /withings/metrics/ecg`
#[derive(Debug, Clone, Deserialize)]
pub struct EcgRecords {
    #[serde(default)]
    pub items: Vec<EcgRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EcgRecord {
    pub ts: i64,
    pub hr_bpm: Option<f64>,
    pub classification: Option<String>,
    pub duration_s: Option<u32>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Normalized series
// ─────────────────────────────────────────────────────────────────────────────

/// Chartable metric families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeriesKind {
    Weight,
    HeartRate,
    Hrv,
    BreathingRate,
    Spo2,
    Temperature,
}

impl SeriesKind {
    pub fn unit(&self) -> &'static str {
        match self {
            SeriesKind::Weight => "kg",
            SeriesKind::HeartRate => "bpm",
            SeriesKind::Hrv => "ms",
            SeriesKind::BreathingRate => "br/min",
            SeriesKind::Spo2 => "%",
            SeriesKind::Temperature => "°C",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SeriesKind::Weight => "weight",
            SeriesKind::HeartRate => "heart-rate",
            SeriesKind::Hrv => "hrv",
            SeriesKind::BreathingRate => "breathing-rate",
            SeriesKind::Spo2 => "spo2",
            SeriesKind::Temperature => "temperature",
        }
    }
}

impl fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown metric series '{0}'")]
pub struct ParseSeriesKindError(pub String);

impl FromStr for SeriesKind {
    type Err = ParseSeriesKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weight" => Ok(SeriesKind::Weight),
            "heart-rate" | "hr" => Ok(SeriesKind::HeartRate),
            "hrv" => Ok(SeriesKind::Hrv),
            "breathing-rate" | "respiratory-rate" => Ok(SeriesKind::BreathingRate),
            "spo2" => Ok(SeriesKind::Spo2),
            "temperature" | "temp" => Ok(SeriesKind::Temperature),
            _ => Err(ParseSeriesKindError(s.to_string())),
        }
    }
}

/// One reading per day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Date-keyed readings, sorted ascending with one point per day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSeries {
    pub kind: SeriesKind,
    pub unit: &'static str,
    pub points: Vec<MetricPoint>,
}

impl MetricSeries {
    /// Build a series, averaging samples that fall on the same day.
    pub fn from_samples(kind: SeriesKind, samples: impl IntoIterator<Item = (NaiveDate, f64)>) -> Self {
        let mut by_day: BTreeMap<NaiveDate, (f64, u32)> = BTreeMap::new();
        for (date, value) in samples {
            if !value.is_finite() {
                continue;
            }
            let entry = by_day.entry(date).or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }

        let points = by_day
            .into_iter()
            .map(|(date, (sum, n))| MetricPoint {
                date,
                value: sum / f64::from(n),
            })
            .collect();

        Self {
            kind,
            unit: kind.unit(),
            points,
        }
    }

    pub fn latest(&self) -> Option<&MetricPoint> {
        self.points.last()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Calendar day (UTC) of a Unix timestamp.
fn day_of(ts: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive())
}

impl From<HrvSeries> for MetricSeries {
    fn from(s: HrvSeries) -> Self {
        MetricSeries::from_samples(
            SeriesKind::Hrv,
            s.items.into_iter().filter_map(|p| Some((p.date, p.rmssd_ms?))),
        )
    }
}

impl From<BreathingRateSeries> for MetricSeries {
    fn from(s: BreathingRateSeries) -> Self {
        MetricSeries::from_samples(
            SeriesKind::BreathingRate,
            s.items
                .into_iter()
                .filter_map(|p| Some((p.date, p.breaths_per_min?))),
        )
    }
}

impl From<SkinTemperature> for MetricSeries {
    fn from(s: SkinTemperature) -> Self {
        MetricSeries::from_samples(
            SeriesKind::Temperature,
            s.items.into_iter().filter_map(|p| Some((p.date, p.delta_c?))),
        )
    }
}

impl From<WeightHistory> for MetricSeries {
    fn from(s: WeightHistory) -> Self {
        MetricSeries::from_samples(
            SeriesKind::Weight,
            s.items.into_iter().map(|p| (p.date, p.weight)),
        )
    }
}

impl From<HeartRateIntraday> for MetricSeries {
    fn from(s: HeartRateIntraday) -> Self {
        MetricSeries::from_samples(
            SeriesKind::HeartRate,
            s.items.into_iter().filter_map(|p| Some((day_of(p.ts)?, p.bpm))),
        )
    }
}

impl From<Spo2Readings> for MetricSeries {
    fn from(s: Spo2Readings) -> Self {
        let samples = if s.items.is_empty() {
            s.latest.into_iter().collect()
        } else {
            s.items
        };
        MetricSeries::from_samples(
            SeriesKind::Spo2,
            samples
                .into_iter()
                .filter_map(|p| Some((day_of(p.ts)?, p.percent))),
        )
    }
}

impl From<TemperatureSeries> for MetricSeries {
    fn from(s: TemperatureSeries) -> Self {
        MetricSeries::from_samples(
            SeriesKind::Temperature,
            s.items
                .into_iter()
                .filter_map(|p| Some((day_of(p.ts)?, p.body_c?))),
        )
    }
}
