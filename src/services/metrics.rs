// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed access to the backend's metrics endpoints.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::ApiError;
use crate::models::metrics::*;
use crate::models::{MetricSeries, Provider, SeriesKind};
use crate::services::backend::{BackendClient, Credentials};
use crate::time_utils::format_ymd;

/// Query parameters shared by the metrics endpoints.
#[derive(Debug, Clone, Default)]
pub struct MetricQuery {
    pub date: Option<NaiveDate>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub period: Option<String>,
}

impl MetricQuery {
    pub fn on(date: Option<NaiveDate>) -> Self {
        Self {
            date,
            ..Self::default()
        }
    }

    pub fn range(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            ..Self::default()
        }
    }

    fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(d) = self.date {
            pairs.push(("date", format_ymd(d)));
        }
        if let Some(d) = self.start {
            pairs.push(("start", format_ymd(d)));
        }
        if let Some(d) = self.end {
            pairs.push(("end", format_ymd(d)));
        }
        if let Some(p) = &self.period {
            pairs.push(("period", p.clone()));
        }
        pairs
    }
}

/// Paging for the Fitbit workout list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkoutQuery {
    pub after_date: NaiveDate,
    /// Clamped to 1..=100 before sending.
    pub limit: u32,
    pub ascending: bool,
    pub offset: u32,
}

impl WorkoutQuery {
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const MAX_LIMIT: u32 = 100;

    /// Newest first, default page size.
    pub fn after(after_date: NaiveDate) -> Self {
        Self {
            after_date,
            limit: Self::DEFAULT_LIMIT,
            ascending: false,
            offset: 0,
        }
    }

    fn to_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("after_date", format_ymd(self.after_date)),
            ("limit", self.limit.clamp(1, Self::MAX_LIMIT).to_string()),
            ("sort", if self.ascending { "asc" } else { "desc" }.to_string()),
            ("offset", self.offset.to_string()),
        ]
    }
}

/// Metrics client. Each call is independent; one failing never affects another.
#[derive(Clone)]
pub struct MetricsService {
    backend: BackendClient,
}

impl MetricsService {
    pub fn new(backend: BackendClient) -> Self {
        Self { backend }
    }

    /// Fetch `/{provider}/metrics/{path}` after checking the session's provider.
    async fn fetch<T: for<'de> Deserialize<'de>>(
        &self,
        creds: &Credentials,
        expected: Provider,
        path: &str,
        query: &MetricQuery,
    ) -> Result<T, ApiError> {
        self.fetch_with(creds, expected, path, &query.to_pairs())
            .await
    }

    async fn fetch_with<T: for<'de> Deserialize<'de>>(
        &self,
        creds: &Credentials,
        expected: Provider,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        if creds.provider != expected {
            return Err(ApiError::ProviderMismatch {
                expected,
                actual: creds.provider,
            });
        }

        tracing::debug!(provider = %expected, metric = path, "Fetching metric");
        self.backend
            .get_metric(creds, path, query)
            .await
            .inspect_err(|e| {
                tracing::warn!(provider = %expected, metric = path, error = %e, "Metric fetch failed");
            })
    }

    // ─── Fitbit ──────────────────────────────────────────────────────────────

    pub async fn fitbit_summary(
        &self,
        creds: &Credentials,
        date: Option<NaiveDate>,
    ) -> Result<DailySummary, ApiError> {
        self.fetch(creds, Provider::Fitbit, "summary", &MetricQuery::on(date))
            .await
    }

    pub async fn fitbit_resting_heart_rate(
        &self,
        creds: &Credentials,
        date: Option<NaiveDate>,
    ) -> Result<RestingHeartRate, ApiError> {
        self.fetch(creds, Provider::Fitbit, "resting-hr", &MetricQuery::on(date))
            .await
    }

    pub async fn fitbit_sleep(
        &self,
        creds: &Credentials,
        date: Option<NaiveDate>,
    ) -> Result<FitbitSleep, ApiError> {
        self.fetch(creds, Provider::Fitbit, "sleep", &MetricQuery::on(date))
            .await
    }

    pub async fn fitbit_overview(
        &self,
        creds: &Credentials,
        date: Option<NaiveDate>,
    ) -> Result<FitbitOverview, ApiError> {
        self.fetch(creds, Provider::Fitbit, "overview", &MetricQuery::on(date))
            .await
    }

    /// Latest weight on or before `date`, looking back `period` (Fitbit period syntax).
    pub async fn fitbit_weight(
        &self,
        creds: &Credentials,
        date: Option<NaiveDate>,
        period: Option<&str>,
    ) -> Result<FitbitWeight, ApiError> {
        let query = MetricQuery {
            date,
            period: period.map(str::to_string),
            ..MetricQuery::default()
        };
        self.fetch(creds, Provider::Fitbit, "weight", &query).await
    }

    pub async fn fitbit_spo2(
        &self,
        creds: &Credentials,
        date: Option<NaiveDate>,
    ) -> Result<Spo2Nightly, ApiError> {
        self.fetch(creds, Provider::Fitbit, "spo2-nightly", &MetricQuery::on(date))
            .await
    }

    pub async fn fitbit_hrv(
        &self,
        creds: &Credentials,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HrvSeries, ApiError> {
        self.fetch(creds, Provider::Fitbit, "hrv", &MetricQuery::range(start, end))
            .await
    }

    pub async fn fitbit_breathing_rate(
        &self,
        creds: &Credentials,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BreathingRateSeries, ApiError> {
        self.fetch(
            creds,
            Provider::Fitbit,
            "respiratory-rate",
            &MetricQuery::range(start, end),
        )
        .await
    }

    pub async fn fitbit_temperature(
        &self,
        creds: &Credentials,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<SkinTemperature, ApiError> {
        self.fetch(
            creds,
            Provider::Fitbit,
            "temperature",
            &MetricQuery::range(start, end),
        )
        .await
    }

    /// Logged activities after `query.after_date`.
    pub async fn fitbit_workouts(
        &self,
        creds: &Credentials,
        query: &WorkoutQuery,
    ) -> Result<Workouts, ApiError> {
        self.fetch_with(creds, Provider::Fitbit, "workouts", &query.to_pairs())
            .await
    }

    // ─── Withings ────────────────────────────────────────────────────────────

    pub async fn withings_daily(
        &self,
        creds: &Credentials,
        date: Option<NaiveDate>,
    ) -> Result<WithingsDaily, ApiError> {
        self.fetch(creds, Provider::Withings, "daily", &MetricQuery::on(date))
            .await
    }

    pub async fn withings_overview(&self, creds: &Credentials) -> Result<WithingsOverview, ApiError> {
        self.fetch(creds, Provider::Withings, "overview", &MetricQuery::default())
            .await
    }

    pub async fn withings_weight_latest(&self, creds: &Credentials) -> Result<WeightLatest, ApiError> {
        self.fetch(
            creds,
            Provider::Withings,
            "weight/latest",
            &MetricQuery::default(),
        )
        .await
    }

    pub async fn withings_weight_history(
        &self,
        creds: &Credentials,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<WeightHistory, ApiError> {
        self.fetch(
            creds,
            Provider::Withings,
            "weight/history",
            &MetricQuery::range(start, end),
        )
        .await
    }

    pub async fn withings_heart_rate_daily(
        &self,
        creds: &Credentials,
        date: Option<NaiveDate>,
    ) -> Result<HeartRateDaily, ApiError> {
        self.fetch(
            creds,
            Provider::Withings,
            "heart-rate/daily",
            &MetricQuery::on(date),
        )
        .await
    }

    pub async fn withings_heart_rate_intraday(
        &self,
        creds: &Credentials,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HeartRateIntraday, ApiError> {
        self.fetch(
            creds,
            Provider::Withings,
            "heart-rate/intraday",
            &MetricQuery::range(start, end),
        )
        .await
    }

    pub async fn withings_spo2(
        &self,
        creds: &Credentials,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Spo2Readings, ApiError> {
        self.fetch(creds, Provider::Withings, "spo2", &MetricQuery::range(start, end))
            .await
    }

    pub async fn withings_temperature(
        &self,
        creds: &Credentials,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TemperatureSeries, ApiError> {
        self.fetch(
            creds,
            Provider::Withings,
            "temperature",
            &MetricQuery::range(start, end),
        )
        .await
    }

    pub async fn withings_sleep(
        &self,
        creds: &Credentials,
        date: Option<NaiveDate>,
    ) -> Result<WithingsSleep, ApiError> {
        self.fetch(creds, Provider::Withings, "sleep", &MetricQuery::on(date))
            .await
    }

    pub async fn withings_ecg(
        &self,
        creds: &Credentials,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<EcgRecords, ApiError> {
        self.fetch(creds, Provider::Withings, "ecg", &MetricQuery::range(start, end))
            .await
    }

    // ─── Series ──────────────────────────────────────────────────────────────

    /// Chartable series for the session's provider over `[start, end]`.
    ///
    /// Kinds the provider does not offer (HRV and breathing rate on Withings)
    /// come back empty without a request.
    pub async fn series(
        &self,
        creds: &Credentials,
        kind: SeriesKind,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<MetricSeries, ApiError> {
        let series: MetricSeries = match (creds.provider, kind) {
            (Provider::Fitbit, SeriesKind::Hrv) => self.fitbit_hrv(creds, start, end).await?.into(),
            (Provider::Fitbit, SeriesKind::BreathingRate) => {
                self.fitbit_breathing_rate(creds, start, end).await?.into()
            }
            (Provider::Fitbit, SeriesKind::Temperature) => {
                self.fitbit_temperature(creds, start, end).await?.into()
            }
            (Provider::Fitbit, SeriesKind::Weight) => {
                // Fitbit's weight endpoint only reports the latest log
                let weight = self.fitbit_weight(creds, Some(end), Some("1m")).await?;
                MetricSeries::from_samples(
                    SeriesKind::Weight,
                    weight.latest_date.zip(weight.value),
                )
            }
            (Provider::Fitbit, SeriesKind::HeartRate) => {
                let rhr = self.fitbit_resting_heart_rate(creds, Some(end)).await?;
                MetricSeries::from_samples(
                    SeriesKind::HeartRate,
                    rhr.resting_heart_rate.map(|v| (rhr.date, v)),
                )
            }
            (Provider::Fitbit, SeriesKind::Spo2) => {
                let spo2 = self.fitbit_spo2(creds, Some(end)).await?;
                MetricSeries::from_samples(SeriesKind::Spo2, spo2.average.map(|v| (spo2.date, v)))
            }
            (Provider::Withings, SeriesKind::Weight) => {
                self.withings_weight_history(creds, start, end).await?.into()
            }
            (Provider::Withings, SeriesKind::HeartRate) => {
                self.withings_heart_rate_intraday(creds, start, end)
                    .await?
                    .into()
            }
            (Provider::Withings, SeriesKind::Spo2) => {
                self.withings_spo2(creds, start, end).await?.into()
            }
            (Provider::Withings, SeriesKind::Temperature) => {
                self.withings_temperature(creds, start, end).await?.into()
            }
            (Provider::Withings, SeriesKind::Hrv | SeriesKind::BreathingRate) => {
                MetricSeries::from_samples(kind, std::iter::empty())
            }
        };

        Ok(MetricSeries {
            points: series
                .points
                .into_iter()
                .filter(|p| p.date >= start && p.date <= end)
                .collect(),
            ..series
        })
    }
}
