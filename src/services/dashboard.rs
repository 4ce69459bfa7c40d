// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dashboard snapshot: every card fetched concurrently, each with its own outcome.

use chrono::NaiveDate;

use crate::error::{ApiError, AuthError};
use crate::models::metrics::*;
use crate::models::Provider;
use crate::services::auth::AuthSession;
use crate::services::backend::Credentials;
use crate::services::metrics::MetricsService;

/// One card's data, or why it could not be loaded.
pub type Card<T> = Result<T, ApiError>;

#[derive(Debug)]
pub struct FitbitDashboard {
    pub overview: Card<FitbitOverview>,
    pub summary: Card<DailySummary>,
    pub sleep: Card<FitbitSleep>,
    pub weight: Card<FitbitWeight>,
    pub spo2: Card<Spo2Nightly>,
}

#[derive(Debug)]
pub struct WithingsDashboard {
    pub daily: Card<WithingsDaily>,
    pub overview: Card<WithingsOverview>,
    pub weight: Card<WeightLatest>,
    pub heart_rate: Card<HeartRateDaily>,
    pub sleep: Card<WithingsSleep>,
}

#[derive(Debug)]
pub enum DashboardSnapshot {
    Fitbit(FitbitDashboard),
    Withings(WithingsDashboard),
}

impl DashboardSnapshot {
    pub fn provider(&self) -> Provider {
        match self {
            DashboardSnapshot::Fitbit(_) => Provider::Fitbit,
            DashboardSnapshot::Withings(_) => Provider::Withings,
        }
    }

    /// Number of cards that failed to load.
    pub fn failed_cards(&self) -> usize {
        match self {
            DashboardSnapshot::Fitbit(d) => [
                d.overview.is_err(),
                d.summary.is_err(),
                d.sleep.is_err(),
                d.weight.is_err(),
                d.spo2.is_err(),
            ]
            .into_iter()
            .filter(|failed| *failed)
            .count(),
            DashboardSnapshot::Withings(d) => [
                d.daily.is_err(),
                d.overview.is_err(),
                d.weight.is_err(),
                d.heart_rate.is_err(),
                d.sleep.is_err(),
            ]
            .into_iter()
            .filter(|failed| *failed)
            .count(),
        }
    }
}

/// Load the active provider's dashboard for `date` (today when `None`).
///
/// Fails only when there are no usable credentials; per-card failures are
/// reported inside the snapshot.
pub async fn load_dashboard(
    session: &mut AuthSession,
    metrics: &MetricsService,
    date: Option<NaiveDate>,
) -> Result<DashboardSnapshot, AuthError> {
    let creds = session
        .credentials()
        .await
        .ok_or(AuthError::Unauthenticated)?;

    let snapshot = fetch_cards(metrics, &creds, date).await;

    let failed = snapshot.failed_cards();
    if failed > 0 {
        tracing::warn!(provider = %creds.provider, failed, "Some dashboard cards failed to load");
    } else {
        tracing::debug!(provider = %creds.provider, "Dashboard loaded");
    }
    Ok(snapshot)
}

/// Fetch every card for `creds.provider` concurrently.
pub async fn fetch_cards(
    metrics: &MetricsService,
    creds: &Credentials,
    date: Option<NaiveDate>,
) -> DashboardSnapshot {
    match creds.provider {
        Provider::Fitbit => {
            let (overview, summary, sleep, weight, spo2) = futures_util::join!(
                metrics.fitbit_overview(creds, date),
                metrics.fitbit_summary(creds, date),
                metrics.fitbit_sleep(creds, date),
                metrics.fitbit_weight(creds, date, Some("1m")),
                metrics.fitbit_spo2(creds, date),
            );
            DashboardSnapshot::Fitbit(FitbitDashboard {
                overview,
                summary,
                sleep,
                weight,
                spo2,
            })
        }
        Provider::Withings => {
            let (daily, overview, weight, heart_rate, sleep) = futures_util::join!(
                metrics.withings_daily(creds, date),
                metrics.withings_overview(creds),
                metrics.withings_weight_latest(creds),
                metrics.withings_heart_rate_daily(creds, date),
                metrics.withings_sleep(creds, date),
            );
            DashboardSnapshot::Withings(WithingsDashboard {
                daily,
                overview,
                weight,
                heart_rate,
                sleep,
            })
        }
    }
}
