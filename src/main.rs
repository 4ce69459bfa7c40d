// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HealthSync command line client
//!
//! Signs in with Fitbit or Withings through the HealthSync backend and prints
//! the user's health metrics.

use anyhow::{anyhow, bail, Context};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use healthsync::{
    config::Config,
    display,
    error::AuthError,
    models::{Provider, SeriesKind, SessionState},
    navigation::ConsoleNavigator,
    routes::{create_router, CallbackEvent},
    services::{load_dashboard, AuthSession, BackendClient, MetricsService, WorkoutQuery},
    storage::FileStore,
    time_utils, AppState,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "healthsync")]
#[command(about = "Fitbit and Withings health metrics from the terminal")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with a provider (signs out of the other one)
    Login {
        /// fitbit or withings
        provider: Provider,
        /// OAuth scopes to request instead of the provider defaults
        #[arg(long)]
        scope: Option<String>,
    },
    /// Revoke the provider token and forget the session
    Logout,
    /// Show the stored session without contacting the backend
    Status,
    /// Fetch and print the provider profile
    Profile,
    /// Print a valid access token, refreshing it if needed
    Token,
    /// Show today's dashboard cards
    Dashboard {
        /// Day to show (YYYY-MM-DD), defaults to today
        #[arg(long, value_name = "DATE")]
        date: Option<NaiveDate>,
    },
    /// Print a daily metric series
    Series {
        /// weight, heart-rate, hrv, breathing-rate, spo2 or temperature
        kind: SeriesKind,
        #[arg(long, value_name = "DATE")]
        start: Option<NaiveDate>,
        /// Defaults to today
        #[arg(long, value_name = "DATE")]
        end: Option<NaiveDate>,
        /// Days before `end` when `start` is not given
        #[arg(long, default_value_t = 30)]
        days: u32,
    },
    /// List logged Fitbit workouts
    Workouts {
        /// Only workouts after this day, defaults to 30 days ago
        #[arg(long, value_name = "DATE")]
        after: Option<NaiveDate>,
        /// Workouts to list (1-100)
        #[arg(long, default_value_t = WorkoutQuery::DEFAULT_LIMIT)]
        #[arg(value_parser = clap::value_parser!(u32).range(1..=100))]
        limit: u32,
        /// Oldest first
        #[arg(long)]
        asc: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();

    let config = Config::from_env().context("Failed to load configuration")?;
    let store = FileStore::open(config.session_file.clone()).context("Failed to open session file")?;

    let backend = BackendClient::new(config.api_base_url.clone());
    let mut session = AuthSession::new(
        backend.clone(),
        Arc::new(store),
        Arc::new(ConsoleNavigator),
        config.dashboard_url.clone(),
    );
    session.restore();

    match cli.command {
        Command::Login { provider, scope } => login(&config, &mut session, provider, scope).await,
        Command::Logout => {
            session.logout().await;
            println!("Logged out");
            Ok(())
        }
        Command::Status => {
            print_status(&session);
            Ok(())
        }
        Command::Profile => {
            let profile = session.load_profile().await.ok_or_else(not_logged_in)?;
            print!("{}", display::render_profile(&profile));
            Ok(())
        }
        Command::Token => {
            let token = session.get_access_token().await.ok_or_else(not_logged_in)?;
            println!("{}", token);
            Ok(())
        }
        Command::Dashboard { date } => {
            let metrics = MetricsService::new(backend);
            let snapshot = load_dashboard(&mut session, &metrics, date)
                .await
                .map_err(unauthenticated_hint)?;
            print!("{}", display::render_dashboard(&snapshot));
            Ok(())
        }
        Command::Series {
            kind,
            start,
            end,
            days,
        } => {
            let end = end.unwrap_or_else(|| Utc::now().date_naive());
            let start = match start {
                Some(start) => start,
                None => {
                    time_utils::trailing_range(end, days)
                        .ok_or_else(|| anyhow!("--days {} reaches too far back", days))?
                        .0
                }
            };
            if start > end {
                bail!("--start {} is after --end {}", start, end);
            }

            let creds = session.credentials().await.ok_or_else(not_logged_in)?;
            let metrics = MetricsService::new(backend);
            let series = metrics.series(&creds, kind, start, end).await?;
            print!("{}", display::render_series(&series));
            Ok(())
        }
        Command::Workouts { after, limit, asc } => {
            let after = match after {
                Some(after) => after,
                None => {
                    time_utils::trailing_range(Utc::now().date_naive(), 30)
                        .ok_or_else(|| anyhow!("Date out of range"))?
                        .0
                }
            };

            let creds = session.credentials().await.ok_or_else(not_logged_in)?;
            let metrics = MetricsService::new(backend);
            let query = WorkoutQuery {
                limit,
                ascending: asc,
                ..WorkoutQuery::after(after)
            };
            let workouts = metrics.fitbit_workouts(&creds, &query).await?;
            print!("{}", display::render_workouts(&workouts));
            Ok(())
        }
    }
}

/// Run the full OAuth round trip through the local callback server.
async fn login(
    config: &Config,
    session: &mut AuthSession,
    provider: Provider,
    scope: Option<String>,
) -> anyhow::Result<()> {
    let (events, mut rx) = mpsc::channel::<CallbackEvent>(4);
    let state = Arc::new(AppState { events });
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.callback_addr)
        .await
        .with_context(|| format!("Failed to bind callback server on {}", config.callback_addr))?;
    tracing::info!(address = %config.callback_addr, "Callback server listening");
    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    let scope = scope.unwrap_or_else(|| provider.default_scope().to_string());
    session.login_start(provider, Some(&scope)).await?;

    let deadline = tokio::time::Instant::now() + config.login_timeout;
    let event = loop {
        let event = tokio::time::timeout_at(deadline, rx.recv())
            .await
            .map_err(|_| anyhow!("Timed out waiting for the {} redirect", provider))?
            .ok_or_else(|| anyhow!("Callback server stopped"))?;
        if event.provider == provider {
            break event;
        }
        tracing::warn!(expected = %provider, received = %event.provider, "Ignoring redirect for another provider");
    };
    server.abort();

    let provider = session.complete_login(event.params).await?;
    match session.load_profile().await {
        Some(profile) => print!("{}", display::render_profile(&profile)),
        None => println!(
            "Logged in with {}, but the profile could not be loaded",
            provider.display_name()
        ),
    }
    Ok(())
}

fn print_status(session: &AuthSession) {
    let stored = session.session();
    println!("State:       {}", session.state());
    if let SessionState::Anonymous = session.state() {
        return;
    }
    println!(
        "Expires at:  {}",
        stored
            .expires_at
            .map(time_utils::format_utc_rfc3339)
            .unwrap_or_else(|| "unknown".to_string())
    );
    println!("Refreshable: {}", stored.refresh_token.is_some());
    println!("App session: {}", stored.app_session_token.is_some());
    if let Some(user_id) = stored.user_id {
        println!("User ID:     {}", user_id);
    }
}

fn not_logged_in() -> anyhow::Error {
    anyhow!("Not logged in; run `healthsync login <fitbit|withings>`")
}

fn unauthenticated_hint(e: AuthError) -> anyhow::Error {
    match e {
        AuthError::Unauthenticated => not_logged_in(),
        other => other.into(),
    }
}

/// Initialize structured JSON logging on stderr, keeping stdout for output.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("healthsync=info,warn")),
        )
        .with(format)
        .init();
}
