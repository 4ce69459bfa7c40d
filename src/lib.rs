// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! HealthSync: a client for Fitbit and Withings health metrics
//!
//! This crate signs a user in with one provider at a time (OAuth2 with PKCE,
//! brokered by the HealthSync backend), keeps that provider's tokens fresh
//! and fetches the metrics shown on the dashboard.

pub mod config;
pub mod display;
pub mod error;
pub mod middleware;
pub mod models;
pub mod navigation;
pub mod pkce;
pub mod routes;
pub mod services;
pub mod storage;
pub mod time_utils;

use routes::CallbackEvent;
use tokio::sync::mpsc;

/// Shared state of the local callback server.
pub struct AppState {
    pub events: mpsc::Sender<CallbackEvent>,
}
