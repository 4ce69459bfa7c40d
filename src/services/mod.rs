// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - session and backend logic.

pub mod auth;
pub mod backend;
pub mod dashboard;
pub mod metrics;

pub use auth::{AuthSession, CallbackParams};
pub use backend::{BackendClient, Credentials};
pub use dashboard::{load_dashboard, DashboardSnapshot};
pub use metrics::{MetricsService, WorkoutQuery};
