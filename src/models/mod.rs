// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod metrics;
pub mod profile;
pub mod provider;
pub mod session;

pub use metrics::{MetricPoint, MetricSeries, SeriesKind};
pub use profile::Profile;
pub use provider::Provider;
pub use session::{storage_key, Session, SessionState, TokenField};
