// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fitness data providers and their OAuth endpoints.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// External fitness-data source a user connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Fitbit,
    Withings,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Fitbit, Provider::Withings];

    /// Lower-case identifier used in backend paths and storage keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Fitbit => "fitbit",
            Provider::Withings => "withings",
        }
    }

    /// The provider whose tokens must be cleared when this one logs in.
    pub fn other(&self) -> Provider {
        match self {
            Provider::Fitbit => Provider::Withings,
            Provider::Withings => Provider::Fitbit,
        }
    }

    /// Provider consent page the backend's authorization URL must point at.
    pub fn authorization_endpoint(&self) -> &'static str {
        match self {
            Provider::Fitbit => "https://www.fitbit.com/oauth2/authorize",
            Provider::Withings => "https://account.withings.com/oauth2_user/authorize2",
        }
    }

    /// True if `url` is this provider's consent endpoint plus a query string.
    pub fn is_authorization_url(&self, url: &str) -> bool {
        url.strip_prefix(self.authorization_endpoint())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('?'))
    }

    /// Scopes requested when the caller does not name any.
    pub fn default_scope(&self) -> &'static str {
        match self {
            Provider::Fitbit => {
                "activity heartrate sleep temperature oxygen_saturation weight profile settings"
            }
            Provider::Withings => "user.info,user.metrics,user.activity,user.sleepevents",
        }
    }

    /// Human-readable provider name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Fitbit => "Fitbit",
            Provider::Withings => "Withings",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown provider '{0}' (expected fitbit or withings)")]
pub struct ParseProviderError(pub String);

impl FromStr for Provider {
    type Err = ParseProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fitbit" => Ok(Provider::Fitbit),
            "withings" => Ok(Provider::Withings),
            _ => Err(ParseProviderError(s.to_string())),
        }
    }
}
