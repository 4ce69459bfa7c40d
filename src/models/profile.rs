// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User profile as returned by the backend's `user-profile` endpoint.

use serde::{Deserialize, Serialize};

use super::Provider;

/// Provider-neutral profile, held in memory only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub provider: Provider,
    pub user_id: Option<String>,
    pub display_name: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub timezone: Option<String>,
}

/// Fitbit wraps the profile in a `user` object.
#[derive(Debug, Clone, Deserialize)]
pub struct FitbitProfileResponse {
    pub user: FitbitUser,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FitbitUser {
    pub encoded_id: Option<String>,
    pub display_name: Option<String>,
    pub full_name: Option<String>,
    pub avatar: Option<String>,
    #[serde(rename = "avatar150")]
    pub avatar_150: Option<String>,
    pub timezone: Option<String>,
}

/// Withings profile as flattened by the backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithingsProfileResponse {
    pub id: Option<serde_json::Value>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: Option<String>,
}

/// Fallback name when a provider shares nothing usable.
fn placeholder_name(provider: Provider) -> String {
    format!("{} User", provider.display_name())
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl From<FitbitProfileResponse> for Profile {
    fn from(resp: FitbitProfileResponse) -> Self {
        let user = resp.user;
        let full_name = non_empty(user.full_name);
        let display_name = non_empty(user.display_name)
            .or_else(|| full_name.clone())
            .unwrap_or_else(|| placeholder_name(Provider::Fitbit));

        Profile {
            provider: Provider::Fitbit,
            user_id: user.encoded_id,
            display_name,
            full_name,
            // The larger avatar renders better when available
            avatar_url: non_empty(user.avatar_150).or(non_empty(user.avatar)),
            timezone: user.timezone,
        }
    }
}

impl From<WithingsProfileResponse> for Profile {
    fn from(resp: WithingsProfileResponse) -> Self {
        let user_id = match resp.id {
            Some(serde_json::Value::String(s)) => Some(s),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };

        let joined = [resp.first_name.as_deref(), resp.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let full_name = non_empty(resp.full_name).or(non_empty(Some(joined)));

        Profile {
            provider: Provider::Withings,
            user_id,
            display_name: full_name
                .clone()
                .unwrap_or_else(|| placeholder_name(Provider::Withings)),
            full_name,
            avatar_url: None,
            timezone: None,
        }
    }
}

impl Profile {
    /// Parse a profile payload for the given provider.
    pub fn from_json(provider: Provider, value: serde_json::Value) -> serde_json::Result<Self> {
        match provider {
            Provider::Fitbit => serde_json::from_value::<FitbitProfileResponse>(value).map(Into::into),
            Provider::Withings => {
                serde_json::from_value::<WithingsProfileResponse>(value).map(Into::into)
            }
        }
    }
}
