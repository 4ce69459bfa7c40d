// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Persisted session layout and the auth state machine states.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use super::Provider;
use crate::storage::SessionStore;
use crate::time_utils;

/// Key naming the provider whose tokens are active.
pub const ACTIVE_PROVIDER_KEY: &str = "active_provider";
/// Key holding the backend-issued app session JWT.
pub const APP_SESSION_KEY: &str = "app_session_token";
/// Single-provider keys written by older clients.
pub const LEGACY_ACCESS_TOKEN_KEY: &str = "access_token";
pub const LEGACY_REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Per-provider values kept in the session store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenField {
    AccessToken,
    RefreshToken,
    UserId,
    OauthState,
    CodeVerifier,
    ExpiresAt,
}

impl TokenField {
    pub const ALL: [TokenField; 6] = [
        TokenField::AccessToken,
        TokenField::RefreshToken,
        TokenField::UserId,
        TokenField::OauthState,
        TokenField::CodeVerifier,
        TokenField::ExpiresAt,
    ];

    fn suffix(&self) -> &'static str {
        match self {
            TokenField::AccessToken => "access_token",
            TokenField::RefreshToken => "refresh_token",
            TokenField::UserId => "user_id",
            TokenField::OauthState => "oauth_state",
            TokenField::CodeVerifier => "code_verifier",
            TokenField::ExpiresAt => "expires_at",
        }
    }
}

/// Storage key for a provider field, e.g. `fitbit_access_token`.
pub fn storage_key(provider: Provider, field: TokenField) -> String {
    format!("{}_{}", provider.as_str(), field.suffix())
}

/// Where the auth state machine currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "provider", rename_all = "snake_case")]
pub enum SessionState {
    Anonymous,
    Authenticating(Provider),
    Authenticated(Provider),
    Expired(Provider),
}

impl SessionState {
    pub fn provider(&self) -> Option<Provider> {
        match self {
            SessionState::Anonymous => None,
            SessionState::Authenticating(p)
            | SessionState::Authenticated(p)
            | SessionState::Expired(p) => Some(*p),
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Anonymous => f.write_str("anonymous"),
            SessionState::Authenticating(p) => write!(f, "authenticating ({})", p),
            SessionState::Authenticated(p) => write!(f, "authenticated ({})", p),
            SessionState::Expired(p) => write!(f, "expired ({})", p),
        }
    }
}

/// Snapshot of what the store holds for the active provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub active_provider: Option<Provider>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub oauth_state: Option<String>,
    pub user_id: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub app_session_token: Option<String>,
}

impl Session {
    /// Read the active provider's keys from the store.
    ///
    /// An unparseable `active_provider` value reads as no provider.
    pub fn load(store: &dyn SessionStore) -> Self {
        let active_provider = store
            .get(ACTIVE_PROVIDER_KEY)
            .and_then(|v| v.parse::<Provider>().ok());
        let app_session_token = store.get(APP_SESSION_KEY);

        let Some(provider) = active_provider else {
            return Self {
                app_session_token,
                ..Self::default()
            };
        };

        Self {
            active_provider,
            access_token: store.get(&storage_key(provider, TokenField::AccessToken)),
            refresh_token: store.get(&storage_key(provider, TokenField::RefreshToken)),
            oauth_state: store.get(&storage_key(provider, TokenField::OauthState)),
            user_id: store.get(&storage_key(provider, TokenField::UserId)),
            expires_at: store
                .get(&storage_key(provider, TokenField::ExpiresAt))
                .and_then(|v| time_utils::parse_rfc3339_utc(&v)),
            app_session_token,
        }
    }

    /// True if any credential that could yield an access token is stored.
    pub fn has_credentials(&self) -> bool {
        self.access_token.is_some() || self.refresh_token.is_some()
    }

    /// True once the known expiry is within `margin_secs` of `now`.
    ///
    /// An unknown expiry never counts as expired.
    pub fn access_token_expired(&self, now: DateTime<Utc>, margin_secs: i64) -> bool {
        self.expires_at
            .is_some_and(|at| time_utils::is_expired(at, now, margin_secs))
    }

    /// True if an access token can be had at `now` without a new login.
    pub fn has_usable_credentials(&self, now: DateTime<Utc>, margin_secs: i64) -> bool {
        self.refresh_token.is_some()
            || (self.access_token.is_some() && !self.access_token_expired(now, margin_secs))
    }
}
