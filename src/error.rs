// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error types for the backend client, the auth session and the callback server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::models::Provider;
use crate::pkce::PkceError;
use crate::storage::StorageError;

/// Failure of a single backend REST call.
///
/// Every `BackendClient` call returns this, so callers pick their own
/// display-or-ignore policy per call site.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Access token expired or invalid")]
    Unauthorized,

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Metric belongs to {expected}, session is {actual}")]
    ProviderMismatch { expected: Provider, actual: Provider },
}

impl ApiError {
    /// True when the backend rejected the provider token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    /// True when the request never produced an HTTP response.
    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }
}

/// Errors surfaced by the login flow and the callback server.
///
/// Refresh failures never appear here: they downgrade the session instead.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Could not obtain authorization URL: {0}")]
    AuthorizationUrl(ApiError),

    #[error("Missing authorization code")]
    MissingCode,

    #[error("Missing state parameter")]
    MissingState,

    #[error("State parameter does not match the login in progress")]
    StateMismatch,

    #[error("Provider denied authorization: {0}")]
    ProviderDenied(String),

    #[error("Token exchange failed: {0}")]
    Exchange(ApiError),

    #[error("No login in progress")]
    NoLoginInProgress,

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Session storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("PKCE generation failed: {0}")]
    Crypto(#[from] PkceError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AuthError::UnknownProvider(p) => {
                (StatusCode::BAD_REQUEST, "unknown_provider", Some(p.clone()))
            }
            AuthError::MissingCode | AuthError::MissingState => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(self.to_string()))
            }
            AuthError::StateMismatch => (StatusCode::BAD_REQUEST, "state_mismatch", None),
            AuthError::ProviderDenied(reason) => {
                (StatusCode::FORBIDDEN, "access_denied", Some(reason.clone()))
            }
            AuthError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AuthError::AuthorizationUrl(e) | AuthError::Exchange(e) => {
                (StatusCode::BAD_GATEWAY, "backend_error", Some(e.to_string()))
            }
            AuthError::NoLoginInProgress => (StatusCode::CONFLICT, "no_login_in_progress", None),
            AuthError::Storage(err) => {
                tracing::error!(error = %err, "Session storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error", None)
            }
            AuthError::Crypto(err) => {
                tracing::error!(error = %err, "PKCE generation failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
            AuthError::Internal(err) => {
                tracing::error!(error = %err, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for auth operations
pub type Result<T> = std::result::Result<T, AuthError>;
