// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HealthSync backend client.
//!
//! Thin wrappers over the backend's REST endpoints. The backend brokers
//! everything provider-facing (authorization URLs, code exchange, token
//! refresh, metrics), so this client never talks to Fitbit or Withings
//! directly. Provider access tokens travel as the `access_token` query
//! parameter; the app session JWT, when present, as a bearer header.

use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::models::{Profile, Provider};

/// Backend REST client.
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

/// Everything an authenticated call needs.
#[derive(Clone)]
pub struct Credentials {
    pub provider: Provider,
    pub access_token: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("provider", &self.provider)
            .field("access_token", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Query sent to `GET /{provider}/login`.
#[derive(Debug, Clone)]
pub struct LoginRequest<'a> {
    pub state: &'a str,
    pub code_challenge: &'a str,
    pub code_challenge_method: &'a str,
    pub scope: Option<&'a str>,
}

/// Response of `GET /{provider}/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizationUrlResponse {
    pub authorization_url: String,
    /// State the backend registered; authoritative when present.
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
}

#[derive(Serialize)]
struct ExchangeRequest<'a> {
    code: &'a str,
    state: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code_verifier: Option<&'a str>,
}

/// Tokens as issued by the provider and relayed by the backend.
///
/// Used for both the code exchange and refresh responses. Refresh responses
/// only carry `refresh_token` when the provider rotated it.
#[derive(Clone, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Fitbit sends `user_id`, Withings `userid` (sometimes numeric).
    #[serde(default, alias = "userid")]
    user_id: Option<serde_json::Value>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenSet {
    pub fn user_id(&self) -> Option<String> {
        match &self.user_id {
            Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }
}

impl std::fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSet")
            .field("expires_in", &self.expires_in)
            .field("user_id", &self.user_id())
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// App session issued by the backend on successful exchange.
#[derive(Clone, Deserialize)]
pub struct AppSession {
    pub token: String,
}

/// Response of `POST /{provider}/callback`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeResponse {
    pub tokens: TokenSet,
    #[serde(default)]
    pub session: Option<AppSession>,
}

impl std::fmt::Debug for AppSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AppSession(<redacted>)")
    }
}

impl BackendClient {
    /// Create a client for the backend at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http(reqwest::Client::new(), base_url)
    }

    pub fn with_http(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    fn url(&self, provider: Provider, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, provider.as_str(), path)
    }

    /// Ask the backend for the provider consent URL.
    pub async fn authorization_url(
        &self,
        provider: Provider,
        request: &LoginRequest<'_>,
    ) -> Result<AuthorizationUrlResponse, ApiError> {
        let mut query = vec![
            ("state", request.state),
            ("code_challenge", request.code_challenge),
            ("code_challenge_method", request.code_challenge_method),
        ];
        if let Some(scope) = request.scope {
            query.push(("scope", scope));
        }

        let response = self
            .http
            .get(self.url(provider, "login"))
            .query(&query)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(
        &self,
        provider: Provider,
        code: &str,
        state: &str,
        code_verifier: Option<&str>,
    ) -> Result<ExchangeResponse, ApiError> {
        let body = ExchangeRequest {
            code,
            state,
            code_verifier,
        };

        let response = self
            .http
            .post(self.url(provider, "callback"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::Network(format!("Token exchange request failed: {}", e)))?;

        self.check_response_json(response).await
    }

    /// Refresh an access token.
    pub async fn refresh_token(
        &self,
        provider: Provider,
        refresh_token: &str,
    ) -> Result<TokenSet, ApiError> {
        let response = self
            .http
            .post(self.url(provider, "refresh"))
            .query(&[("refresh_token", refresh_token)])
            .send()
            .await
            .map_err(|e| ApiError::Network(format!("Token refresh request failed: {}", e)))?;

        self.check_response_json(response).await
    }

    /// Revoke an access token with the provider.
    pub async fn revoke_token(&self, creds: &Credentials) -> Result<(), ApiError> {
        let response = self
            .authorized(self.http.get(self.url(creds.provider, "revoke")), creds)
            .send()
            .await
            .map_err(|e| ApiError::Network(format!("Revocation request failed: {}", e)))?;

        self.check_response(response).await
    }

    /// Revoke the backend app session identified by `session_token`.
    pub async fn end_app_session(&self, session_token: &str) -> Result<(), ApiError> {
        let response = self
            .http
            .post(format!("{}/auth/logout", self.base_url))
            .bearer_auth(session_token)
            .send()
            .await
            .map_err(|e| ApiError::Network(format!("Session logout request failed: {}", e)))?;

        self.check_response(response).await
    }

    /// Fetch the provider profile.
    pub async fn user_profile(&self, creds: &Credentials) -> Result<Profile, ApiError> {
        let value: serde_json::Value = self
            .get_json(&self.url(creds.provider, "user-profile"), creds, &[])
            .await?;

        Profile::from_json(creds.provider, value)
            .map_err(|e| ApiError::Decode(format!("Profile: {}", e)))
    }

    /// GET `/{provider}/metrics/{path}` and decode the JSON body.
    pub async fn get_metric<T: for<'de> Deserialize<'de>>(
        &self,
        creds: &Credentials,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = self.url(creds.provider, &format!("metrics/{}", path));
        self.get_json(&url, creds, query).await
    }

    /// Attach the access token query parameter and the app session header.
    fn authorized(
        &self,
        builder: reqwest::RequestBuilder,
        creds: &Credentials,
    ) -> reqwest::RequestBuilder {
        let builder = builder.query(&[("access_token", creds.access_token.as_str())]);
        match &creds.session_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Generic GET request with JSON response.
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        creds: &Credentials,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let response = self
            .authorized(self.http.get(url), creds)
            .query(query)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Check response status and return error if not successful.
    async fn check_response(&self, response: reqwest::Response) -> Result<(), ApiError> {
        if response.status().is_success() {
            return Ok(());
        }
        Err(Self::status_error(response).await)
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::Decode(format!("JSON parse error: {}", e)))
    }

    async fn status_error(response: reqwest::Response) -> ApiError {
        let status = response.status();

        // Unauthorized - provider token expired or revoked
        if status.as_u16() == 401 {
            return ApiError::Unauthorized;
        }

        let body = response.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), "Backend returned error status");
        ApiError::Status {
            status: status.as_u16(),
            body,
        }
    }
}
