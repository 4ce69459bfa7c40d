// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Auth session state machine.
//!
//! Owns the single active provider's token lifecycle:
//! - login start (PKCE + state, consent-page navigation)
//! - callback completion (code exchange, token persistence)
//! - access token retrieval with refresh-on-miss
//! - profile loading with one retry after a forced refresh
//! - logout with best-effort revocation
//!
//! Refresh and profile failures never surface as errors; they downgrade the
//! session to [`SessionState::Expired`] and the caller treats it as logged out.

use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::{ApiError, AuthError, Result};
use crate::models::session::{
    ACTIVE_PROVIDER_KEY, APP_SESSION_KEY, LEGACY_ACCESS_TOKEN_KEY, LEGACY_REFRESH_TOKEN_KEY,
};
use crate::models::{storage_key, Profile, Provider, Session, SessionState, TokenField};
use crate::navigation::Navigator;
use crate::pkce;
use crate::services::backend::{BackendClient, Credentials, LoginRequest, TokenSet};
use crate::storage::SessionStore;
use crate::time_utils;

/// Treat access tokens this close to expiry as already expired.
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

/// Query parameters the provider appends to the redirect URI.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Process-wide session, constructed once and passed to whoever needs it.
pub struct AuthSession {
    backend: BackendClient,
    store: Arc<dyn SessionStore>,
    navigator: Arc<dyn Navigator>,
    dashboard_url: String,
    state: SessionState,
    profile: Option<Profile>,
}

impl AuthSession {
    /// Create an anonymous session. Call [`restore`](Self::restore) to pick
    /// up a persisted login.
    pub fn new(
        backend: BackendClient,
        store: Arc<dyn SessionStore>,
        navigator: Arc<dyn Navigator>,
        dashboard_url: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            store,
            navigator,
            dashboard_url: dashboard_url.into(),
            state: SessionState::Anonymous,
            profile: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated(_))
    }

    pub fn active_provider(&self) -> Option<Provider> {
        self.state.provider()
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    /// Snapshot of what is persisted for the active provider.
    pub fn session(&self) -> Session {
        Session::load(self.store.as_ref())
    }

    // ─── Lifecycle ──────────────────────────────────────────────────────────

    /// Rebuild in-memory state from the store on application start.
    pub fn restore(&mut self) -> SessionState {
        self.migrate_legacy_keys();
        self.drop_expired_app_session();

        let session = self.session();
        let now = Utc::now();
        self.state = match session.active_provider {
            Some(provider) if session.has_usable_credentials(now, TOKEN_EXPIRY_MARGIN_SECS) => {
                SessionState::Authenticated(provider)
            }
            // Expired access token with nothing to refresh it
            Some(provider) if session.has_credentials() => SessionState::Expired(provider),
            _ => SessionState::Anonymous,
        };
        self.profile = None;

        tracing::debug!(state = %self.state, "Session restored");
        self.state
    }

    /// Move single-provider keys from older clients under the active provider.
    fn migrate_legacy_keys(&self) {
        let legacy = [
            (LEGACY_ACCESS_TOKEN_KEY, TokenField::AccessToken),
            (LEGACY_REFRESH_TOKEN_KEY, TokenField::RefreshToken),
        ];
        if !legacy.iter().any(|(key, _)| self.store.contains(key)) {
            return;
        }

        let active = self
            .store
            .get(ACTIVE_PROVIDER_KEY)
            .and_then(|v| v.parse::<Provider>().ok());

        for (legacy_key, field) in legacy {
            let Some(value) = self.store.get(legacy_key) else {
                continue;
            };
            if let Some(provider) = active {
                let key = storage_key(provider, field);
                if !self.store.contains(&key) {
                    self.store_or_log(&key, &value);
                }
            }
            self.remove_or_log(legacy_key);
        }

        tracing::info!(provider = ?active, "Migrated legacy session keys");
    }

    /// Forget an app session JWT whose `exp` has passed.
    fn drop_expired_app_session(&self) {
        let Some(token) = self.store.get(APP_SESSION_KEY) else {
            return;
        };
        if app_session_expired(&token) {
            tracing::info!("App session token expired, discarding");
            self.remove_or_log(APP_SESSION_KEY);
        }
    }

    // ─── Login ──────────────────────────────────────────────────────────────

    /// Begin an OAuth login with `provider`.
    ///
    /// Clears the other provider's tokens, records `provider` as active and
    /// navigates to the consent page. On success the flow continues in
    /// [`complete_login`](Self::complete_login) once the redirect arrives.
    pub async fn login_start(&mut self, provider: Provider, scope: Option<&str>) -> Result<()> {
        // Single active provider: wipe everything of the other one, and any
        // leftovers of an earlier attempt with this one.
        self.clear_provider(provider.other())?;
        self.clear_provider(provider)?;
        self.store.set(ACTIVE_PROVIDER_KEY, provider.as_str())?;
        self.profile = None;
        self.state = SessionState::Authenticating(provider);

        let result = self.request_consent(provider, scope).await;
        if result.is_err() {
            self.state = SessionState::Anonymous;
        }
        result
    }

    async fn request_consent(&mut self, provider: Provider, scope: Option<&str>) -> Result<()> {
        let pair = pkce::generate_pkce()?;
        let local_state = pkce::generate_state()?;
        self.store
            .set(&storage_key(provider, TokenField::CodeVerifier), &pair.verifier)?;

        let request = LoginRequest {
            state: &local_state,
            code_challenge: &pair.challenge,
            code_challenge_method: pair.method(),
            scope,
        };

        let response = self
            .backend
            .authorization_url(provider, &request)
            .await
            .map_err(|e| {
                tracing::warn!(provider = %provider, error = %e, "Authorization URL request failed");
                AuthError::AuthorizationUrl(e)
            })?;

        // Never navigate anywhere but the provider's own consent page
        if !provider.is_authorization_url(&response.authorization_url) {
            return Err(AuthError::AuthorizationUrl(ApiError::Decode(format!(
                "authorization URL does not point at {}",
                provider.authorization_endpoint()
            ))));
        }

        let oauth_state = response.state.unwrap_or(local_state);
        self.store
            .set(&storage_key(provider, TokenField::OauthState), &oauth_state)?;

        tracing::info!(
            provider = %provider,
            redirect_uri = ?response.redirect_uri,
            "Starting OAuth flow, redirecting to provider"
        );

        self.navigator.navigate(&response.authorization_url);
        Ok(())
    }

    /// Finish the login from the provider redirect's query parameters.
    pub async fn complete_login(&mut self, params: CallbackParams) -> Result<Provider> {
        let result = self.exchange_callback(params).await;
        match &result {
            Ok(provider) => {
                self.state = SessionState::Authenticated(*provider);
                tracing::info!(provider = %provider, "OAuth successful, tokens stored");
                self.navigator.navigate(&self.dashboard_url);
            }
            Err(e) => {
                tracing::warn!(error = %e, "OAuth callback rejected");
                if let Some(provider) = self.state.provider().or(self.session().active_provider) {
                    self.discard_pending_login(provider);
                }
                self.state = SessionState::Anonymous;
            }
        }
        result
    }

    /// Forget the state and verifier of an unfinished login.
    fn discard_pending_login(&self, provider: Provider) {
        self.remove_or_log(&storage_key(provider, TokenField::OauthState));
        self.remove_or_log(&storage_key(provider, TokenField::CodeVerifier));
    }

    async fn exchange_callback(&mut self, params: CallbackParams) -> Result<Provider> {
        let provider = match self.state {
            SessionState::Authenticating(p) => p,
            _ => self
                .session()
                .active_provider
                .filter(|p| self.store.contains(&storage_key(*p, TokenField::OauthState)))
                .ok_or(AuthError::NoLoginInProgress)?,
        };

        if let Some(error) = params.error {
            return Err(AuthError::ProviderDenied(error));
        }
        let code = params
            .code
            .filter(|c| !c.is_empty())
            .ok_or(AuthError::MissingCode)?;
        let state = params
            .state
            .filter(|s| !s.is_empty())
            .ok_or(AuthError::MissingState)?;

        let expected = self
            .store
            .get(&storage_key(provider, TokenField::OauthState))
            .ok_or(AuthError::NoLoginInProgress)?;
        if !pkce::states_match(&expected, &state) {
            return Err(AuthError::StateMismatch);
        }

        let verifier = self
            .store
            .get(&storage_key(provider, TokenField::CodeVerifier));

        tracing::info!(provider = %provider, "Exchanging authorization code for tokens");
        let exchange = self
            .backend
            .exchange_code(provider, &code, &state, verifier.as_deref())
            .await
            .map_err(AuthError::Exchange)?;

        self.store_tokens(provider, &exchange.tokens)?;
        if let Some(user_id) = exchange.tokens.user_id() {
            self.store
                .set(&storage_key(provider, TokenField::UserId), &user_id)?;
        }
        if let Some(session) = exchange.session {
            self.store.set(APP_SESSION_KEY, &session.token)?;
        }

        self.store
            .remove(&storage_key(provider, TokenField::OauthState))?;
        self.store
            .remove(&storage_key(provider, TokenField::CodeVerifier))?;

        Ok(provider)
    }

    // ─── Tokens ─────────────────────────────────────────────────────────────

    /// Current access token, refreshing once if only a refresh token is stored.
    ///
    /// Returns `None` when there is no usable credential or the refresh
    /// failed; the session is then `Expired` and the caller should log in.
    pub async fn get_access_token(&mut self) -> Option<String> {
        let session = self.session();
        let provider = session.active_provider?;

        let had_access_token = session.access_token.is_some();
        if let Some(token) = session.access_token.as_deref() {
            if !session.access_token_expired(Utc::now(), TOKEN_EXPIRY_MARGIN_SECS) {
                return Some(token.to_string());
            }
            tracing::debug!(provider = %provider, "Access token expired");
        }

        let Some(refresh_token) = session.refresh_token else {
            if had_access_token {
                tracing::info!(provider = %provider, "Access token expired and no refresh token stored");
                self.state = SessionState::Expired(provider);
            }
            return None;
        };
        self.refresh_with(provider, &refresh_token).await
    }

    /// Bundle provider, access token and app session for an API call.
    pub async fn credentials(&mut self) -> Option<Credentials> {
        let access_token = self.get_access_token().await?;
        let provider = self.session().active_provider?;
        Some(Credentials {
            provider,
            access_token,
            session_token: self.store.get(APP_SESSION_KEY),
        })
    }

    /// Drop the cached access token and refresh unconditionally.
    async fn force_refresh(&mut self, provider: Provider) -> Option<String> {
        self.remove_or_log(&storage_key(provider, TokenField::AccessToken));
        let refresh_token = self
            .store
            .get(&storage_key(provider, TokenField::RefreshToken))?;
        self.refresh_with(provider, &refresh_token).await
    }

    async fn refresh_with(&mut self, provider: Provider, refresh_token: &str) -> Option<String> {
        tracing::info!(provider = %provider, "Refreshing access token");

        match self.backend.refresh_token(provider, refresh_token).await {
            Ok(tokens) => {
                if let Err(e) = self.store_tokens(provider, &tokens) {
                    tracing::warn!(provider = %provider, error = %e, "Failed to persist refreshed token");
                }
                self.state = SessionState::Authenticated(provider);
                Some(tokens.access_token)
            }
            Err(e) => {
                tracing::warn!(provider = %provider, error = %e, "Token refresh failed");
                self.state = SessionState::Expired(provider);
                None
            }
        }
    }

    /// Persist access token, rotated refresh token and expiry.
    fn store_tokens(&self, provider: Provider, tokens: &TokenSet) -> Result<()> {
        self.store.set(
            &storage_key(provider, TokenField::AccessToken),
            &tokens.access_token,
        )?;
        if let Some(refresh) = tokens.refresh_token.as_deref().filter(|r| !r.is_empty()) {
            self.store
                .set(&storage_key(provider, TokenField::RefreshToken), refresh)?;
        }

        let expires_at = tokens.expires_in.and_then(|secs| {
            let at = time_utils::expiry_from_now(Utc::now(), secs);
            if at.is_none() {
                tracing::warn!(provider = %provider, expires_in = secs, "Token lifetime out of range, expiry unknown");
            }
            at
        });

        let expires_key = storage_key(provider, TokenField::ExpiresAt);
        match expires_at {
            Some(at) => self
                .store
                .set(&expires_key, &time_utils::format_utc_rfc3339(at))?,
            None => self.store.remove(&expires_key)?,
        }
        Ok(())
    }

    // ─── Profile ────────────────────────────────────────────────────────────

    /// Load the provider profile, retrying once after a forced refresh.
    pub async fn load_profile(&mut self) -> Option<Profile> {
        let Some(provider) = self.session().active_provider else {
            self.profile = None;
            return None;
        };

        // get_access_token already spent the refresh attempt if it needed one
        let Some(creds) = self.credentials().await else {
            return self.expire_profile(provider);
        };

        match self.backend.user_profile(&creds).await {
            Ok(profile) => return Some(self.set_profile(profile)),
            Err(e) => {
                tracing::warn!(provider = %provider, error = %e, "Profile fetch failed, refreshing token");
            }
        }

        let retried = match self.force_refresh(provider).await {
            Some(access_token) => {
                let creds = Credentials {
                    provider,
                    access_token,
                    session_token: self.store.get(APP_SESSION_KEY),
                };
                self.backend.user_profile(&creds).await.ok()
            }
            None => None,
        };

        match retried {
            Some(profile) => Some(self.set_profile(profile)),
            None => self.expire_profile(provider),
        }
    }

    fn expire_profile(&mut self, provider: Provider) -> Option<Profile> {
        tracing::warn!(provider = %provider, "Profile unavailable, session expired");
        self.profile = None;
        self.state = SessionState::Expired(provider);
        None
    }

    fn set_profile(&mut self, profile: Profile) -> Profile {
        self.state = SessionState::Authenticated(profile.provider);
        self.profile = Some(profile.clone());
        profile
    }

    // ─── Logout ─────────────────────────────────────────────────────────────

    /// Revoke (best effort) and clear everything, whatever the revoke outcome.
    pub async fn logout(&mut self) {
        let session = self.session();
        if let (Some(provider), Some(access_token)) =
            (session.active_provider, session.access_token)
        {
            let creds = Credentials {
                provider,
                access_token,
                session_token: session.app_session_token.clone(),
            };
            if let Err(e) = self.backend.revoke_token(&creds).await {
                tracing::warn!(provider = %provider, error = %e, "Token revocation failed, clearing anyway");
            }
        }
        if let Some(token) = session.app_session_token.as_deref() {
            if let Err(e) = self.backend.end_app_session(token).await {
                tracing::warn!(error = %e, "App session revocation failed, clearing anyway");
            }
        }

        for provider in Provider::ALL {
            for field in TokenField::ALL {
                self.remove_or_log(&storage_key(provider, field));
            }
        }
        self.remove_or_log(ACTIVE_PROVIDER_KEY);
        self.remove_or_log(APP_SESSION_KEY);

        self.profile = None;
        self.state = SessionState::Anonymous;
        tracing::info!("Logged out");
    }

    // ─── Storage helpers ────────────────────────────────────────────────────

    fn clear_provider(&self, provider: Provider) -> Result<()> {
        for field in TokenField::ALL {
            self.store.remove(&storage_key(provider, field))?;
        }
        Ok(())
    }

    fn store_or_log(&self, key: &str, value: &str) {
        if let Err(e) = self.store.set(key, value) {
            tracing::warn!(key, error = %e, "Failed to write session key");
        }
    }

    fn remove_or_log(&self, key: &str) {
        if let Err(e) = self.store.remove(key) {
            tracing::warn!(key, error = %e, "Failed to remove session key");
        }
    }
}

/// Claims we read from the app session JWT.
#[derive(Debug, Deserialize)]
struct AppSessionClaims {
    exp: i64,
}

/// True when the JWT's `exp` has passed or the token is unreadable.
///
/// The signature is not checked: the backend verifies it, the client only
/// needs to know whether sending it is pointless.
pub fn app_session_expired(token: &str) -> bool {
    use jsonwebtoken::{decode, DecodingKey, Validation};

    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    match decode::<AppSessionClaims>(token, &DecodingKey::from_secret(&[]), &validation) {
        Ok(data) => data.claims.exp <= Utc::now().timestamp(),
        Err(e) => {
            tracing::debug!(error = %e, "Unreadable app session token");
            true
        }
    }
}
