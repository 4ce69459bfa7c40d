// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use healthsync::models::{storage_key, Provider, TokenField};
use healthsync::navigation::Navigator;
use healthsync::routes::{create_router, CallbackEvent};
use healthsync::services::{AuthSession, BackendClient};
use healthsync::storage::{MemoryStore, SessionStore};
use healthsync::AppState;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub const DASHBOARD_URL: &str = "http://localhost:5173/dashboard";

/// Navigator that remembers every URL instead of opening it.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visited: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl RecordingNavigator {
    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.visited.lock().unwrap().last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, url: &str) {
        self.visited.lock().unwrap().push(url.to_string());
    }
}

/// A session wired to an in-memory store and a recording navigator.
#[allow(dead_code)]
pub struct TestSession {
    pub session: AuthSession,
    pub store: Arc<MemoryStore>,
    pub navigator: Arc<RecordingNavigator>,
}

/// Build a session against the backend at `base_url` (usually a wiremock URI).
#[allow(dead_code)]
pub fn test_session(base_url: &str) -> TestSession {
    let store = Arc::new(MemoryStore::new());
    let navigator = Arc::new(RecordingNavigator::default());
    let session = AuthSession::new(
        BackendClient::new(base_url),
        store.clone(),
        navigator.clone(),
        DASHBOARD_URL,
    );
    TestSession {
        session,
        store,
        navigator,
    }
}

/// Seed tokens for `provider` and mark it active.
#[allow(dead_code)]
pub fn seed_tokens(
    store: &dyn SessionStore,
    provider: Provider,
    access: Option<&str>,
    refresh: Option<&str>,
) {
    store.set("active_provider", provider.as_str()).unwrap();
    if let Some(access) = access {
        store
            .set(&storage_key(provider, TokenField::AccessToken), access)
            .unwrap();
    }
    if let Some(refresh) = refresh {
        store
            .set(&storage_key(provider, TokenField::RefreshToken), refresh)
            .unwrap();
    }
}

/// Keys in `store` that belong to `provider`.
#[allow(dead_code)]
pub fn provider_keys(store: &dyn SessionStore, provider: Provider) -> Vec<String> {
    let prefix = format!("{}_", provider.as_str());
    store
        .keys()
        .into_iter()
        .filter(|k| k.starts_with(&prefix))
        .collect()
}

/// Create the callback router plus the receiving end of its event channel.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, mpsc::Receiver<CallbackEvent>) {
    let (events, rx) = mpsc::channel(8);
    let state = Arc::new(AppState { events });
    (create_router(state), rx)
}

/// An authorization URL the backend would return for `provider`.
#[allow(dead_code)]
pub fn consent_url(provider: Provider, state: &str) -> String {
    format!(
        "{}?client_id=CLIENT&response_type=code&state={}",
        provider.authorization_endpoint(),
        state
    )
}

/// An app session JWT expiring `exp` (unix seconds), signed with a throwaway key.
#[allow(dead_code)]
pub fn app_session_jwt(exp: i64) -> String {
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &serde_json::json!({ "sub": "user-1", "jti": "session-1", "exp": exp }),
        &jsonwebtoken::EncodingKey::from_secret(b"test-secret"),
    )
    .unwrap()
}
