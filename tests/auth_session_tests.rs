// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Auth session lifecycle against a mock backend.

use healthsync::error::AuthError;
use healthsync::models::{storage_key, Provider, SessionState, TokenField};
use healthsync::services::CallbackParams;
use healthsync::storage::SessionStore;
use serde_json::json;
use wiremock::matchers::{any, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{app_session_jwt, consent_url, provider_keys, seed_tokens, test_session, DASHBOARD_URL};

fn callback(code: Option<&str>, state: Option<&str>) -> CallbackParams {
    CallbackParams {
        code: code.map(str::to_string),
        state: state.map(str::to_string),
        error: None,
    }
}

async fn mount_login(server: &MockServer, provider: Provider, state: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/{}/login", provider)))
        .and(query_param("code_challenge_method", "S256"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "authorization_url": consent_url(provider, state),
            "state": state,
        })))
        .mount(server)
        .await;
}

async fn mount_exchange(server: &MockServer, provider: Provider, code: &str, access: &str) {
    Mock::given(method("POST"))
        .and(path(format!("/{}/callback", provider)))
        .and(body_partial_json(json!({ "code": code })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tokens": {
                "access_token": access,
                "refresh_token": format!("{}-refresh", access),
                "expires_in": 28800,
                "user_id": "USER1"
            }
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_login_start_stores_verifier_and_backend_state() {
    let server = MockServer::start().await;
    mount_login(&server, Provider::Fitbit, "backend-state").await;
    let mut t = test_session(&server.uri());

    t.session
        .login_start(Provider::Fitbit, Some("activity sleep"))
        .await
        .unwrap();

    assert_eq!(t.session.state(), SessionState::Authenticating(Provider::Fitbit));
    assert_eq!(t.store.get("active_provider").as_deref(), Some("fitbit"));
    assert_eq!(
        t.store
            .get(&storage_key(Provider::Fitbit, TokenField::OauthState))
            .as_deref(),
        Some("backend-state")
    );
    let verifier = t
        .store
        .get(&storage_key(Provider::Fitbit, TokenField::CodeVerifier))
        .expect("verifier stored");
    assert!((43..=128).contains(&verifier.len()));
    assert_eq!(
        t.navigator.last(),
        Some(consent_url(Provider::Fitbit, "backend-state"))
    );
}

#[tokio::test]
async fn test_login_start_rejects_foreign_authorization_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fitbit/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "authorization_url": "https://attacker.example/oauth2/authorize?state=x"
        })))
        .mount(&server)
        .await;
    let mut t = test_session(&server.uri());

    let err = t
        .session
        .login_start(Provider::Fitbit, None)
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::AuthorizationUrl(_)));
    assert_eq!(t.session.state(), SessionState::Anonymous);
    assert!(t.navigator.visited().is_empty());
}

#[tokio::test]
async fn test_login_start_backend_down_resets_state() {
    let mut t = test_session("http://127.0.0.1:1");

    let err = t
        .session
        .login_start(Provider::Withings, None)
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::AuthorizationUrl(e) if e.is_network()));
    assert_eq!(t.session.state(), SessionState::Anonymous);
}

#[tokio::test]
async fn test_switching_provider_clears_previous_tokens() {
    let server = MockServer::start().await;
    mount_login(&server, Provider::Fitbit, "fitbit-state").await;
    mount_login(&server, Provider::Withings, "withings-state").await;
    mount_exchange(&server, Provider::Fitbit, "fitbit-code", "fitbit-access").await;
    mount_exchange(&server, Provider::Withings, "withings-code", "withings-access").await;
    let mut t = test_session(&server.uri());

    // Fitbit first
    t.session.login_start(Provider::Fitbit, None).await.unwrap();
    let provider = t
        .session
        .complete_login(callback(Some("fitbit-code"), Some("fitbit-state")))
        .await
        .unwrap();

    assert_eq!(provider, Provider::Fitbit);
    assert_eq!(t.session.state(), SessionState::Authenticated(Provider::Fitbit));
    assert_eq!(t.store.get("active_provider").as_deref(), Some("fitbit"));
    assert_eq!(
        t.store.get("fitbit_access_token").as_deref(),
        Some("fitbit-access")
    );
    assert_eq!(t.store.get("fitbit_user_id").as_deref(), Some("USER1"));
    assert!(t.store.get("fitbit_oauth_state").is_none());
    assert!(t.store.get("fitbit_code_verifier").is_none());
    assert_eq!(t.navigator.last().as_deref(), Some(DASHBOARD_URL));

    // Then Withings: every fitbit_* key must go
    t.session.login_start(Provider::Withings, None).await.unwrap();
    assert!(provider_keys(t.store.as_ref(), Provider::Fitbit).is_empty());
    assert_eq!(t.store.get("active_provider").as_deref(), Some("withings"));

    t.session
        .complete_login(callback(Some("withings-code"), Some("withings-state")))
        .await
        .unwrap();

    assert!(provider_keys(t.store.as_ref(), Provider::Fitbit).is_empty());
    assert_eq!(
        t.store.get("withings_access_token").as_deref(),
        Some("withings-access")
    );
    assert_eq!(t.session.active_provider(), Some(Provider::Withings));
}

#[tokio::test]
async fn test_exchange_sends_stored_verifier() {
    let server = MockServer::start().await;
    mount_login(&server, Provider::Withings, "s1").await;
    let mut t = test_session(&server.uri());
    t.session.login_start(Provider::Withings, None).await.unwrap();

    let verifier = t
        .store
        .get(&storage_key(Provider::Withings, TokenField::CodeVerifier))
        .unwrap();
    Mock::given(method("POST"))
        .and(path("/withings/callback"))
        .and(body_partial_json(json!({
            "code": "c1",
            "state": "s1",
            "code_verifier": verifier
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tokens": {"access_token": "a1", "userid": 42},
            "session": {"token": "app-jwt"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    t.session
        .complete_login(callback(Some("c1"), Some("s1")))
        .await
        .unwrap();

    assert_eq!(t.store.get("withings_user_id").as_deref(), Some("42"));
    assert_eq!(t.store.get("app_session_token").as_deref(), Some("app-jwt"));
    // No expires_in: expiry unknown, token used until the backend rejects it
    assert!(t.store.get("withings_expires_at").is_none());
}

#[tokio::test]
async fn test_callback_rejected_without_backend_call() {
    let server = MockServer::start().await;
    mount_login(&server, Provider::Fitbit, "expected-state").await;
    Mock::given(method("POST"))
        .and(path("/fitbit/callback"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let mut t = test_session(&server.uri());

    let rejected = [
        (callback(Some("code"), Some("forged-state")), "state"),
        (callback(None, Some("expected-state")), "code"),
        (callback(Some("code"), None), "missing state"),
        (
            CallbackParams {
                error: Some("access_denied".to_string()),
                ..CallbackParams::default()
            },
            "denied",
        ),
    ];
    for (params, case) in rejected {
        t.session.login_start(Provider::Fitbit, None).await.unwrap();
        let err = t.session.complete_login(params).await.unwrap_err();
        match case {
            "state" => assert!(matches!(err, AuthError::StateMismatch)),
            "code" => assert!(matches!(err, AuthError::MissingCode)),
            "missing state" => assert!(matches!(err, AuthError::MissingState)),
            _ => assert!(matches!(err, AuthError::ProviderDenied(ref reason) if reason == "access_denied")),
        }
        assert_eq!(t.session.state(), SessionState::Anonymous, "{case}");
    }

    assert!(t.store.get("fitbit_access_token").is_none());
}

#[tokio::test]
async fn test_rejected_callback_cannot_be_replayed() {
    let server = MockServer::start().await;
    mount_login(&server, Provider::Fitbit, "expected-state").await;
    Mock::given(method("POST"))
        .and(path("/fitbit/callback"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let mut t = test_session(&server.uri());
    t.session.login_start(Provider::Fitbit, None).await.unwrap();

    let err = t
        .session
        .complete_login(callback(Some("code"), Some("forged-state")))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::StateMismatch));
    assert!(t.store.get("fitbit_oauth_state").is_none());
    assert!(t.store.get("fitbit_code_verifier").is_none());

    // The genuine redirect arriving late no longer matches a pending login
    let err = t
        .session
        .complete_login(callback(Some("code"), Some("expected-state")))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::NoLoginInProgress));
    assert_eq!(t.session.state(), SessionState::Anonymous);
}

#[tokio::test]
async fn test_callback_without_login_in_progress() {
    let server = MockServer::start().await;
    let mut t = test_session(&server.uri());

    let err = t
        .session
        .complete_login(callback(Some("code"), Some("state")))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::NoLoginInProgress));
}

#[tokio::test]
async fn test_exchange_failure_is_reported() {
    let server = MockServer::start().await;
    mount_login(&server, Provider::Fitbit, "s").await;
    Mock::given(method("POST"))
        .and(path("/fitbit/callback"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
        .expect(1)
        .mount(&server)
        .await;
    let mut t = test_session(&server.uri());

    t.session.login_start(Provider::Fitbit, None).await.unwrap();
    let err = t
        .session
        .complete_login(callback(Some("code"), Some("s")))
        .await
        .unwrap_err();

    match err {
        AuthError::Exchange(healthsync::error::ApiError::Status { status, body }) => {
            assert_eq!(status, 400);
            assert_eq!(body, "invalid_grant");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(t.session.state(), SessionState::Anonymous);
    assert_eq!(t.navigator.visited().len(), 1, "no dashboard navigation");
}

#[tokio::test]
async fn test_get_access_token_uses_stored_token_without_network() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    let mut t = test_session(&server.uri());
    seed_tokens(t.store.as_ref(), Provider::Fitbit, Some("stored"), Some("r"));
    t.session.restore();

    assert_eq!(t.session.get_access_token().await.as_deref(), Some("stored"));
}

#[tokio::test]
async fn test_get_access_token_refreshes_exactly_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/withings/refresh"))
        .and(query_param("refresh_token", "r1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh",
            "refresh_token": "r2",
            "expires_in": 10800
        })))
        .expect(1)
        .mount(&server)
        .await;
    let mut t = test_session(&server.uri());
    seed_tokens(t.store.as_ref(), Provider::Withings, None, Some("r1"));
    t.session.restore();

    assert_eq!(t.session.get_access_token().await.as_deref(), Some("fresh"));
    assert_eq!(t.store.get("withings_access_token").as_deref(), Some("fresh"));
    assert_eq!(t.store.get("withings_refresh_token").as_deref(), Some("r2"));
    assert!(t.store.get("withings_expires_at").is_some());
    assert_eq!(t.session.state(), SessionState::Authenticated(Provider::Withings));

    // Second call is served from the store
    assert_eq!(t.session.get_access_token().await.as_deref(), Some("fresh"));
}

#[tokio::test]
async fn test_get_access_token_refresh_failure_returns_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fitbit/refresh"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
        .expect(1)
        .mount(&server)
        .await;
    let mut t = test_session(&server.uri());
    seed_tokens(t.store.as_ref(), Provider::Fitbit, None, Some("revoked"));
    t.session.restore();

    assert_eq!(t.session.get_access_token().await, None);
    assert_eq!(t.session.state(), SessionState::Expired(Provider::Fitbit));
}

#[tokio::test]
async fn test_expired_access_token_is_refreshed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fitbit/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "renewed",
            "expires_in": 28800
        })))
        .expect(1)
        .mount(&server)
        .await;
    let mut t = test_session(&server.uri());
    seed_tokens(t.store.as_ref(), Provider::Fitbit, Some("stale"), Some("r"));
    t.store
        .set("fitbit_expires_at", "2020-01-01T00:00:00Z")
        .unwrap();
    t.session.restore();

    assert_eq!(t.session.get_access_token().await.as_deref(), Some("renewed"));
    // Refresh token was not rotated, so the old one stays
    assert_eq!(t.store.get("fitbit_refresh_token").as_deref(), Some("r"));
}

#[tokio::test]
async fn test_expired_access_token_without_refresh_token_expires_session() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    let mut t = test_session(&server.uri());
    seed_tokens(t.store.as_ref(), Provider::Fitbit, Some("old"), None);
    t.store
        .set("fitbit_expires_at", "2000-01-01T00:00:00Z")
        .unwrap();

    assert_eq!(t.session.restore(), SessionState::Expired(Provider::Fitbit));
    assert!(!t.session.is_authenticated());

    assert_eq!(t.session.get_access_token().await, None);
    assert_eq!(t.session.state(), SessionState::Expired(Provider::Fitbit));
    assert!(t.session.credentials().await.is_none());
}

#[tokio::test]
async fn test_out_of_range_expires_in_is_stored_as_unknown() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fitbit/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new",
            "expires_in": i64::MAX
        })))
        .expect(1)
        .mount(&server)
        .await;
    let mut t = test_session(&server.uri());
    seed_tokens(t.store.as_ref(), Provider::Fitbit, None, Some("r"));
    t.store
        .set("fitbit_expires_at", "2020-01-01T00:00:00Z")
        .unwrap();
    t.session.restore();

    assert_eq!(t.session.get_access_token().await.as_deref(), Some("new"));
    assert!(t.store.get("fitbit_expires_at").is_none());
    assert_eq!(t.session.state(), SessionState::Authenticated(Provider::Fitbit));

    // Unknown expiry: the stored token is served without another refresh
    assert_eq!(t.session.get_access_token().await.as_deref(), Some("new"));
}

#[tokio::test]
async fn test_no_credentials_means_no_token() {
    let server = MockServer::start().await;
    let mut t = test_session(&server.uri());
    t.session.restore();

    assert_eq!(t.session.state(), SessionState::Anonymous);
    assert_eq!(t.session.get_access_token().await, None);
    assert!(t.session.load_profile().await.is_none());
}

#[tokio::test]
async fn test_profile_loads_with_refreshed_token_first_try() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fitbit/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh",
            "expires_in": 28800
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fitbit/user-profile"))
        .and(query_param("access_token", "fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": {"encodedId": "ABC", "displayName": "Sam", "timezone": "UTC"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    let mut t = test_session(&server.uri());
    seed_tokens(t.store.as_ref(), Provider::Fitbit, None, Some("valid"));
    t.session.restore();

    let profile = t.session.load_profile().await.expect("profile");

    assert_eq!(profile.display_name, "Sam");
    assert_eq!(t.session.profile(), Some(&profile));
    assert_eq!(t.session.state(), SessionState::Authenticated(Provider::Fitbit));
}

#[tokio::test]
async fn test_profile_retries_once_after_forced_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/withings/user-profile"))
        .and(query_param("access_token", "old"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/withings/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new",
            "refresh_token": "r2"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/withings/user-profile"))
        .and(query_param("access_token", "new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7, "firstName": "Ada", "lastName": "Lovelace"
        })))
        .expect(1)
        .mount(&server)
        .await;
    let mut t = test_session(&server.uri());
    seed_tokens(t.store.as_ref(), Provider::Withings, Some("old"), Some("r1"));
    t.session.restore();

    let profile = t.session.load_profile().await.expect("profile after retry");

    assert_eq!(profile.display_name, "Ada Lovelace");
    assert_eq!(profile.user_id.as_deref(), Some("7"));
    assert_eq!(t.store.get("withings_access_token").as_deref(), Some("new"));
}

#[tokio::test]
async fn test_profile_failure_after_retry_expires_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fitbit/user-profile"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/fitbit/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "also-bad"})))
        .expect(1)
        .mount(&server)
        .await;
    let mut t = test_session(&server.uri());
    seed_tokens(t.store.as_ref(), Provider::Fitbit, Some("bad"), Some("r"));
    t.session.restore();

    assert!(t.session.load_profile().await.is_none());
    assert!(t.session.profile().is_none());
    assert_eq!(t.session.state(), SessionState::Expired(Provider::Fitbit));
}

#[tokio::test]
async fn test_logout_clears_even_when_revoke_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fitbit/revoke"))
        .and(query_param("access_token", "a"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    let mut t = test_session(&server.uri());
    seed_tokens(t.store.as_ref(), Provider::Fitbit, Some("a"), Some("r"));
    t.store.set("app_session_token", "jwt").unwrap();
    t.store.set("withings_refresh_token", "stray").unwrap();
    t.session.restore();

    t.session.logout().await;

    assert!(t.store.keys().is_empty(), "left behind: {:?}", t.store.keys());
    assert_eq!(t.session.state(), SessionState::Anonymous);
    assert!(t.session.profile().is_none());
}

#[tokio::test]
async fn test_logout_revokes_app_session() {
    let server = MockServer::start().await;
    let jwt = app_session_jwt(chrono::Utc::now().timestamp() + 3600);
    Mock::given(method("GET"))
        .and(path("/withings/revoke"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .and(header("authorization", format!("Bearer {}", jwt).as_str()))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid or expired session token"))
        .expect(1)
        .mount(&server)
        .await;
    let mut t = test_session(&server.uri());
    seed_tokens(t.store.as_ref(), Provider::Withings, Some("a"), Some("r"));
    t.store.set("app_session_token", &jwt).unwrap();
    t.session.restore();

    t.session.logout().await;

    assert!(t.store.keys().is_empty(), "left behind: {:?}", t.store.keys());
    assert_eq!(t.session.state(), SessionState::Anonymous);
}

#[tokio::test]
async fn test_logout_clears_when_backend_unreachable() {
    let mut t = test_session("http://127.0.0.1:1");
    seed_tokens(t.store.as_ref(), Provider::Withings, Some("a"), Some("r"));
    t.session.restore();

    t.session.logout().await;

    assert!(t.store.keys().is_empty());
    assert_eq!(t.session.state(), SessionState::Anonymous);
}

#[tokio::test]
async fn test_restore_migrates_legacy_keys() {
    let server = MockServer::start().await;
    let mut t = test_session(&server.uri());
    t.store.set("active_provider", "withings").unwrap();
    t.store.set("access_token", "legacy-access").unwrap();
    t.store.set("refresh_token", "legacy-refresh").unwrap();

    let state = t.session.restore();

    assert_eq!(state, SessionState::Authenticated(Provider::Withings));
    assert_eq!(
        t.store.get("withings_access_token").as_deref(),
        Some("legacy-access")
    );
    assert_eq!(
        t.store.get("withings_refresh_token").as_deref(),
        Some("legacy-refresh")
    );
    assert!(t.store.get("access_token").is_none());
    assert!(t.store.get("refresh_token").is_none());
}

#[tokio::test]
async fn test_restore_drops_unreadable_app_session() {
    let server = MockServer::start().await;
    let mut t = test_session(&server.uri());
    seed_tokens(t.store.as_ref(), Provider::Fitbit, Some("a"), None);
    t.store.set("app_session_token", "garbage").unwrap();

    t.session.restore();

    assert!(t.store.get("app_session_token").is_none());
    assert!(t.session.is_authenticated());
}
