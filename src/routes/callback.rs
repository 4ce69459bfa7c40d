// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Provider redirect endpoint.
//!
//! The handler does no token work itself: it hands the query parameters to
//! whoever is waiting on the channel (the `login` command), which owns the
//! [`AuthSession`](crate::services::AuthSession) and completes the exchange.

use axum::{
    extract::{Path, Query, State},
    response::Html,
    routing::get,
    Router,
};
use std::sync::Arc;

use crate::error::{AuthError, Result};
use crate::models::Provider;
use crate::services::CallbackParams;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/callback/{provider}", get(provider_callback))
}

/// A redirect received from a provider's consent page.
#[derive(Debug, Clone)]
pub struct CallbackEvent {
    pub provider: Provider,
    pub params: CallbackParams,
}

async fn provider_callback(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
) -> Result<Html<String>> {
    let provider: Provider = provider
        .parse()
        .map_err(|_| AuthError::UnknownProvider(provider))?;

    let denied = params.error.is_some();
    tracing::info!(
        provider = %provider,
        has_code = params.code.is_some(),
        denied,
        "Received OAuth redirect"
    );

    state
        .events
        .send(CallbackEvent { provider, params })
        .await
        .map_err(|_| AuthError::Internal(anyhow::anyhow!("No login is waiting for this callback")))?;

    Ok(Html(callback_page(provider, denied)))
}

fn callback_page(provider: Provider, denied: bool) -> String {
    let message = if denied {
        format!("{} authorization was denied.", provider.display_name())
    } else {
        format!("{} authorization received.", provider.display_name())
    };
    format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>HealthSync</title></head>\
         <body><p>{}</p><p>You can close this window and return to the terminal.</p></body></html>",
        message
    )
}
