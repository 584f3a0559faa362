// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth routes for linking a YouTube channel.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Redirect,
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::services::link::LinkError;
use crate::services::tokens::AuthExchangeError;
use crate::AppState;

/// Page shown after a successful link.
pub const LINKED_MESSAGE: &str = "Channel linked! You can go back to Discord.";

/// Consent redirect. Mints a state for any external id, so it sits behind
/// the command guard in routes/mod.rs.
pub fn link_routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/link", get(auth_link))
}

/// Google redirects the browser here.
pub fn callback_routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/callback", get(auth_callback))
}

#[derive(Deserialize)]
pub struct LinkParams {
    external_id: String,
}

/// Redirect to Google consent for this external id.
async fn auth_link(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LinkParams>,
) -> Result<Redirect> {
    let url = state.commands.request_link(&params.external_id)?;
    tracing::info!(external_id = %params.external_id, "Redirecting to Google consent");
    Ok(Redirect::temporary(&url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - exchange code, fetch channel, store the link.
///
/// Answers with a plain-text page the user reads in their browser.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> std::result::Result<(StatusCode, String), AppError> {
    let oauth_state = params
        .state
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("missing state parameter".to_string()))?;

    // Google omits the code when consent is refused.
    let code = match (params.code.filter(|c| !c.is_empty()), &params.error) {
        (Some(code), _) => code,
        (None, Some(_)) => String::new(),
        (None, None) => {
            return Err(AppError::BadRequest("missing code parameter".to_string()));
        }
    };

    match state
        .links
        .complete(&code, &oauth_state, params.error.as_deref())
        .await
    {
        Ok(outcome) => {
            tracing::info!(
                external_id = %outcome.external_id,
                tier = %outcome.tier,
                "Link callback completed"
            );
            Ok((StatusCode::OK, LINKED_MESSAGE.to_string()))
        }
        Err(err) => {
            tracing::warn!(error = %err, "Link callback failed");
            Ok((status_for(&err), err.user_message().to_string()))
        }
    }
}

fn status_for(err: &LinkError) -> StatusCode {
    match err {
        LinkError::State(_) | LinkError::Denied(_) => StatusCode::BAD_REQUEST,
        LinkError::Exchange(AuthExchangeError::EmptyCode) => StatusCode::BAD_REQUEST,
        LinkError::ChannelNotFound => StatusCode::NOT_FOUND,
        LinkError::Exchange(_) | LinkError::Provider(_) => StatusCode::BAD_GATEWAY,
        LinkError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
