// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Command relay routes: `/link`, `/refresh` and `/leaderboard`.
//! The bearer guard is applied in routes/mod.rs.

use crate::error::Result;
use crate::models::RefreshResult;
use crate::services::commands::Leaderboard;
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/commands/link", post(link))
        .route("/commands/refresh", post(refresh))
        .route("/commands/leaderboard", get(leaderboard))
}

/// Body of the per-user commands.
#[derive(Deserialize)]
pub struct CommandRequest {
    pub external_id: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LinkResponse {
    pub url: String,
}

async fn link(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CommandRequest>,
) -> Result<Json<LinkResponse>> {
    let url = state.commands.request_link(&req.external_id)?;
    Ok(Json(LinkResponse { url }))
}

/// Always 200: failures are reported in the result body.
async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CommandRequest>,
) -> Json<RefreshResult> {
    Json(state.commands.request_refresh(&req.external_id).await)
}

#[derive(Deserialize)]
pub struct LeaderboardParams {
    #[serde(default)]
    league: Option<String>,
}

async fn leaderboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LeaderboardParams>,
) -> Result<Json<Leaderboard>> {
    let board = state
        .commands
        .request_leaderboard(params.league.as_deref())
        .await?;
    Ok(Json(board))
}
