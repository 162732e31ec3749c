use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use pairly_shared::errors::AppResult;
use pairly_shared::types::ApiResponse;

use super::decisions::{notify, parse_action};
use crate::matching::ResolutionOutcome;
use crate::models::{PersonId, Profile};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct PendingCount {
    pub count: i64,
}

#[derive(Debug, Deserialize)]
pub struct AdmirerReply {
    pub action: String,
}

// --- GET /profiles/:id/admirers/count ---

pub async fn pending_count(
    State(state): State<Arc<AppState>>,
    Path(person_id): Path<PersonId>,
) -> AppResult<Json<ApiResponse<PendingCount>>> {
    let count = state.matching.pending_admirer_count(person_id).await?;
    Ok(Json(ApiResponse::ok(PendingCount { count })))
}

// --- GET /profiles/:id/admirers/next ---

pub async fn next_admirer(
    State(state): State<Arc<AppState>>,
    Path(person_id): Path<PersonId>,
) -> AppResult<Json<ApiResponse<Option<Profile>>>> {
    let admirer = state.matching.next_pending_admirer(person_id).await?;
    Ok(Json(ApiResponse::ok(admirer)))
}

// --- POST /profiles/:id/admirers/:admirer_id ---

pub async fn respond(
    State(state): State<Arc<AppState>>,
    Path((person_id, admirer_id)): Path<(PersonId, PersonId)>,
    Json(req): Json<AdmirerReply>,
) -> AppResult<Json<ApiResponse<ResolutionOutcome>>> {
    let action = parse_action(&req.action)?;
    let outcome = state
        .matching
        .respond_to_admirer(person_id, admirer_id, action)
        .await?;

    notify(&state, &outcome).await;

    Ok(Json(ApiResponse::ok(outcome)))
}
