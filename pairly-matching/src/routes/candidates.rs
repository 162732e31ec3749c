use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;

use pairly_shared::errors::AppResult;
use pairly_shared::types::ApiResponse;

use crate::models::{PersonId, Profile};
use crate::AppState;

// --- GET /profiles/:id/next-candidate ---

pub async fn next_candidate(
    State(state): State<Arc<AppState>>,
    Path(requester_id): Path<PersonId>,
) -> AppResult<Json<ApiResponse<Option<Profile>>>> {
    let candidate = state.matching.get_next_candidate(requester_id).await?;

    let response = match candidate {
        Some(profile) => ApiResponse::ok(Some(profile)),
        None => ApiResponse::ok_with_message(None, "no candidates available"),
    };
    Ok(Json(response))
}
