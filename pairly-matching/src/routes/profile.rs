use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;

use pairly_shared::errors::AppResult;
use pairly_shared::types::ApiResponse;

use crate::events::publisher;
use crate::models::{PersonId, Profile, ProfilePatch};
use crate::AppState;

// --- GET /profiles/:id ---

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Path(person_id): Path<PersonId>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let profile = state.matching.get_profile(person_id).await?;
    Ok(Json(ApiResponse::ok(profile)))
}

// --- PUT /profiles/:id ---

pub async fn upsert_profile(
    State(state): State<Arc<AppState>>,
    Path(person_id): Path<PersonId>,
    Json(patch): Json<ProfilePatch>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let profile = state.matching.upsert_profile(person_id, patch).await?;

    if let Some(rabbitmq) = &state.rabbitmq {
        publisher::publish_profile_updated(rabbitmq, person_id, profile.is_complete()).await;
    }

    Ok(Json(ApiResponse::ok(profile)))
}
