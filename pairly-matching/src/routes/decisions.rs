use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use pairly_shared::errors::{AppError, AppResult, ErrorCode};
use pairly_shared::types::ApiResponse;

use crate::events::publisher;
use crate::matching::ResolutionOutcome;
use crate::models::{Action, PersonId};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub candidate_id: PersonId,
    pub action: String,
}

pub(crate) fn parse_action(raw: &str) -> AppResult<Action> {
    raw.trim()
        .to_lowercase()
        .parse::<Action>()
        .map_err(|e: String| AppError::new(ErrorCode::InvalidAction, e))
}

/// Publishes whatever the outcome calls for. Failures are logged by the publisher.
pub(crate) async fn notify(state: &AppState, outcome: &ResolutionOutcome) {
    let Some(rabbitmq) = &state.rabbitmq else {
        return;
    };

    match outcome {
        // a retried like was already announced
        ResolutionOutcome::Match { repeated: true, .. } => {}
        ResolutionOutcome::Match { actor, target, .. } => {
            publisher::publish_match_created(rabbitmq, actor.person_id, target.person_id).await;
        }
        ResolutionOutcome::PendingIncrement { target_id } => {
            match state.matching.pending_admirer_count(*target_id).await {
                Ok(count) => publisher::publish_like_received(rabbitmq, *target_id, count).await,
                Err(e) => tracing::warn!(target_id, error = %e, "skipping like.received, count failed"),
            }
        }
        _ => {}
    }
}

// --- POST /profiles/:id/decisions ---

pub async fn decide(
    State(state): State<Arc<AppState>>,
    Path(actor_id): Path<PersonId>,
    Json(req): Json<DecisionRequest>,
) -> AppResult<Json<ApiResponse<ResolutionOutcome>>> {
    let action = parse_action(&req.action)?;
    let outcome = state.matching.decide(actor_id, req.candidate_id, action).await?;

    notify(&state, &outcome).await;

    Ok(Json(ApiResponse::ok(outcome)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_parse_loosely() {
        assert_eq!(parse_action("like").unwrap(), Action::Like);
        assert_eq!(parse_action(" Dislike ").unwrap(), Action::Dislike);
        let err = parse_action("superlike").unwrap_err();
        assert!(matches!(err, AppError::Known { code: ErrorCode::InvalidAction, .. }));
    }
}
