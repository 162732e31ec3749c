use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use pairly_shared::errors::AppResult;

use crate::models::{Action, PersonId, Profile};
use crate::store::{InteractionLedger, ProfileStore, Store};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    SelfDecision,
    UnknownPerson,
    /// The actor has no complete card, so nobody could have been shown to them.
    IncompleteProfile,
}

/// What a decision did to the pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResolutionOutcome {
    NoMatch,
    /// Both likes exist now. Carries both cards so each side can be told who the other is.
    /// `repeated` is set when the actor's like was already recorded, i.e. a retry.
    Match { actor: Profile, target: Profile, repeated: bool },
    /// The target has one more pending admirer.
    PendingIncrement { target_id: PersonId },
    /// Same action as already recorded and no match to report; nothing to signal.
    Unchanged,
    Skipped { reason: SkipReason },
    AdmirerNotPending { admirer_id: PersonId },
}

impl ResolutionOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::NoMatch => "no_match",
            Self::Match { .. } => "match",
            Self::PendingIncrement { .. } => "pending_increment",
            Self::Unchanged => "unchanged",
            Self::Skipped { .. } => "skipped",
            Self::AdmirerNotPending { .. } => "admirer_not_pending",
        }
    }
}

/// Writes decisions and detects mutual likes.
///
/// The edge write and the reverse-edge read happen in one critical section of
/// the store, so of two crossing likes exactly one sees the other.
pub struct ReciprocityResolver {
    store: Arc<dyn Store>,
}

impl ReciprocityResolver {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn record_decision(
        &self,
        actor_id: PersonId,
        target_id: PersonId,
        action: Action,
    ) -> AppResult<ResolutionOutcome> {
        if actor_id == target_id {
            return Ok(ResolutionOutcome::Skipped { reason: SkipReason::SelfDecision });
        }
        let actor = self.store.get(actor_id).await?;
        let target = self.store.get(target_id).await?;
        let (Some(actor), Some(target)) = (actor, target) else {
            tracing::debug!(actor_id, target_id, "decision involving unknown person skipped");
            return Ok(ResolutionOutcome::Skipped { reason: SkipReason::UnknownPerson });
        };
        if !actor.is_complete() {
            tracing::debug!(actor_id, target_id, "decision from incomplete profile skipped");
            return Ok(ResolutionOutcome::Skipped { reason: SkipReason::IncompleteProfile });
        }

        let record = self
            .store
            .record_decision(actor_id, target_id, action, Utc::now())
            .await?;

        metrics::counter!("matching_decisions_total", "action" => action.as_str()).increment(1);

        let repeated = record.previous == Some(action);

        // A retried like on a mutual pair still reports the match.
        if action == Action::Like && record.reverse == Some(Action::Like) {
            if !repeated {
                metrics::counter!("matching_matches_total").increment(1);
            }
            tracing::info!(actor_id, target_id, repeated, "mutual like");
            return Ok(ResolutionOutcome::Match { actor, target, repeated });
        }

        if repeated {
            tracing::debug!(actor_id, target_id, %action, "decision repeated");
            return Ok(ResolutionOutcome::Unchanged);
        }

        let outcome = match (action, record.reverse) {
            (Action::Dislike, _) => ResolutionOutcome::NoMatch,
            // the target already turned the actor down
            (Action::Like, Some(Action::Dislike)) => ResolutionOutcome::NoMatch,
            (Action::Like, Some(Action::Like) | None) => ResolutionOutcome::PendingIncrement { target_id },
        };

        tracing::info!(actor_id, target_id, %action, outcome = outcome.label(), "decision recorded");
        Ok(outcome)
    }
}
