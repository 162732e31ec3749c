use std::sync::Arc;

use validator::Validate;

use pairly_shared::errors::{AppError, AppResult, ErrorCode};

use crate::embedding::EmbeddingProvider;
use crate::matching::{
    CandidateSelector, EligibilityFilter, PendingAdmirerQueue, ReciprocityResolver,
    ResolutionOutcome, SimilarityRanker,
};
use crate::models::{Action, PersonId, Profile, ProfilePatch};
use crate::store::{ProfileStore, Store};

/// The operations the bot layer calls. Composes the matching components over one store.
pub struct MatchService {
    store: Arc<dyn Store>,
    selector: CandidateSelector,
    ranker: SimilarityRanker,
    resolver: ReciprocityResolver,
    admirers: PendingAdmirerQueue,
    pool_limit: usize,
}

impl MatchService {
    pub fn new(
        store: Arc<dyn Store>,
        provider: Arc<dyn EmbeddingProvider>,
        filter: EligibilityFilter,
        pool_limit: usize,
    ) -> Self {
        Self {
            selector: CandidateSelector::new(store.clone(), filter),
            ranker: SimilarityRanker::new(store.clone(), provider),
            resolver: ReciprocityResolver::new(store.clone()),
            admirers: PendingAdmirerQueue::new(store.clone()),
            store,
            pool_limit,
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn embeddings_enabled(&self) -> bool {
        self.ranker.provider_enabled()
    }

    pub async fn get_profile(&self, person_id: PersonId) -> AppResult<Profile> {
        self.store
            .get(person_id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))
    }

    /// Partial upsert. A changed description drops the cached vector and tries to embed the new text.
    pub async fn upsert_profile(&self, person_id: PersonId, patch: ProfilePatch) -> AppResult<Profile> {
        patch.validate().map_err(|e| {
            AppError::with_details(
                ErrorCode::InvalidProfileField,
                "invalid profile field",
                serde_json::json!(e.to_string()),
            )
        })?;

        let mut patch = patch.normalized();
        let previous = self.store.get(person_id).await?;

        if let Some(description) = patch.description.as_deref() {
            let changed = previous
                .as_ref()
                .and_then(|p| p.description.as_deref())
                != Some(description);
            if changed {
                let fresh = self.ranker.embed_text(description).await;
                tracing::debug!(person_id, embedded = fresh.is_some(), "description changed");
                patch = patch.with_embedding(fresh);
            }
        }

        let profile = self.store.upsert(person_id, patch).await?;
        tracing::info!(person_id, complete = profile.is_complete(), "profile upserted");
        Ok(profile)
    }

    /// Best next card for the requester, or `None` when the pool is empty.
    pub async fn get_next_candidate(&self, requester_id: PersonId) -> AppResult<Option<Profile>> {
        let Some(requester) = self.store.get(requester_id).await? else {
            return Ok(None);
        };

        let pool = self.selector.select_for(&requester, self.pool_limit).await?;
        if pool.is_empty() {
            return Ok(None);
        }

        let ranked = self.ranker.rank(&requester, pool).await;
        Ok(ranked.into_iter().next())
    }

    pub async fn decide(
        &self,
        actor_id: PersonId,
        target_id: PersonId,
        action: Action,
    ) -> AppResult<ResolutionOutcome> {
        self.resolver.record_decision(actor_id, target_id, action).await
    }

    pub async fn pending_admirer_count(&self, person_id: PersonId) -> AppResult<i64> {
        self.admirers.count_pending(person_id).await
    }

    pub async fn next_pending_admirer(&self, person_id: PersonId) -> AppResult<Option<Profile>> {
        self.admirers.next_pending(person_id).await
    }

    /// Answer someone from the admirer queue. Refuses when they are no longer waiting.
    pub async fn respond_to_admirer(
        &self,
        person_id: PersonId,
        admirer_id: PersonId,
        action: Action,
    ) -> AppResult<ResolutionOutcome> {
        if !self.admirers.is_pending(person_id, admirer_id).await? {
            tracing::debug!(person_id, admirer_id, "admirer no longer pending");
            return Ok(ResolutionOutcome::AdmirerNotPending { admirer_id });
        }
        self.decide(person_id, admirer_id, action).await
    }
}
