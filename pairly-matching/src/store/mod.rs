//! Persistence seams for profiles and the interaction ledger.
//!
//! Every method is a single consistent unit against the store; failures are
//! [`AppError`](pairly_shared::AppError)s and propagate to the caller.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use pairly_shared::errors::AppResult;

use crate::matching::eligibility::EligibilityFilter;
use crate::models::{Action, DecisionRecord, PersonId, Profile, ProfilePatch};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, person_id: PersonId) -> AppResult<Option<Profile>>;

    /// Partial update, creating the profile on first write. Refreshes `updated_at`.
    async fn upsert(&self, person_id: PersonId, patch: ProfilePatch) -> AppResult<Profile>;

    /// Complete profiles admitted by `filter` for `requester` that the requester
    /// has not decided about yet, at most `limit` of them.
    async fn scan_eligible(
        &self,
        requester: &Profile,
        filter: &EligibilityFilter,
        limit: usize,
    ) -> AppResult<Vec<Profile>>;

    async fn ping(&self) -> AppResult<()>;
}

#[async_trait]
pub trait InteractionLedger: Send + Sync {
    /// Insert-or-replace the (actor, target) edge.
    async fn put_edge(
        &self,
        actor_id: PersonId,
        target_id: PersonId,
        action: Action,
        ts: DateTime<Utc>,
    ) -> AppResult<()>;

    /// `action = None` matches either action.
    async fn has_edge(
        &self,
        actor_id: PersonId,
        target_id: PersonId,
        action: Option<Action>,
    ) -> AppResult<bool>;

    /// Writes the edge and reads the reverse edge as one atomic step per
    /// unordered pair, so two crossing likes cannot both miss each other.
    async fn record_decision(
        &self,
        actor_id: PersonId,
        target_id: PersonId,
        action: Action,
        ts: DateTime<Utc>,
    ) -> AppResult<DecisionRecord>;

    /// Likers of `target_id` that `target_id` has not answered. Likers without a
    /// profile are left out.
    async fn count_reciprocal_pending(&self, target_id: PersonId) -> AppResult<i64>;

    /// The longest-waiting pending admirer of `target_id`.
    async fn oldest_pending(&self, target_id: PersonId) -> AppResult<Option<PersonId>>;
}

pub trait Store: ProfileStore + InteractionLedger {}

impl<T: ProfileStore + InteractionLedger> Store for T {}
