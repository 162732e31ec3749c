use std::sync::Arc;

use pairly_shared::errors::AppResult;

use crate::models::{PersonId, Profile, MAX_AGE, MIN_AGE};
use crate::store::{ProfileStore, Store};

pub const DEFAULT_AGE_TOLERANCE: i32 = 2;

/// The hard predicate a profile must pass to be shown to a requester.
///
/// Gender preference is checked symmetrically: the requester's preference must
/// accept the candidate's gender and the candidate's preference must accept the
/// requester's. A missing preference counts as ANY on either side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EligibilityFilter {
    age_tolerance: i32,
}

impl Default for EligibilityFilter {
    fn default() -> Self {
        Self { age_tolerance: DEFAULT_AGE_TOLERANCE }
    }
}

impl EligibilityFilter {
    /// Tolerance is bounded by the widest possible age gap.
    pub fn new(age_tolerance: i32) -> Self {
        Self { age_tolerance: age_tolerance.clamp(0, MAX_AGE - MIN_AGE) }
    }

    pub fn age_tolerance(&self) -> i32 {
        self.age_tolerance
    }

    /// Everything except the "not decided yet" condition, which lives in the ledger.
    pub fn admits(&self, requester: &Profile, candidate: &Profile) -> bool {
        if candidate.person_id == requester.person_id || !candidate.is_complete() {
            return false;
        }

        let (Some(requester_gender), Some(candidate_gender)) = (requester.gender, candidate.gender) else {
            return false;
        };

        let same_city = matches!(
            (requester.city_key(), candidate.city_key()),
            (Some(a), Some(b)) if a == b
        );

        let ages_close = matches!(
            (requester.age, candidate.age),
            (Some(a), Some(b)) if (a - b).abs() <= self.age_tolerance
        );

        same_city
            && requester.preference().accepts(candidate_gender)
            && candidate.preference().accepts(requester_gender)
            && ages_close
    }
}

/// Builds the eligible pool for a requester. Read-only.
pub struct CandidateSelector {
    store: Arc<dyn Store>,
    filter: EligibilityFilter,
}

impl CandidateSelector {
    pub fn new(store: Arc<dyn Store>, filter: EligibilityFilter) -> Self {
        Self { store, filter }
    }

    pub fn filter(&self) -> &EligibilityFilter {
        &self.filter
    }

    /// Unknown or incomplete requesters get an empty pool, not an error.
    pub async fn select_candidates(&self, requester_id: PersonId, pool_limit: usize) -> AppResult<Vec<Profile>> {
        match self.store.get(requester_id).await? {
            Some(requester) => self.select_for(&requester, pool_limit).await,
            None => {
                tracing::debug!(requester_id, "no profile for requester, empty pool");
                Ok(Vec::new())
            }
        }
    }

    pub async fn select_for(&self, requester: &Profile, pool_limit: usize) -> AppResult<Vec<Profile>> {
        if !requester.is_complete() {
            tracing::debug!(requester_id = requester.person_id, "requester profile incomplete, empty pool");
            return Ok(Vec::new());
        }
        if pool_limit == 0 {
            return Ok(Vec::new());
        }

        let pool = self
            .store
            .scan_eligible(requester, &self.filter, pool_limit)
            .await?;

        tracing::debug!(
            requester_id = requester.person_id,
            pool_size = pool.len(),
            "candidate pool selected"
        );
        Ok(pool)
    }
}
