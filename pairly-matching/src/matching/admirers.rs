use std::sync::Arc;

use pairly_shared::errors::AppResult;

use crate::models::{Action, PersonId, Profile};
use crate::store::{InteractionLedger, ProfileStore, Store};

/// People who liked someone and are still waiting for an answer.
///
/// Derived from the ledger on every read; there is no stored counter.
pub struct PendingAdmirerQueue {
    store: Arc<dyn Store>,
}

impl PendingAdmirerQueue {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn count_pending(&self, target_id: PersonId) -> AppResult<i64> {
        self.store.count_reciprocal_pending(target_id).await
    }

    /// Oldest like first.
    pub async fn next_pending(&self, target_id: PersonId) -> AppResult<Option<Profile>> {
        let Some(admirer_id) = self.store.oldest_pending(target_id).await? else {
            return Ok(None);
        };

        let profile = self.store.get(admirer_id).await?;
        if profile.is_none() {
            tracing::warn!(target_id, admirer_id, "pending admirer has no profile");
        }
        Ok(profile)
    }

    pub async fn is_pending(&self, target_id: PersonId, admirer_id: PersonId) -> AppResult<bool> {
        let liked = self.store.has_edge(admirer_id, target_id, Some(Action::Like)).await?;
        if !liked {
            return Ok(false);
        }
        Ok(!self.store.has_edge(target_id, admirer_id, None).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gender, LookingFor};
    use crate::store::{InMemoryStore, InteractionLedger};
    use crate::testing::{card, seed};
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn fifo_by_like_time() {
        let store = Arc::new(InMemoryStore::new());
        for id in 1..=3 {
            seed(&store, id, card(&format!("P{id}"), 30, "X", Gender::Female, LookingFor::Any)).await;
        }
        let t0 = Utc::now();
        store.put_edge(3, 1, Action::Like, t0).await.unwrap();
        store.put_edge(2, 1, Action::Like, t0 + Duration::seconds(1)).await.unwrap();

        let queue = PendingAdmirerQueue::new(store.clone());
        assert_eq!(queue.count_pending(1).await.unwrap(), 2);
        assert_eq!(queue.next_pending(1).await.unwrap().map(|p| p.person_id), Some(3));

        // any answer consumes the slot, even a like
        store.put_edge(1, 3, Action::Like, t0).await.unwrap();
        assert_eq!(queue.count_pending(1).await.unwrap(), 1);
        assert_eq!(queue.next_pending(1).await.unwrap().map(|p| p.person_id), Some(2));
    }

    #[tokio::test]
    async fn pending_check_follows_both_edges() {
        let store = Arc::new(InMemoryStore::new());
        let queue = PendingAdmirerQueue::new(store.clone());
        let now = Utc::now();

        assert!(!queue.is_pending(1, 2).await.unwrap());
        store.put_edge(2, 1, Action::Like, now).await.unwrap();
        assert!(queue.is_pending(1, 2).await.unwrap());
        store.put_edge(2, 1, Action::Dislike, now).await.unwrap();
        assert!(!queue.is_pending(1, 2).await.unwrap());
    }

    #[tokio::test]
    async fn empty_queue() {
        let queue = PendingAdmirerQueue::new(Arc::new(InMemoryStore::new()));
        assert_eq!(queue.count_pending(1).await.unwrap(), 0);
        assert!(queue.next_pending(1).await.unwrap().is_none());
    }
}
