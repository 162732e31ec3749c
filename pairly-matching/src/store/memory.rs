use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use pairly_shared::errors::{AppError, AppResult};

use super::{InteractionLedger, ProfileStore};
use crate::matching::eligibility::EligibilityFilter;
use crate::models::{Action, DecisionRecord, PersonId, Profile, ProfilePatch};

#[derive(Debug, Clone, Copy)]
struct StoredEdge {
    action: Action,
    ts: DateTime<Utc>,
    // write order; breaks timestamp ties in FIFO views
    seq: u64,
}

#[derive(Debug, Default)]
struct Ledger {
    edges: HashMap<(PersonId, PersonId), StoredEdge>,
    next_seq: u64,
}

impl Ledger {
    fn put(&mut self, actor_id: PersonId, target_id: PersonId, action: Action, ts: DateTime<Utc>) -> Option<Action> {
        self.next_seq += 1;
        let edge = StoredEdge { action, ts, seq: self.next_seq };
        self.edges
            .insert((actor_id, target_id), edge)
            .map(|previous| previous.action)
    }

    fn action(&self, actor_id: PersonId, target_id: PersonId) -> Option<Action> {
        self.edges.get(&(actor_id, target_id)).map(|e| e.action)
    }

    /// Unanswered likes of `target_id` from people who still have a profile.
    fn pending_for<'a>(
        &'a self,
        target_id: PersonId,
        profiles: &'a BTreeMap<PersonId, Profile>,
    ) -> impl Iterator<Item = (PersonId, &'a StoredEdge)> + 'a {
        self.edges.iter().filter_map(move |(&(actor, target), edge)| {
            let pending = target == target_id
                && edge.action == Action::Like
                && !self.edges.contains_key(&(target_id, actor))
                && profiles.contains_key(&actor);
            pending.then_some((actor, edge))
        })
    }
}

/// Process-local store with the same semantics as [`PgStore`](super::PgStore).
///
/// Lock order is always profiles then ledger.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    profiles: Mutex<BTreeMap<PersonId, Profile>>,
    ledger: Mutex<Ledger>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn profiles(&self) -> AppResult<MutexGuard<'_, BTreeMap<PersonId, Profile>>> {
        self.profiles
            .lock()
            .map_err(|_| AppError::internal("profile store mutex poisoned"))
    }

    fn ledger(&self) -> AppResult<MutexGuard<'_, Ledger>> {
        self.ledger
            .lock()
            .map_err(|_| AppError::internal("interaction ledger mutex poisoned"))
    }
}

#[async_trait]
impl ProfileStore for InMemoryStore {
    async fn get(&self, person_id: PersonId) -> AppResult<Option<Profile>> {
        Ok(self.profiles()?.get(&person_id).cloned())
    }

    async fn upsert(&self, person_id: PersonId, patch: ProfilePatch) -> AppResult<Profile> {
        let mut profiles = self.profiles()?;
        let profile = profiles
            .entry(person_id)
            .or_insert_with(|| Profile::empty(person_id));
        profile.apply(patch);
        Ok(profile.clone())
    }

    async fn scan_eligible(
        &self,
        requester: &Profile,
        filter: &EligibilityFilter,
        limit: usize,
    ) -> AppResult<Vec<Profile>> {
        let profiles = self.profiles()?;
        let ledger = self.ledger()?;

        Ok(profiles
            .values()
            .filter(|candidate| filter.admits(requester, candidate))
            .filter(|candidate| ledger.action(requester.person_id, candidate.person_id).is_none())
            .take(limit)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> AppResult<()> {
        self.profiles().map(|_| ())
    }
}

#[async_trait]
impl InteractionLedger for InMemoryStore {
    async fn put_edge(
        &self,
        actor_id: PersonId,
        target_id: PersonId,
        action: Action,
        ts: DateTime<Utc>,
    ) -> AppResult<()> {
        self.ledger()?.put(actor_id, target_id, action, ts);
        Ok(())
    }

    async fn has_edge(
        &self,
        actor_id: PersonId,
        target_id: PersonId,
        action: Option<Action>,
    ) -> AppResult<bool> {
        let stored = self.ledger()?.action(actor_id, target_id);
        Ok(match action {
            Some(wanted) => stored == Some(wanted),
            None => stored.is_some(),
        })
    }

    async fn record_decision(
        &self,
        actor_id: PersonId,
        target_id: PersonId,
        action: Action,
        ts: DateTime<Utc>,
    ) -> AppResult<DecisionRecord> {
        let mut ledger = self.ledger()?;
        let previous = ledger.put(actor_id, target_id, action, ts);
        let reverse = ledger.action(target_id, actor_id);
        Ok(DecisionRecord { previous, reverse })
    }

    async fn count_reciprocal_pending(&self, target_id: PersonId) -> AppResult<i64> {
        let profiles = self.profiles()?;
        let ledger = self.ledger()?;
        Ok(ledger.pending_for(target_id, &profiles).count() as i64)
    }

    async fn oldest_pending(&self, target_id: PersonId) -> AppResult<Option<PersonId>> {
        let profiles = self.profiles()?;
        let ledger = self.ledger()?;
        Ok(ledger
            .pending_for(target_id, &profiles)
            .min_by_key(|(actor, edge)| (edge.ts, edge.seq, *actor))
            .map(|(actor, _)| actor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn people(store: &InMemoryStore, ids: &[PersonId]) {
        for &id in ids {
            store.upsert(id, ProfilePatch::default()).await.unwrap();
        }
    }

    #[tokio::test]
    async fn edges_are_last_write_wins() {
        let store = InMemoryStore::new();
        let t0 = Utc::now();

        store.put_edge(1, 2, Action::Like, t0).await.unwrap();
        store.put_edge(1, 2, Action::Dislike, t0 + Duration::seconds(5)).await.unwrap();

        assert!(store.has_edge(1, 2, Some(Action::Dislike)).await.unwrap());
        assert!(!store.has_edge(1, 2, Some(Action::Like)).await.unwrap());
        assert!(store.has_edge(1, 2, None).await.unwrap());
        assert!(!store.has_edge(2, 1, None).await.unwrap());
    }

    #[tokio::test]
    async fn record_decision_reports_previous_and_reverse() {
        let store = InMemoryStore::new();
        let now = Utc::now();

        let first = store.record_decision(1, 2, Action::Like, now).await.unwrap();
        assert_eq!(first, DecisionRecord { previous: None, reverse: None });

        let answer = store.record_decision(2, 1, Action::Like, now).await.unwrap();
        assert_eq!(answer, DecisionRecord { previous: None, reverse: Some(Action::Like) });

        let again = store.record_decision(2, 1, Action::Like, now).await.unwrap();
        assert_eq!(again.previous, Some(Action::Like));
    }

    #[tokio::test]
    async fn pending_is_fifo_and_excludes_answered() {
        let store = InMemoryStore::new();
        people(&store, &[1, 10, 11, 12, 13]).await;
        let t0 = Utc::now();

        store.put_edge(10, 1, Action::Like, t0 + Duration::seconds(20)).await.unwrap();
        store.put_edge(11, 1, Action::Like, t0).await.unwrap();
        store.put_edge(12, 1, Action::Dislike, t0).await.unwrap();
        store.put_edge(13, 1, Action::Like, t0 + Duration::seconds(10)).await.unwrap();

        assert_eq!(store.count_reciprocal_pending(1).await.unwrap(), 3);
        assert_eq!(store.oldest_pending(1).await.unwrap(), Some(11));

        store.put_edge(1, 11, Action::Dislike, t0).await.unwrap();
        assert_eq!(store.count_reciprocal_pending(1).await.unwrap(), 2);
        assert_eq!(store.oldest_pending(1).await.unwrap(), Some(13));
    }

    #[tokio::test]
    async fn timestamp_ties_fall_back_to_write_order() {
        let store = InMemoryStore::new();
        people(&store, &[1, 20, 30]).await;
        let ts = Utc::now();

        store.put_edge(30, 1, Action::Like, ts).await.unwrap();
        store.put_edge(20, 1, Action::Like, ts).await.unwrap();

        assert_eq!(store.oldest_pending(1).await.unwrap(), Some(30));
    }

    #[tokio::test]
    async fn likes_from_people_without_a_profile_are_not_pending() {
        let store = InMemoryStore::new();
        people(&store, &[1, 40]).await;
        let t0 = Utc::now();

        store.put_edge(99, 1, Action::Like, t0).await.unwrap();
        store.put_edge(40, 1, Action::Like, t0 + Duration::seconds(1)).await.unwrap();

        assert_eq!(store.count_reciprocal_pending(1).await.unwrap(), 1);
        assert_eq!(store.oldest_pending(1).await.unwrap(), Some(40));
    }

    #[tokio::test]
    async fn upsert_creates_then_patches() {
        let store = InMemoryStore::new();
        assert!(store.get(5).await.unwrap().is_none());

        store
            .upsert(5, ProfilePatch { name: Some("Oleg".into()), ..Default::default() })
            .await
            .unwrap();
        let updated = store
            .upsert(5, ProfilePatch { age: Some(31), ..Default::default() })
            .await
            .unwrap();

        assert_eq!(updated.name.as_deref(), Some("Oleg"));
        assert_eq!(updated.age, Some(31));
        assert_eq!(store.get(5).await.unwrap(), Some(updated));
    }
}
