use std::sync::Arc;

use crate::embedding::{EmbeddingError, EmbeddingProvider};
use crate::models::{Profile, ProfilePatch};
use crate::store::{ProfileStore, Store};

/// Cosine of the angle between `a` and `b`.
///
/// Empty, mismatched or zero-norm inputs give `0.0` rather than an error.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

/// Orders an eligible pool by description similarity to the requester.
///
/// Ranking never fails: without a requester vector the pool comes back in
/// selector order, and candidates without a cached vector go last.
pub struct SimilarityRanker {
    store: Arc<dyn Store>,
    provider: Arc<dyn EmbeddingProvider>,
}

impl SimilarityRanker {
    pub fn new(store: Arc<dyn Store>, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { store, provider }
    }

    pub fn provider_enabled(&self) -> bool {
        self.provider.is_enabled()
    }

    pub async fn rank(&self, requester: &Profile, pool: Vec<Profile>) -> Vec<Profile> {
        if pool.len() < 2 {
            return pool;
        }

        let Some(anchor) = self.requester_embedding(requester).await else {
            tracing::debug!(
                requester_id = requester.person_id,
                pool_size = pool.len(),
                "no requester embedding, keeping filter order"
            );
            return pool;
        };

        let (embedded, unembedded): (Vec<Profile>, Vec<Profile>) = pool
            .into_iter()
            .partition(|candidate| candidate.usable_embedding().is_some());

        let mut scored: Vec<(f64, Profile)> = embedded
            .into_iter()
            .map(|candidate| {
                let score = candidate
                    .usable_embedding()
                    .map_or(0.0, |v| cosine_similarity(&anchor, v));
                (score, candidate)
            })
            .collect();

        // stable: equal scores keep selector order
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        tracing::debug!(
            requester_id = requester.person_id,
            scored = scored.len(),
            unscored = unembedded.len(),
            "pool ranked"
        );

        scored
            .into_iter()
            .map(|(_, candidate)| candidate)
            .chain(unembedded)
            .collect()
    }

    /// Cached vector, or a fresh one written back to the store.
    async fn requester_embedding(&self, requester: &Profile) -> Option<Vec<f32>> {
        if let Some(cached) = requester.usable_embedding() {
            return Some(cached.to_vec());
        }

        let vector = self.embed_text(requester.description.as_deref()?).await?;

        let patch = ProfilePatch::default().with_embedding(Some(vector.clone()));
        if let Err(e) = self.store.upsert(requester.person_id, patch).await {
            tracing::warn!(
                requester_id = requester.person_id,
                error = %e,
                "failed to cache requester embedding"
            );
        }

        Some(vector)
    }

    /// Provider call with failures logged, counted and absorbed.
    pub async fn embed_text(&self, text: &str) -> Option<Vec<f32>> {
        if !self.provider.is_enabled() || text.trim().is_empty() {
            return None;
        }

        match self.provider.embed(text).await {
            Ok(vector) if !vector.is_empty() => Some(vector),
            Ok(_) => {
                record_failure(&EmbeddingError::Malformed("empty vector".into()));
                None
            }
            Err(e) => {
                record_failure(&e);
                None
            }
        }
    }
}

fn record_failure(error: &EmbeddingError) {
    tracing::warn!(kind = error.kind(), error = %error, "embedding provider failed");
    metrics::counter!("matching_embedding_failures_total", "kind" => error.kind()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::DisabledEmbeddings;
    use crate::models::{Gender, LookingFor, PersonId};
    use crate::store::{InMemoryStore, ProfileStore};
    use crate::testing::{card, seed, ScriptedEmbeddings};

    async fn seed_with_vector(store: &InMemoryStore, id: PersonId, vector: Option<Vec<f32>>) -> Profile {
        let mut patch = card(&format!("P{id}"), 30, "X", Gender::Female, LookingFor::Any);
        patch.embedding = Some(vector);
        seed(store, id, patch).await;
        store.get(id).await.unwrap().unwrap()
    }

    fn ids(ranked: &[Profile]) -> Vec<PersonId> {
        ranked.iter().map(|p| p.person_id).collect()
    }

    #[test]
    fn cosine_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-9);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-9);
        // magnitude does not matter
        assert!((cosine_similarity(&[3.0, 4.0], &[6.0, 8.0]) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_degenerate_inputs_are_neutral() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 1.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn cosine_is_symmetric_and_bounded() {
        let samples: [&[f32]; 4] = [&[0.2, -0.7, 0.1], &[1.0, 1.0, 1.0], &[-3.0, 0.5, 2.0], &[0.0, 0.0, 9.0]];
        for a in samples {
            for b in samples {
                let ab = cosine_similarity(a, b);
                assert_eq!(ab, cosine_similarity(b, a));
                assert!((-1.0..=1.0).contains(&ab));
            }
        }
    }

    #[tokio::test]
    async fn ranks_by_similarity_then_unembedded() {
        let store = Arc::new(InMemoryStore::new());
        let requester = seed_with_vector(&store, 1, Some(vec![1.0, 0.0])).await;
        let pool = vec![
            seed_with_vector(&store, 4, None).await,
            seed_with_vector(&store, 3, Some(vec![0.0, 1.0])).await,
            seed_with_vector(&store, 2, Some(vec![1.0, 0.0])).await,
        ];

        let ranker = SimilarityRanker::new(store.clone(), Arc::new(DisabledEmbeddings));
        assert_eq!(ids(&ranker.rank(&requester, pool).await), vec![2, 3, 4]);
    }

    #[tokio::test]
    async fn equal_scores_keep_selector_order() {
        let store = Arc::new(InMemoryStore::new());
        let requester = seed_with_vector(&store, 1, Some(vec![1.0, 0.0])).await;
        let pool = vec![
            seed_with_vector(&store, 5, Some(vec![0.0, 2.0])).await,
            seed_with_vector(&store, 2, None).await,
            seed_with_vector(&store, 3, Some(vec![0.0, 1.0])).await,
            seed_with_vector(&store, 4, None).await,
        ];

        let ranker = SimilarityRanker::new(store.clone(), Arc::new(DisabledEmbeddings));
        assert_eq!(ids(&ranker.rank(&requester, pool).await), vec![5, 3, 2, 4]);
    }

    #[tokio::test]
    async fn requester_embedding_is_fetched_and_cached() {
        let store = Arc::new(InMemoryStore::new());
        let requester = seed_with_vector(&store, 1, None).await;
        let text = requester.description.clone().unwrap();
        let provider = Arc::new(ScriptedEmbeddings::default().with(&text, vec![0.0, 1.0]));
        let pool = vec![
            seed_with_vector(&store, 2, Some(vec![1.0, 0.0])).await,
            seed_with_vector(&store, 3, Some(vec![0.0, 1.0])).await,
        ];

        let ranker = SimilarityRanker::new(store.clone(), provider.clone());
        assert_eq!(ids(&ranker.rank(&requester, pool.clone()).await), vec![3, 2]);
        assert_eq!(provider.calls(), 1);

        let cached = store.get(1).await.unwrap().unwrap();
        assert_eq!(cached.embedding, Some(vec![0.0, 1.0]));

        ranker.rank(&cached, pool).await;
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn provider_failure_keeps_filter_order() {
        let store = Arc::new(InMemoryStore::new());
        let requester = seed_with_vector(&store, 1, None).await;
        let pool = vec![
            seed_with_vector(&store, 3, Some(vec![0.0, 1.0])).await,
            seed_with_vector(&store, 2, Some(vec![1.0, 0.0])).await,
        ];

        // no scripted vectors: every call fails
        let provider = Arc::new(ScriptedEmbeddings::default());
        let ranker = SimilarityRanker::new(store.clone(), provider.clone());

        assert_eq!(ids(&ranker.rank(&requester, pool).await), vec![3, 2]);
        assert_eq!(provider.calls(), 1);
        assert!(store.get(1).await.unwrap().unwrap().embedding.is_none());
    }

    #[tokio::test]
    async fn disabled_provider_is_never_called() {
        let store = Arc::new(InMemoryStore::new());
        let ranker = SimilarityRanker::new(store, Arc::new(DisabledEmbeddings));
        assert!(!ranker.provider_enabled());
        assert!(ranker.embed_text("anything").await.is_none());
    }
}
