//! Fixtures shared by unit tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::embedding::{EmbeddingError, EmbeddingProvider};
use crate::models::{Gender, LookingFor, PersonId, ProfilePatch};
use crate::store::{InMemoryStore, ProfileStore};

pub fn card(name: &str, age: i32, city: &str, gender: Gender, looking_for: LookingFor) -> ProfilePatch {
    ProfilePatch {
        username: Some(format!("{}_tg", name.to_lowercase())),
        name: Some(name.into()),
        age: Some(age),
        city: Some(city.into()),
        gender: Some(gender),
        looking_for: Some(looking_for),
        description: Some(format!("{name} likes long walks")),
        photo_ref: Some(format!("photo-{name}")),
        embedding: None,
    }
}

pub async fn seed(store: &InMemoryStore, person_id: PersonId, patch: ProfilePatch) {
    store.upsert(person_id, patch).await.unwrap();
}

/// Returns canned vectors per exact text; unknown text fails like a transport error.
#[derive(Default)]
pub struct ScriptedEmbeddings {
    vectors: HashMap<String, Vec<f32>>,
    calls: AtomicUsize,
}

impl ScriptedEmbeddings {
    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for ScriptedEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| EmbeddingError::Transport("connection reset".into()))
    }
}
