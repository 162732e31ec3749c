use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

/// Opaque identity of a person (the chat-platform user id).
pub type PersonId = i64;

pub const MIN_AGE: i32 = 18;
pub const MAX_AGE: i32 = 99;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "M" => Ok(Gender::Male),
            "F" => Ok(Gender::Female),
            _ => Err(format!("unknown gender: {s}")),
        }
    }
}

/// Whom a person wants to be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LookingFor {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    #[serde(rename = "ANY")]
    Any,
}

impl LookingFor {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookingFor::Male => "M",
            LookingFor::Female => "F",
            LookingFor::Any => "ANY",
        }
    }

    /// The single gender this preference is restricted to, `None` for ANY.
    pub fn gender(&self) -> Option<Gender> {
        match self {
            LookingFor::Male => Some(Gender::Male),
            LookingFor::Female => Some(Gender::Female),
            LookingFor::Any => None,
        }
    }

    pub fn accepts(&self, gender: Gender) -> bool {
        self.gender().map_or(true, |wanted| wanted == gender)
    }
}

impl FromStr for LookingFor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "M" => Ok(LookingFor::Male),
            "F" => Ok(LookingFor::Female),
            "ANY" => Ok(LookingFor::Any),
            _ => Err(format!("unknown preference: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Like,
    Dislike,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Like => "like",
            Action::Dislike => "dislike",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(Action::Like),
            "dislike" => Ok(Action::Dislike),
            _ => Err(format!("unknown action: {s}")),
        }
    }
}

// --- Profile ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub person_id: PersonId,
    /// Contact handle, revealed to the other side on a mutual match.
    pub username: Option<String>,
    pub name: Option<String>,
    pub age: Option<i32>,
    pub city: Option<String>,
    pub gender: Option<Gender>,
    pub looking_for: Option<LookingFor>,
    pub description: Option<String>,
    pub photo_ref: Option<String>,
    #[serde(skip_serializing)]
    pub embedding: Option<Vec<f32>>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn empty(person_id: PersonId) -> Self {
        Self {
            person_id,
            username: None,
            name: None,
            age: None,
            city: None,
            gender: None,
            looking_for: None,
            description: None,
            photo_ref: None,
            embedding: None,
            updated_at: Utc::now(),
        }
    }

    /// Name, age, city, gender, description and photo must all be present.
    pub fn is_complete(&self) -> bool {
        self.name.is_some()
            && self.age.is_some()
            && self.city.is_some()
            && self.gender.is_some()
            && self.description.is_some()
            && self.photo_ref.is_some()
    }

    /// A missing preference behaves like ANY.
    pub fn preference(&self) -> LookingFor {
        self.looking_for.unwrap_or(LookingFor::Any)
    }

    pub fn city_key(&self) -> Option<String> {
        self.city.as_deref().map(normalize_city)
    }

    /// Cached embedding, ignoring empty vectors.
    pub fn usable_embedding(&self) -> Option<&[f32]> {
        self.embedding.as_deref().filter(|v| !v.is_empty())
    }

    /// Applies a partial update. Unset fields keep their value; the timestamp always moves.
    pub fn apply(&mut self, patch: ProfilePatch) {
        let patch = patch.normalized();
        if let Some(v) = patch.username {
            self.username = Some(v);
        }
        if let Some(v) = patch.name {
            self.name = Some(v);
        }
        if let Some(v) = patch.age {
            self.age = Some(v);
        }
        if let Some(v) = patch.city {
            self.city = Some(v);
        }
        if let Some(v) = patch.gender {
            self.gender = Some(v);
        }
        if let Some(v) = patch.looking_for {
            self.looking_for = Some(v);
        }
        if let Some(v) = patch.description {
            self.description = Some(v);
        }
        if let Some(v) = patch.photo_ref {
            self.photo_ref = Some(v);
        }
        if let Some(v) = patch.embedding {
            self.embedding = v;
        }
        self.updated_at = Utc::now();
    }
}

/// Partial profile update. `None` means "keep the stored value".
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProfilePatch {
    #[validate(length(max = 64))]
    pub username: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub name: Option<String>,
    pub age: Option<i32>,
    #[validate(length(max = 128))]
    pub city: Option<String>,
    pub gender: Option<Gender>,
    pub looking_for: Option<LookingFor>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 512))]
    pub photo_ref: Option<String>,
    /// `Some(None)` clears the cached vector. Never accepted from clients.
    #[serde(skip)]
    pub embedding: Option<Option<Vec<f32>>>,
}

impl ProfilePatch {
    /// Trims text fields, drops blank ones, clamps age into range.
    pub fn normalized(self) -> Self {
        Self {
            username: non_blank(self.username),
            name: non_blank(self.name),
            age: self.age.map(clamp_age),
            city: non_blank(self.city),
            gender: self.gender,
            looking_for: self.looking_for,
            description: non_blank(self.description),
            photo_ref: non_blank(self.photo_ref),
            embedding: self.embedding,
        }
    }

    pub fn with_embedding(mut self, embedding: Option<Vec<f32>>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn clamp_age(age: i32) -> i32 {
    age.clamp(MIN_AGE, MAX_AGE)
}

/// Comparison key for cities: trimmed, inner whitespace collapsed, lowercased.
pub fn normalize_city(city: &str) -> String {
    city.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// --- Interactions ---

/// What the ledger saw around an atomic decision write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionRecord {
    /// The actor's action on this pair before the write.
    pub previous: Option<Action>,
    /// The target's action towards the actor, read in the same critical section.
    pub reverse: Option<Action>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completeness_requires_every_card_field() {
        let mut profile = Profile::empty(1);
        profile.apply(ProfilePatch {
            name: Some("Anna".into()),
            age: Some(30),
            city: Some("Kazan".into()),
            gender: Some(Gender::Female),
            description: Some("books and hiking".into()),
            ..Default::default()
        });
        assert!(!profile.is_complete());

        profile.apply(ProfilePatch {
            photo_ref: Some("photo-1".into()),
            ..Default::default()
        });
        assert!(profile.is_complete());
        // username and preference are optional
        assert!(profile.username.is_none());
        assert_eq!(profile.preference(), LookingFor::Any);
    }

    #[test]
    fn patch_keeps_unspecified_fields_and_ignores_blanks() {
        let mut profile = Profile::empty(7);
        profile.apply(ProfilePatch {
            name: Some("Ivan".into()),
            city: Some("Moscow".into()),
            ..Default::default()
        });
        let first_update = profile.updated_at;

        profile.apply(ProfilePatch {
            name: Some("   ".into()),
            description: Some("  likes jazz  ".into()),
            ..Default::default()
        });

        assert_eq!(profile.name.as_deref(), Some("Ivan"));
        assert_eq!(profile.city.as_deref(), Some("Moscow"));
        assert_eq!(profile.description.as_deref(), Some("likes jazz"));
        assert!(profile.updated_at >= first_update);
    }

    #[test]
    fn age_is_clamped() {
        assert_eq!(clamp_age(12), 18);
        assert_eq!(clamp_age(45), 45);
        assert_eq!(clamp_age(140), 99);

        let patch = ProfilePatch { age: Some(5), ..Default::default() }.normalized();
        assert_eq!(patch.age, Some(18));
    }

    #[test]
    fn embedding_patch_can_clear() {
        let mut profile = Profile::empty(3);
        profile.apply(ProfilePatch::default().with_embedding(Some(vec![0.5, 0.5])));
        assert_eq!(profile.usable_embedding(), Some(&[0.5, 0.5][..]));

        profile.apply(ProfilePatch::default());
        assert!(profile.embedding.is_some());

        profile.apply(ProfilePatch::default().with_embedding(None));
        assert!(profile.embedding.is_none());
    }

    #[test]
    fn city_key_normalization() {
        assert_eq!(normalize_city("  Saint   Petersburg "), "saint petersburg");
        assert_eq!(normalize_city("KAZAN"), normalize_city("kazan"));
    }

    #[test]
    fn preference_accepts() {
        assert!(LookingFor::Any.accepts(Gender::Male));
        assert!(LookingFor::Female.accepts(Gender::Female));
        assert!(!LookingFor::Female.accepts(Gender::Male));
    }

    #[test]
    fn wire_names() {
        assert_eq!(serde_json::to_value(Gender::Male).unwrap(), "M");
        assert_eq!(serde_json::to_value(LookingFor::Any).unwrap(), "ANY");
        assert_eq!(serde_json::to_value(Action::Dislike).unwrap(), "dislike");
        assert_eq!("like".parse::<Action>(), Ok(Action::Like));
        assert!("meh".parse::<Action>().is_err());
    }

    #[test]
    fn patch_validation() {
        let patch = ProfilePatch {
            name: Some(String::new()),
            ..Default::default()
        };
        assert!(patch.validate().is_err());

        let patch = ProfilePatch {
            name: Some("Anna".into()),
            description: Some("x".repeat(2001)),
            ..Default::default()
        };
        assert!(patch.validate().is_err());

        assert!(ProfilePatch::default().validate().is_ok());
    }

    #[test]
    fn embedding_is_not_serialized() {
        let mut profile = Profile::empty(9);
        profile.embedding = Some(vec![1.0]);
        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("embedding").is_none());
        assert_eq!(json["person_id"], 9);
    }
}
