use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// RabbitMQ event envelope wrapping all domain events.
///
/// Routing key format: `pairly.{domain}.{entity}.{action}`
/// Example: `pairly.matching.match.created`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<T: Serialize> {
    pub id: Uuid,
    pub source: String,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Option<Uuid>,
    pub person_id: Option<i64>,
    pub data: T,
}

impl<T: Serialize> Event<T> {
    pub fn new(source: impl Into<String>, event_type: impl Into<String>, data: T) -> Self {
        Self {
            id: Uuid::now_v7(),
            source: source.into(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            correlation_id: None,
            person_id: None,
            data,
        }
    }

    pub fn with_person(mut self, person_id: i64) -> Self {
        self.person_id = Some(person_id);
        self
    }
}

/// RabbitMQ routing keys
pub mod routing_keys {
    pub const MATCHING_PROFILE_UPDATED: &str = "pairly.matching.profile.updated";
    pub const MATCHING_LIKE_RECEIVED: &str = "pairly.matching.like.received";
    pub const MATCHING_MATCH_CREATED: &str = "pairly.matching.match.created";
}

/// Event data payloads
pub mod payloads {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ProfileUpdated {
        pub person_id: i64,
        pub complete: bool,
    }

    /// Someone liked `target_id`; `pending_count` is the target's admirer count after the write.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct LikeReceived {
        pub target_id: i64,
        pub pending_count: i64,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct MatchCreated {
        pub person_a: i64,
        pub person_b: i64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_carries_person_and_payload() {
        let event = Event::new(
            "pairly-matching",
            routing_keys::MATCHING_MATCH_CREATED,
            payloads::MatchCreated { person_a: 1, person_b: 2 },
        )
        .with_person(1);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "pairly.matching.match.created");
        assert_eq!(json["person_id"], 1);
        assert_eq!(json["data"]["person_b"], 2);
        assert!(json["correlation_id"].is_null());
    }
}
