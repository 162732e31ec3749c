use pairly_shared::clients::rabbitmq::RabbitMQClient;
use pairly_shared::types::event::{payloads, routing_keys, Event};

use crate::models::PersonId;

const SOURCE: &str = "pairly-matching";

pub async fn publish_match_created(rabbitmq: &RabbitMQClient, person_a: PersonId, person_b: PersonId) {
    let event = Event::new(
        SOURCE,
        routing_keys::MATCHING_MATCH_CREATED,
        payloads::MatchCreated { person_a, person_b },
    )
    .with_person(person_a);

    if let Err(e) = rabbitmq
        .publish(routing_keys::MATCHING_MATCH_CREATED, &event)
        .await
    {
        tracing::error!(error = %e, person_a, person_b, "failed to publish match.created event");
    }
}

pub async fn publish_like_received(rabbitmq: &RabbitMQClient, target_id: PersonId, pending_count: i64) {
    let event = Event::new(
        SOURCE,
        routing_keys::MATCHING_LIKE_RECEIVED,
        payloads::LikeReceived { target_id, pending_count },
    )
    .with_person(target_id);

    if let Err(e) = rabbitmq
        .publish(routing_keys::MATCHING_LIKE_RECEIVED, &event)
        .await
    {
        tracing::error!(error = %e, target_id, "failed to publish like.received event");
    }
}

pub async fn publish_profile_updated(rabbitmq: &RabbitMQClient, person_id: PersonId, complete: bool) {
    let event = Event::new(
        SOURCE,
        routing_keys::MATCHING_PROFILE_UPDATED,
        payloads::ProfileUpdated { person_id, complete },
    )
    .with_person(person_id);

    if let Err(e) = rabbitmq
        .publish(routing_keys::MATCHING_PROFILE_UPDATED, &event)
        .await
    {
        tracing::error!(error = %e, person_id, "failed to publish profile.updated event");
    }
}
