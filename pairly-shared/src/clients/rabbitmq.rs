use lapin::options::{BasicPublishOptions, ConfirmSelectOptions, ExchangeDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use serde::Serialize;

use crate::types::Event;

/// Topic exchange every pairly service publishes to.
pub const EVENTS_EXCHANGE: &str = "pairly.events";

const PERSISTENT: u8 = 2;

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("amqp error: {0}")]
    Amqp(#[from] lapin::Error),

    #[error("broker rejected event on {0}")]
    Nacked(String),
}

/// Publisher for domain events. Cheap to clone; clones share the channel.
#[derive(Clone)]
pub struct RabbitMQClient {
    channel: Channel,
}

impl RabbitMQClient {
    /// Connects, opens a channel in confirm mode and makes sure the durable exchange exists.
    pub async fn connect(url: &str) -> Result<Self, lapin::Error> {
        let connection = Connection::connect(url, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;
        channel.confirm_select(ConfirmSelectOptions::default()).await?;

        let durable = ExchangeDeclareOptions {
            durable: true,
            ..ExchangeDeclareOptions::default()
        };
        channel
            .exchange_declare(EVENTS_EXCHANGE, ExchangeKind::Topic, durable, FieldTable::default())
            .await?;

        tracing::info!(exchange = EVENTS_EXCHANGE, "rabbitmq publisher ready");
        Ok(Self { channel })
    }

    /// Publishes and waits for the broker confirm.
    pub async fn publish<T: Serialize>(
        &self,
        routing_key: &str,
        event: &Event<T>,
    ) -> Result<(), PublishError> {
        let body = encode(event)?;
        let properties = BasicProperties::default()
            .with_content_type("application/json".into())
            .with_delivery_mode(PERSISTENT);

        let confirm = self
            .channel
            .basic_publish(
                EVENTS_EXCHANGE,
                routing_key,
                BasicPublishOptions::default(),
                &body,
                properties,
            )
            .await?;
        if confirm.await?.is_nack() {
            return Err(PublishError::Nacked(routing_key.to_string()));
        }

        tracing::debug!(routing_key, event_id = %event.id, "event published");
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.channel.status().connected()
    }
}

fn encode<T: Serialize>(event: &Event<T>) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(event)
}
