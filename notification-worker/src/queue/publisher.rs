//! Async RabbitMQ publisher for email intents.
//!
//! The worker itself never publishes; producers elsewhere do. This publisher
//! backs the `notification-publish` tool and anything that wants to feed a
//! running worker with the exact wire format it consumes.

use std::sync::Arc;

use anyhow::{Context, Result};
use lapin::{
    options::{BasicPublishOptions, ExchangeDeclareOptions},
    types::FieldTable,
    BasicProperties, Channel, Connection, ConnectionProperties,
};
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::types::{EmailIntent, QueueBinding};

/// Publisher holding a lazily opened connection and channel.
#[derive(Clone)]
pub struct Publisher {
    inner: Arc<PublisherInner>,
}

struct PublisherInner {
    url: String,
    state: Mutex<Option<(Connection, Channel)>>,
}

impl Publisher {
    /// Create a new publisher with the given RabbitMQ URL.
    pub fn new(url: String) -> Self {
        Self {
            inner: Arc::new(PublisherInner {
                url,
                state: Mutex::new(None),
            }),
        }
    }

    /// Return a live channel, connecting first if needed.
    async fn channel(&self) -> Result<Channel> {
        let mut state = self.inner.state.lock().await;

        if let Some((_, ch)) = state.as_ref() {
            if ch.status().connected() {
                return Ok(ch.clone());
            }
        }

        info!("rabbitmq_publisher_connecting");

        let conn = Connection::connect(
            &self.inner.url,
            ConnectionProperties::default().with_connection_name("notification-publisher".into()),
        )
        .await
        .context("Failed to connect to RabbitMQ")?;

        let ch = conn
            .create_channel()
            .await
            .context("Failed to create channel")?;

        info!("rabbitmq_publisher_connected");

        *state = Some((conn, ch.clone()));
        Ok(ch)
    }

    /// Publish one intent under the binding's routing key.
    ///
    /// The exchange is declared first with the same options the consumers
    /// use, so publishing before any worker has started still routes.
    pub async fn publish(&self, binding: &QueueBinding, intent: &EmailIntent) -> Result<()> {
        let channel = self.channel().await?;

        channel
            .exchange_declare(
                binding.exchange_name,
                binding.exchange_type.kind(),
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .context("Failed to declare exchange")?;

        let body = serde_json::to_vec(intent).context("Failed to serialize intent")?;

        channel
            .basic_publish(
                binding.exchange_name,
                binding.routing_key,
                BasicPublishOptions::default(),
                &body,
                BasicProperties::default()
                    .with_delivery_mode(2) // Persistent
                    .with_content_type("application/json".into()),
            )
            .await
            .context("Failed to publish intent")?
            .await
            .context("Failed to confirm publish")?;

        info!(
            exchange = binding.exchange_name,
            routing_key = binding.routing_key,
            template = %intent.template,
            body_length = body.len(),
            "rabbitmq_intent_published"
        );

        Ok(())
    }

    /// Close the connection gracefully.
    pub async fn close(&self) {
        let Some((conn, ch)) = self.inner.state.lock().await.take() else {
            return;
        };

        if let Err(e) = ch.close(200, "Normal shutdown").await {
            warn!(error = %e, "rabbitmq_channel_close_error");
        }

        if let Err(e) = conn.close(200, "Normal shutdown").await {
            warn!(error = %e, "rabbitmq_connection_close_error");
        }

        info!("rabbitmq_publisher_closed");
    }
}
