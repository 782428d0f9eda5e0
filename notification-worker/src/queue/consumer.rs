//! Email queue consumers.
//!
//! One consumer per message type. Each declares its exchange, queue and
//! binding, then handles deliveries strictly one at a time in arrival order:
//!
//! 1. Decode the payload into an [`EmailIntent`]; malformed payloads are
//!    acknowledged and discarded so they never block the queue.
//! 2. Dispatch every email the intent expands to.
//! 3. Acknowledge, whatever the dispatch outcome (at-most-once delivery).

use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use lapin::{
    message::Delivery,
    options::{
        BasicAckOptions, BasicConsumeOptions, ExchangeDeclareOptions, QueueBindOptions,
        QueueDeclareOptions,
    },
    types::FieldTable,
    Channel, Consumer,
};
use tracing::{error, info, warn};

use crate::error::ConsumerError;
use crate::mail::{DispatchOutcome, EmailDispatcher};
use crate::queue::types::{EmailIntent, QueueBinding, AUTH_EMAIL_BINDING, ORDER_EMAIL_BINDING};

/// Template the order consumer adds to every `orderPlaced` email.
pub const ORDER_RECEIPT_TEMPLATE: &str = "orderReceipt";

/// A delivery as the consumer loop sees it.
#[async_trait]
pub trait InboundMessage: Send + Sized {
    fn payload(&self) -> &[u8];

    fn delivery_tag(&self) -> u64;

    async fn ack(self) -> Result<(), lapin::Error>;
}

#[async_trait]
impl InboundMessage for Delivery {
    fn payload(&self) -> &[u8] {
        &self.data
    }

    fn delivery_tag(&self) -> u64 {
        self.delivery_tag
    }

    async fn ack(self) -> Result<(), lapin::Error> {
        self.acker
            .ack(BasicAckOptions::default())
            .await
            .map(|_| ())
    }
}

/// Which family of emails a consumer handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    Auth,
    Order,
}

impl EmailKind {
    /// Every email one intent turns into, in send order.
    pub fn expand(self, intent: EmailIntent) -> Vec<EmailIntent> {
        match self {
            EmailKind::Order if intent.template == "orderPlaced" => {
                let receipt = intent.with_template(ORDER_RECEIPT_TEMPLATE);
                vec![intent, receipt]
            }
            _ => vec![intent],
        }
    }
}

/// What happened to a single delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Decoded and handed to the dispatcher, one outcome per email
    Dispatched(Vec<DispatchOutcome>),
    /// Payload could not be decoded
    Discarded,
}

/// Counters reported when a consumer stream ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerSummary {
    pub dispatched: u64,
    pub discarded: u64,
    pub stream_errors: u64,
}

/// Consumes one queue and drives the dispatcher.
pub struct EmailMessageConsumer {
    binding: QueueBinding,
    kind: EmailKind,
    dispatcher: Arc<EmailDispatcher>,
}

impl EmailMessageConsumer {
    pub fn new(binding: QueueBinding, kind: EmailKind, dispatcher: Arc<EmailDispatcher>) -> Self {
        Self {
            binding,
            kind,
            dispatcher,
        }
    }

    /// Consumer for the `auth-email` routing key.
    pub fn auth(dispatcher: Arc<EmailDispatcher>) -> Self {
        Self::new(AUTH_EMAIL_BINDING, EmailKind::Auth, dispatcher)
    }

    /// Consumer for the `order-email` routing key.
    pub fn order(dispatcher: Arc<EmailDispatcher>) -> Self {
        Self::new(ORDER_EMAIL_BINDING, EmailKind::Order, dispatcher)
    }

    pub fn binding(&self) -> &QueueBinding {
        &self.binding
    }

    /// Declare exchange and queue, bind them and start consuming.
    ///
    /// Every declaration is idempotent, so restarts against an existing
    /// topology are safe.
    pub async fn start(&self, channel: &Channel) -> Result<Consumer, ConsumerError> {
        let binding = self.binding;

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
            .map_err(|source| ConsumerError::ExchangeDeclare {
                exchange: binding.exchange_name,
                source,
            })?;

        channel
            .queue_declare(
                binding.queue_name,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|source| ConsumerError::QueueDeclare {
                queue: binding.queue_name,
                source,
            })?;

        channel
            .queue_bind(
                binding.queue_name,
                binding.exchange_name,
                binding.routing_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|source| ConsumerError::QueueBind {
                queue: binding.queue_name,
                exchange: binding.exchange_name,
                source,
            })?;

        info!(
            exchange = binding.exchange_name,
            routing_key = binding.routing_key,
            queue = binding.queue_name,
            "rabbitmq_queue_bound"
        );

        let consumer_tag = format!("notification-{}", binding.routing_key);
        let consumer = channel
            .basic_consume(
                binding.queue_name,
                &consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|source| ConsumerError::Consume {
                queue: binding.queue_name,
                source,
            })?;

        info!(
            queue = binding.queue_name,
            consumer_tag = %consumer_tag,
            "rabbitmq_consumer_started"
        );

        Ok(consumer)
    }

    /// Handle deliveries until the stream ends.
    ///
    /// Each delivery is fully dispatched and acknowledged before the next one
    /// is pulled, so a queue is processed in broker order.
    pub async fn run<S, M, E>(&self, mut deliveries: S) -> ConsumerSummary
    where
        S: Stream<Item = Result<M, E>> + Unpin,
        M: InboundMessage,
        E: Display,
    {
        let queue = self.binding.queue_name;
        let mut summary = ConsumerSummary::default();

        while let Some(delivery) = deliveries.next().await {
            match delivery {
                Ok(message) => match self.handle(message).await {
                    DeliveryOutcome::Dispatched(_) => summary.dispatched += 1,
                    DeliveryOutcome::Discarded => summary.discarded += 1,
                },
                Err(e) => {
                    summary.stream_errors += 1;
                    error!(queue = queue, error = %e, "rabbitmq_delivery_error");
                }
            }
        }

        warn!(
            queue = queue,
            dispatched = summary.dispatched,
            discarded = summary.discarded,
            stream_errors = summary.stream_errors,
            "rabbitmq_consumer_closed"
        );

        summary
    }

    /// Decode, dispatch and acknowledge a single delivery.
    pub async fn handle<M: InboundMessage>(&self, message: M) -> DeliveryOutcome {
        let queue = self.binding.queue_name;
        let delivery_tag = message.delivery_tag();

        info!(
            queue = queue,
            delivery_tag = delivery_tag,
            body_length = message.payload().len(),
            "email_message_received"
        );

        let outcome = match EmailIntent::decode(message.payload()) {
            Ok(intent) => {
                let mut outcomes = Vec::new();
                for email in self.kind.expand(intent) {
                    outcomes.push(self.dispatcher.send(&email).await);
                }
                DeliveryOutcome::Dispatched(outcomes)
            }
            Err(e) => {
                error!(
                    queue = queue,
                    delivery_tag = delivery_tag,
                    error = %e,
                    "email_message_discarded"
                );
                DeliveryOutcome::Discarded
            }
        };

        match message.ack().await {
            Ok(()) => info!(
                queue = queue,
                delivery_tag = delivery_tag,
                "email_message_acked"
            ),
            Err(e) => error!(
                queue = queue,
                delivery_tag = delivery_tag,
                error = %e,
                "rabbitmq_ack_failed"
            ),
        }

        outcome
    }
}
