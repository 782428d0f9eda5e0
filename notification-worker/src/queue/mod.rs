//! Queue module for RabbitMQ operations.
//!
//! This module provides:
//! - The single broker connection and its shared channel
//! - The auth-email and order-email consumers
//! - Wire types and static bindings
//! - A publisher for feeding intents to a running worker
//!
//! ## Architecture
//!
//! ```text
//! producer → jobber-email-notification ─┬─ auth-email-queue  → consumer ─┐
//!                                        └─ order-email-queue → consumer ─┴→ EmailDispatcher
//! ```

pub mod connection;
pub mod consumer;
pub mod publisher;
pub mod types;

pub use connection::BrokerConnection;
pub use consumer::{
    ConsumerSummary, DeliveryOutcome, EmailKind, EmailMessageConsumer, InboundMessage,
};
pub use publisher::Publisher;
pub use types::{
    BindingExchangeType, EmailIntent, QueueBinding, AUTH_EMAIL_BINDING, EMAIL_EXCHANGE,
    EMAIL_INTENT_VERSION, ORDER_EMAIL_BINDING,
};
