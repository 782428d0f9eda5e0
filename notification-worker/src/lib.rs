//! Notification worker.
//!
//! Consumes email intents from RabbitMQ, renders them against on-disk
//! templates and sends them over SMTP. Two binaries share this library:
//! - `notification-worker`: the long-running consumer
//! - `notification-publish`: publishes a single intent, for manual testing
//!
//! ## Architecture
//!
//! ```text
//! BrokerConnection → EmailMessageConsumer (auth, order) → EmailDispatcher → SMTP relay
//! DependencyHealthMonitor → Elasticsearch (startup liveness only)
//! ```
//!
//! Delivery is at-most-once: every message is acknowledged after dispatch,
//! whether or not the email went out.

pub mod config;
pub mod error;
pub mod health;
pub mod lifecycle;
pub mod mail;
pub mod queue;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use error::{ConnectionFailure, ConsumerError, DecodeError, DispatchError, ProbeError};
pub use health::{DependencyHealthMonitor, HealthStatus};
pub use mail::{DispatchOutcome, EmailDispatcher};
pub use queue::{
    BrokerConnection, EmailIntent, EmailMessageConsumer, Publisher, QueueBinding,
    AUTH_EMAIL_BINDING, ORDER_EMAIL_BINDING,
};
