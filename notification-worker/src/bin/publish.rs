//! Notification Publisher - enqueue a single email intent.
//!
//! ```text
//! notification-publish auth '{"receiverEmail":"a@b.com","template":"forgotPassword","locals":{...}}'
//! notification-publish order @order-placed.json
//! ```
//!
//! The payload is decoded with the same rules the worker applies, so a
//! message this tool accepts is one the worker will not discard.

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use notifications::{
    Config, EmailIntent, Publisher, QueueBinding, AUTH_EMAIL_BINDING, ORDER_EMAIL_BINDING,
};

const USAGE: &str = "usage: notification-publish <auth|order> <json | @file>";

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(kind), Some(payload)) = (args.next(), args.next()) else {
        bail!(USAGE);
    };

    let binding = binding_for(&kind)?;
    let raw = read_payload(&payload)?;
    let intent = EmailIntent::decode(raw.as_bytes()).context("Payload would be discarded")?;

    let config = Config::from_env();
    let publisher = Publisher::new(config.rabbitmq_endpoint.clone());

    let result = publisher.publish(&binding, &intent).await;
    publisher.close().await;
    result?;

    info!(
        routing_key = binding.routing_key,
        receiver = %intent.receiver_email,
        template = %intent.template,
        "publish_complete"
    );

    Ok(())
}

fn binding_for(kind: &str) -> Result<QueueBinding> {
    match kind {
        "auth" => Ok(AUTH_EMAIL_BINDING),
        "order" => Ok(ORDER_EMAIL_BINDING),
        other => bail!("unknown message type `{other}`\n{USAGE}"),
    }
}

fn read_payload(arg: &str) -> Result<String> {
    match arg.strip_prefix('@') {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))
        }
        None => Ok(arg.to_string()),
    }
}
