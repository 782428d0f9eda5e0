//! Notification worker - consumes email intents from RabbitMQ, renders them
//! and sends them through the SMTP relay.

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use notifications::{lifecycle, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    tracing::info!(pid = std::process::id(), "worker_starting");

    // Load configuration from environment
    let config = Config::from_env();
    tracing::info!(
        rabbitmq_endpoint_set = !config.rabbitmq_endpoint.is_empty(),
        connection_name = %config.rabbitmq_connection_name,
        elastic_search_url = %config.elastic_search_url,
        smtp_host = %config.smtp_host,
        smtp_port = config.smtp_port,
        sender_configured = !config.sender_email.is_empty(),
        templates_dir = %config.templates_dir.display(),
        port = config.port,
        "config_loaded"
    );

    lifecycle::run(config).await
}
