//! Error types for the notification pipeline.
//!
//! None of these ever reach an external caller: consumers and the dispatcher
//! log them and move on, and only `ConnectionFailure` aborts startup.

use thiserror::Error;

/// A message body that could not be turned into an `EmailIntent`.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("required field `{0}` is empty")]
    EmptyField(&'static str),

    #[error("unsupported payload version {found} (max supported {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
}

/// Anything that goes wrong between template lookup and SMTP acceptance.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid template id `{0}`")]
    InvalidTemplateId(String),

    #[error("template `{template}` not found at {path}")]
    TemplateNotFound { template: String, path: String },

    #[error("failed to read template `{template}`: {source}")]
    TemplateIo {
        template: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to render template `{template}`: {message}")]
    Render { template: String, message: String },

    #[error("invalid email address `{address}`: {message}")]
    InvalidAddress { address: String, message: String },

    #[error("failed to build message: {0}")]
    Message(String),

    #[error("smtp transport error: {0}")]
    Transport(String),
}

/// The single broker connection attempt failed.
#[derive(Debug, Error)]
pub enum ConnectionFailure {
    #[error("failed to connect to broker: {0}")]
    Connect(#[source] lapin::Error),

    #[error("failed to create channel: {0}")]
    Channel(#[source] lapin::Error),
}

/// A consumer could not set up its exchange, queue or binding.
#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("failed to declare exchange `{exchange}`: {source}")]
    ExchangeDeclare {
        exchange: &'static str,
        #[source]
        source: lapin::Error,
    },

    #[error("failed to declare queue `{queue}`: {source}")]
    QueueDeclare {
        queue: &'static str,
        #[source]
        source: lapin::Error,
    },

    #[error("failed to bind queue `{queue}` to `{exchange}`: {source}")]
    QueueBind {
        queue: &'static str,
        exchange: &'static str,
        #[source]
        source: lapin::Error,
    },

    #[error("failed to start consuming `{queue}`: {source}")]
    Consume {
        queue: &'static str,
        #[source]
        source: lapin::Error,
    },
}

/// One failed poll of the search cluster health endpoint.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid cluster url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("cluster health request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("cluster unavailable: {0}")]
    Unavailable(String),
}
