//! Outbound mail transport.
//!
//! The dispatcher talks to a [`MailTransport`]; production uses lettre's
//! async SMTP client against the configured relay.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::DispatchError;

/// A fully rendered email ready to hand to a relay.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub from_name: String,
    pub from_address: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Something that can deliver an [`OutgoingEmail`].
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), DispatchError>;
}

/// Relay settings for [`SmtpMailTransport`].
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl SmtpSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            host: config.smtp_host.clone(),
            port: config.smtp_port,
            username: config.sender_email.clone(),
            password: config.sender_email_password.clone(),
        }
    }
}

/// lettre-backed SMTP transport.
///
/// Upgrades with STARTTLS when the relay offers it and accepts self-signed
/// certificates on the upgraded connection. Built once and shared; lettre
/// pools the underlying connections.
#[derive(Clone)]
pub struct SmtpMailTransport {
    inner: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailTransport {
    pub fn new(settings: &SmtpSettings) -> Result<Self, DispatchError> {
        let tls = TlsParameters::builder(settings.host.clone())
            .dangerous_accept_invalid_certs(true)
            .build()
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
            .port(settings.port)
            .tls(Tls::Opportunistic(tls));

        if !settings.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ));
        }

        info!(
            host = %settings.host,
            port = settings.port,
            authenticated = !settings.username.is_empty(),
            "smtp_transport_created"
        );

        Ok(Self {
            inner: builder.build(),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), DispatchError> {
        let message = build_message(email)?;

        let response = self
            .inner
            .send(message)
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        debug!(
            to = %email.to,
            code = %response.code(),
            "smtp_response"
        );

        Ok(())
    }
}

/// Turn an [`OutgoingEmail`] into a MIME message.
pub fn build_message(email: &OutgoingEmail) -> Result<Message, DispatchError> {
    let from = Mailbox::new(
        Some(email.from_name.clone()),
        parse_address(&email.from_address)?,
    );
    let to = Mailbox::new(None, parse_address(&email.to)?);

    Message::builder()
        .from(from)
        .to(to)
        .subject(email.subject.clone())
        .header(ContentType::TEXT_HTML)
        .body(email.html.clone())
        .map_err(|e| DispatchError::Message(e.to_string()))
}

pub(crate) fn parse_address(raw: &str) -> Result<Address, DispatchError> {
    raw.trim()
        .parse::<Address>()
        .map_err(|e| DispatchError::InvalidAddress {
            address: raw.to_string(),
            message: e.to_string(),
        })
}
