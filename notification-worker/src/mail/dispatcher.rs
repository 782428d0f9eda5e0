//! Render-and-send for one email intent.

use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info};

use crate::config::Config;
use crate::error::DispatchError;
use crate::mail::templates::TemplateRenderer;
use crate::mail::transport::{MailTransport, OutgoingEmail};
use crate::queue::EmailIntent;

/// Result of [`EmailDispatcher::send`]. Failures have already been logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent,
    Failed,
}

/// Sender identity and the defaults every template can rely on.
#[derive(Debug, Clone)]
pub struct SenderProfile {
    pub name: String,
    pub address: String,
    /// Default for `appLink`
    pub app_link: String,
    /// Default for `appIcon`
    pub app_icon: Option<String>,
}

impl SenderProfile {
    pub fn from_config(config: &Config) -> Self {
        Self {
            name: config.sender_name.clone(),
            address: config.sender_email.clone(),
            app_link: config.client_url.clone(),
            app_icon: config.app_icon.clone(),
        }
    }
}

/// Renders an intent's template and hands the result to the transport.
///
/// Delivery is at-most-once: a failed render or send is logged and dropped,
/// never retried, and never surfaced to the caller.
pub struct EmailDispatcher {
    transport: Arc<dyn MailTransport>,
    renderer: TemplateRenderer,
    sender: SenderProfile,
}

impl EmailDispatcher {
    pub fn new(
        transport: Arc<dyn MailTransport>,
        renderer: TemplateRenderer,
        sender: SenderProfile,
    ) -> Self {
        Self {
            transport,
            renderer,
            sender,
        }
    }

    /// Render and send. Always returns; errors end up in the log.
    pub async fn send(&self, intent: &EmailIntent) -> DispatchOutcome {
        match self.try_send(intent).await {
            Ok(()) => {
                info!(
                    template = %intent.template,
                    to = %intent.receiver_email,
                    "email_sent"
                );
                DispatchOutcome::Sent
            }
            Err(e) => {
                error!(
                    template = %intent.template,
                    to = %intent.receiver_email,
                    error = %e,
                    "email_send_failed"
                );
                DispatchOutcome::Failed
            }
        }
    }

    async fn try_send(&self, intent: &EmailIntent) -> Result<(), DispatchError> {
        let mut vars = intent.render_variables();
        vars.entry("appLink")
            .or_insert_with(|| Value::String(self.sender.app_link.clone()));
        if let Some(icon) = &self.sender.app_icon {
            vars.entry("appIcon")
                .or_insert_with(|| Value::String(icon.clone()));
        }

        let rendered = self.renderer.render(&intent.template, &vars).await?;

        let email = OutgoingEmail {
            from_name: self.sender.name.clone(),
            from_address: self.sender.address.clone(),
            to: intent.receiver_email.clone(),
            subject: rendered.subject,
            html: rendered.html,
        };

        self.transport.send(&email).await
    }
}
