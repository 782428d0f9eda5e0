//! Email rendering and delivery.
//!
//! ```text
//! EmailIntent → TemplateRenderer → OutgoingEmail → MailTransport (SMTP)
//! ```

pub mod dispatcher;
pub mod templates;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use dispatcher::{DispatchOutcome, EmailDispatcher, SenderProfile};
pub use templates::{RenderedEmail, TemplateRenderer};
pub use transport::{MailTransport, OutgoingEmail, SmtpMailTransport, SmtpSettings};
