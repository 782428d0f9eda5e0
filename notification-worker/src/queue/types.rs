//! Queue message types and broker wiring.
//!
//! Both consumers share one direct exchange and differ only in routing key
//! and queue name:
//!
//! ```text
//! jobber-email-notification ─┬─ auth-email  → auth-email-queue
//!                            └─ order-email → order-email-queue
//! ```

use lapin::ExchangeKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DecodeError;

/// Exchange every email notification is published to.
pub const EMAIL_EXCHANGE: &str = "jobber-email-notification";

/// Highest `version` tag this worker understands.
pub const EMAIL_INTENT_VERSION: u32 = 1;

/// Static routing for one message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueBinding {
    pub exchange_name: &'static str,
    pub routing_key: &'static str,
    pub queue_name: &'static str,
    pub exchange_type: BindingExchangeType,
}

/// Exchange types a binding can declare. Only direct routing is used today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingExchangeType {
    Direct,
}

impl BindingExchangeType {
    pub fn kind(self) -> ExchangeKind {
        match self {
            BindingExchangeType::Direct => ExchangeKind::Direct,
        }
    }
}

/// Account confirmation, verification and password reset emails.
pub const AUTH_EMAIL_BINDING: QueueBinding = QueueBinding {
    exchange_name: EMAIL_EXCHANGE,
    routing_key: "auth-email",
    queue_name: "auth-email-queue",
    exchange_type: BindingExchangeType::Direct,
};

/// Order lifecycle emails.
pub const ORDER_EMAIL_BINDING: QueueBinding = QueueBinding {
    exchange_name: EMAIL_EXCHANGE,
    routing_key: "order-email",
    queue_name: "order-email-queue",
    exchange_type: BindingExchangeType::Direct,
};

/// Decoded email request.
///
/// Wire format is a camelCase JSON object. Template variables normally live
/// under `locals`, but producers that send them flat (`username`,
/// `verifyLink`, `orderId`, ...) are accepted too: unknown top-level keys are
/// kept in `context` and merged under `locals` at render time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailIntent {
    /// Payload schema version, absent on legacy producers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    /// Recipient email address
    pub receiver_email: String,
    /// Template id, a directory name under the templates root
    pub template: String,
    /// Render variables
    #[serde(default)]
    pub locals: Map<String, Value>,
    /// Any other top-level fields
    #[serde(flatten)]
    pub context: Map<String, Value>,
}

impl EmailIntent {
    /// Create an intent with the given render variables.
    pub fn new(
        receiver_email: impl Into<String>,
        template: impl Into<String>,
        locals: Map<String, Value>,
    ) -> Self {
        Self {
            version: Some(EMAIL_INTENT_VERSION),
            receiver_email: receiver_email.into(),
            template: template.into(),
            locals,
            context: Map::new(),
        }
    }

    /// Decode a raw message body.
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let intent: EmailIntent = serde_json::from_slice(payload)?;

        if let Some(found) = intent.version {
            if found > EMAIL_INTENT_VERSION {
                return Err(DecodeError::UnsupportedVersion {
                    found,
                    supported: EMAIL_INTENT_VERSION,
                });
            }
        }
        if intent.receiver_email.trim().is_empty() {
            return Err(DecodeError::EmptyField("receiverEmail"));
        }
        if intent.template.trim().is_empty() {
            return Err(DecodeError::EmptyField("template"));
        }

        Ok(intent)
    }

    /// Same recipient and variables, different template.
    pub fn with_template(&self, template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            ..self.clone()
        }
    }

    /// Variables handed to the template engine.
    ///
    /// Precedence, lowest first: flat context fields, `locals`, `to`.
    pub fn render_variables(&self) -> Map<String, Value> {
        let mut vars = self.context.clone();
        for (key, value) in &self.locals {
            vars.insert(key.clone(), value.clone());
        }
        vars.insert("to".to_string(), Value::String(self.receiver_email.clone()));
        vars
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_nested_locals() {
        let payload = br#"{"receiverEmail":"a@b.com","template":"forgotPassword","locals":{"resetLink":"https://x/reset?t=1","username":"kevin"}}"#;

        let intent = EmailIntent::decode(payload).unwrap();

        assert_eq!(intent.receiver_email, "a@b.com");
        assert_eq!(intent.template, "forgotPassword");
        assert_eq!(intent.locals["username"], json!("kevin"));
        assert!(intent.context.is_empty());
        assert_eq!(intent.version, None);
    }

    #[test]
    fn test_decode_flat_fields_become_context() {
        let payload = br#"{"receiverEmail":"buyer@b.com","template":"orderPlaced","orderId":"ord-42","username":"ana"}"#;

        let intent = EmailIntent::decode(payload).unwrap();

        assert!(intent.locals.is_empty());
        assert_eq!(intent.context["orderId"], json!("ord-42"));
        assert_eq!(intent.render_variables()["username"], json!("ana"));
    }

    #[test]
    fn test_decode_missing_receiver_fails() {
        let payload = br#"{"template":"forgotPassword","locals":{}}"#;
        assert!(matches!(
            EmailIntent::decode(payload),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_missing_template_fails() {
        let payload = br#"{"receiverEmail":"a@b.com"}"#;
        assert!(matches!(
            EmailIntent::decode(payload),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_empty_template_fails() {
        let payload = br#"{"receiverEmail":"a@b.com","template":"  "}"#;
        assert!(matches!(
            EmailIntent::decode(payload),
            Err(DecodeError::EmptyField("template"))
        ));
    }

    #[test]
    fn test_decode_rejects_future_version() {
        let payload = br#"{"version":2,"receiverEmail":"a@b.com","template":"verifyEmail"}"#;
        assert!(matches!(
            EmailIntent::decode(payload),
            Err(DecodeError::UnsupportedVersion { found: 2, supported: 1 })
        ));
    }

    #[test]
    fn test_decode_rejects_non_utf8() {
        assert!(EmailIntent::decode(&[0xff, 0xfe, 0x00]).is_err());
    }

    #[test]
    fn test_render_variables_precedence() {
        let mut intent = EmailIntent::decode(
            br#"{"receiverEmail":"a@b.com","template":"verifyEmail","username":"flat","to":"spoofed@x.com","locals":{"username":"nested"}}"#,
        )
        .unwrap();
        intent.locals.insert("verifyLink".into(), json!("https://x/verify"));

        let vars = intent.render_variables();

        assert_eq!(vars["username"], json!("nested"));
        assert_eq!(vars["to"], json!("a@b.com"));
        assert_eq!(vars["verifyLink"], json!("https://x/verify"));
    }

    #[test]
    fn test_intent_serializes_camel_case() {
        let intent = EmailIntent::new("a@b.com", "verifyEmail", Map::new());
        let json = serde_json::to_value(&intent).unwrap();

        assert_eq!(json["receiverEmail"], json!("a@b.com"));
        assert_eq!(json["version"], json!(1));
    }

    #[test]
    fn test_bindings_share_exchange() {
        assert_eq!(AUTH_EMAIL_BINDING.exchange_name, ORDER_EMAIL_BINDING.exchange_name);
        assert_ne!(AUTH_EMAIL_BINDING.queue_name, ORDER_EMAIL_BINDING.queue_name);
        assert!(matches!(
            AUTH_EMAIL_BINDING.exchange_type.kind(),
            ExchangeKind::Direct
        ));
    }
}
