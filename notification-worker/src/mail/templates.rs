//! Template lookup and rendering.
//!
//! Each template id is a directory under the templates root:
//!
//! ```text
//! templates/
//!   forgotPassword/
//!     html.hbs      required, Handlebars HTML body
//!     subject.hbs   optional, Handlebars subject line
//! ```
//!
//! Templates are read from disk on every render, so edits are picked up
//! without a restart. `<style>` blocks are inlined into `style` attributes
//! after rendering since most mail clients drop them. Bodies are HTML-escaped;
//! subjects are a plain-text header and are rendered without escaping.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use handlebars::{no_escape, Handlebars};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::DispatchError;

const HTML_FILE: &str = "html.hbs";
const SUBJECT_FILE: &str = "subject.hbs";

/// Subject and body produced from one template.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

/// Renders named templates from a directory tree.
pub struct TemplateRenderer {
    root: PathBuf,
    html: Handlebars<'static>,
    subjects: Handlebars<'static>,
}

impl TemplateRenderer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        // Missing variables render as empty, like the producers expect.
        let mut html = Handlebars::new();
        html.set_strict_mode(false);

        let mut subjects = Handlebars::new();
        subjects.set_strict_mode(false);
        subjects.register_escape_fn(no_escape);

        Self {
            root: root.into(),
            html,
            subjects,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Render `template` with `vars`.
    pub async fn render(
        &self,
        template: &str,
        vars: &Map<String, Value>,
    ) -> Result<RenderedEmail, DispatchError> {
        validate_template_id(template)?;

        let dir = self.root.join(template);
        let html_path = dir.join(HTML_FILE);

        let html_source = match tokio::fs::read_to_string(&html_path).await {
            Ok(source) => source,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(DispatchError::TemplateNotFound {
                    template: template.to_string(),
                    path: html_path.display().to_string(),
                });
            }
            Err(e) => {
                return Err(DispatchError::TemplateIo {
                    template: template.to_string(),
                    source: e,
                });
            }
        };

        let subject_source = match tokio::fs::read_to_string(dir.join(SUBJECT_FILE)).await {
            Ok(source) => Some(source),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                return Err(DispatchError::TemplateIo {
                    template: template.to_string(),
                    source: e,
                });
            }
        };

        let html = render_source(&self.html, template, &html_source, vars)?;
        let html = css_inline::inline(&html).map_err(|e| DispatchError::Render {
            template: template.to_string(),
            message: e.to_string(),
        })?;

        let subject = match subject_source {
            Some(source) => render_source(&self.subjects, template, &source, vars)?,
            None => vars
                .get("subject")
                .and_then(Value::as_str)
                .unwrap_or(template)
                .to_string(),
        };
        let subject = collapse_whitespace(&subject);

        debug!(
            template = template,
            html_length = html.len(),
            "template_rendered"
        );

        Ok(RenderedEmail { subject, html })
    }
}

fn render_source(
    registry: &Handlebars<'static>,
    template: &str,
    source: &str,
    vars: &Map<String, Value>,
) -> Result<String, DispatchError> {
    registry
        .render_template(source, vars)
        .map_err(|e| DispatchError::Render {
            template: template.to_string(),
            message: e.to_string(),
        })
}

/// Template ids name a single directory: letters, digits, `-` and `_`.
fn validate_template_id(template: &str) -> Result<(), DispatchError> {
    let valid = !template.is_empty()
        && template
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(DispatchError::InvalidTemplateId(template.to_string()))
    }
}

fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::mail::testing::templates_root;

    fn vars(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn test_render_forgot_password() {
        let renderer = TemplateRenderer::new(templates_root());
        let rendered = renderer
            .render(
                "forgotPassword",
                &vars(json!({
                    "resetLink": "https://x/reset?t=1",
                    "username": "kevin",
                    "to": "a@b.com",
                })),
            )
            .await
            .unwrap();

        assert!(rendered.html.contains("https://x/reset?t=1"));
        assert!(rendered.html.contains("kevin"));
        assert!(!rendered.html.contains("{{"));
        assert_eq!(rendered.subject, "Reset your password");
    }

    #[tokio::test]
    async fn test_styles_are_inlined() {
        let renderer = TemplateRenderer::new(templates_root());
        let rendered = renderer
            .render("verifyEmail", &vars(json!({"verifyLink": "https://x/v"})))
            .await
            .unwrap();

        assert!(!rendered.html.contains("<style"));
        assert!(rendered.html.contains("style=\""));
    }

    #[tokio::test]
    async fn test_unknown_template_is_not_found() {
        let renderer = TemplateRenderer::new(templates_root());
        let result = renderer.render("doesNotExist", &Map::new()).await;

        assert!(matches!(result, Err(DispatchError::TemplateNotFound { .. })));
    }

    #[tokio::test]
    async fn test_path_traversal_is_rejected() {
        let renderer = TemplateRenderer::new(templates_root());
        let result = renderer.render("../Cargo", &Map::new()).await;

        assert!(matches!(result, Err(DispatchError::InvalidTemplateId(_))));
    }

    #[tokio::test]
    async fn test_subject_is_not_html_escaped() {
        let renderer = TemplateRenderer::new(templates_root());

        let offer = renderer
            .render("offer", &vars(json!({"sellerUsername": "Tom & Jerry's"})))
            .await
            .unwrap();
        assert_eq!(offer.subject, "Tom & Jerry's sent you a custom offer");

        let approval = renderer
            .render(
                "orderExtensionApproval",
                &vars(json!({"subject": "Extension for \"Logo\" <v2>"})),
            )
            .await
            .unwrap();
        assert_eq!(approval.subject, "Extension for \"Logo\" <v2>");
    }

    #[tokio::test]
    async fn test_body_is_html_escaped() {
        let renderer = TemplateRenderer::new(templates_root());
        let rendered = renderer
            .render("offer", &vars(json!({"sellerUsername": "<script>x</script>"})))
            .await
            .unwrap();

        assert!(!rendered.html.contains("<script>"));
        assert!(rendered.html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  Order\n  placed "), "Order placed");
    }
}
