// crates/fishsoop-core/src/templates.rs

use handlebars::Handlebars;
use serde::Serialize;

/// Shared `<style>` block for the HTML bodies.
pub const BODY_STYLE: &str = r#"<style>
table td th {
    border: 1px solid black;
    margin: auto;
}
td {
    padding: 2px 20px;
}
</style>"#;

const SUBJECT: &str = "subject";
const HTML: &str = "html";
const TEXT: &str = "text";

/// Markup escaping shared by the HTML templates and the SVG plots.
pub fn escape(text: &str) -> String {
    handlebars::html_escape(text)
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMessage {
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Subject, HTML and plain-text templates rendered from one context.
///
/// Both registries run in strict mode so a missing field is an error instead of a blank.
/// Only the HTML body is escaped.
pub struct TemplateSet {
    html: Handlebars<'static>,
    plain: Handlebars<'static>,
}

impl TemplateSet {
    pub fn new(subject: &str, html: &str, text: &str) -> Result<Self, handlebars::TemplateError> {
        let mut html_registry = Handlebars::new();
        html_registry.set_strict_mode(true);
        html_registry.register_escape_fn(escape);
        html_registry.register_template_string(HTML, html)?;

        let mut plain = Handlebars::new();
        plain.set_strict_mode(true);
        plain.register_escape_fn(handlebars::no_escape);
        plain.register_template_string(SUBJECT, subject)?;
        plain.register_template_string(TEXT, text)?;

        Ok(Self {
            html: html_registry,
            plain,
        })
    }

    pub fn render<T: Serialize>(&self, context: &T) -> Result<RenderedMessage, handlebars::RenderError> {
        Ok(RenderedMessage {
            subject: self.plain.render(SUBJECT, context)?.trim().to_string(),
            html: self.html.render(HTML, context)?,
            text: self.plain.render(TEXT, context)?,
        })
    }
}

/// One strict, escaped HTML document template.
pub struct HtmlTemplate {
    registry: Handlebars<'static>,
}

impl HtmlTemplate {
    pub fn new(template: &str) -> Result<Self, handlebars::TemplateError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_escape_fn(escape);
        registry.register_template_string(HTML, template)?;
        Ok(Self { registry })
    }

    pub fn render<T: Serialize>(&self, context: &T) -> Result<String, handlebars::RenderError> {
        self.registry.render(HTML, context)
    }
}
