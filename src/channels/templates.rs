//! Handlebars rendering of incident content.

use super::ChannelError;
use crate::core::Content;
use handlebars::{handlebars_helper, Handlebars};
use serde_json::Value;

const TEMPLATE_NAME: &str = "message";

/// Renders one channel's message template.
///
/// Templates loaded from a file are re-read on every render, so edits take
/// effect without a restart.
pub struct TemplateRenderer {
    registry: Handlebars<'static>,
}

impl TemplateRenderer {
    /// Loads a template from `path`. With `escape_html` off, values are
    /// inserted verbatim (chat markup); with it on, they are HTML-escaped.
    pub fn from_file(path: &str, escape_html: bool) -> Result<Self, ChannelError> {
        let mut registry = Self::registry(escape_html);
        registry.set_dev_mode(true);
        registry
            .register_template_file(TEMPLATE_NAME, path)
            .map_err(|e| ChannelError::Template(format!("{}: {}", path, e)))?;
        Ok(Self { registry })
    }

    /// Compiles a template from a string.
    pub fn from_source(source: &str, escape_html: bool) -> Result<Self, ChannelError> {
        let mut registry = Self::registry(escape_html);
        registry
            .register_template_string(TEMPLATE_NAME, source)
            .map_err(|e| ChannelError::Template(e.to_string()))?;
        Ok(Self { registry })
    }

    pub fn render(&self, content: &Content) -> Result<String, ChannelError> {
        self.registry
            .render(TEMPLATE_NAME, content)
            .map_err(|e| ChannelError::Template(e.to_string()))
    }

    fn registry(escape_html: bool) -> Handlebars<'static> {
        let mut registry = Handlebars::new();
        if !escape_html {
            registry.register_escape_fn(handlebars::no_escape);
        }
        register_helpers(&mut registry);
        registry
    }
}

fn register_helpers(registry: &mut Handlebars<'static>) {
    handlebars_helper!(upper: |s: str| s.to_uppercase());
    handlebars_helper!(lower: |s: str| s.to_lowercase());
    handlebars_helper!(replace: |s: str, from: str, to: str| s.replace(from, to));
    handlebars_helper!(contains: |s: str, needle: str| s.contains(needle));
    handlebars_helper!(truncate: |s: str, n: u64| s.chars().take(n as usize).collect::<String>());
    handlebars_helper!(default: |value: Value, fallback: Value| {
        let value: &Value = &value;
        match value {
            Value::Null => fallback.clone(),
            Value::String(s) if s.is_empty() => fallback.clone(),
            _ => value.clone(),
        }
    });
    handlebars_helper!(json: |value: Value| {
        serde_json::to_string(&value).unwrap_or_else(|_| "null".to_string())
    });
    handlebars_helper!(format_time: |s: str| {
        chrono::DateTime::parse_from_rfc3339(s)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|_| "Invalid time".to_string())
    });

    registry.register_helper("upper", Box::new(upper));
    registry.register_helper("lower", Box::new(lower));
    registry.register_helper("replace", Box::new(replace));
    registry.register_helper("contains", Box::new(contains));
    registry.register_helper("truncate", Box::new(truncate));
    registry.register_helper("default", Box::new(default));
    registry.register_helper("json", Box::new(json));
    registry.register_helper("format_time", Box::new(format_time));
}
