//! Prompt template rendering.
//!
//! Templates carry `{name}` placeholders where `name` is an identifier.
//! Rendering is total: a placeholder with no bound value renders as the
//! empty string, exactly like one bound to `""`. Braces that do not enclose
//! an identifier (JSON examples, prose) are left alone.

use regex_lite::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
});

/// Values substituted into a template, keyed by placeholder name.
#[derive(Debug, Clone, Default)]
pub struct TemplateVars {
    values: HashMap<&'static str, String>,
}

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a placeholder to a value.
    pub fn set(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.values.insert(key, value.into());
        self
    }

    /// Bind a placeholder when a value exists.
    pub fn set_opt(self, key: &'static str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(v) => self.set(key, v),
            None => self,
        }
    }
}

/// Substitute every placeholder in `template`.
pub fn render(template: &str, vars: &TemplateVars) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            vars.values
                .get(&caps[1])
                .map(String::as_str)
                .unwrap_or_default()
                .to_string()
        })
        .into_owned()
}
