
use std::sync::LazyLock;

use fancy_regex::Regex;

use crate::{AssistantError, Result};

static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("valid regex"));

/// Text with `{{name}}` placeholders filled in at render time.
///
/// Substituted values are inserted verbatim and never scanned for further
/// placeholders, so user text containing braces is passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    #[inline]
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Substitute every placeholder; a placeholder without a value is an error
    #[inline]
    pub fn render(&self, variables: &[(&str, &str)]) -> Result<String> {
        let mut rendered = String::with_capacity(self.template.len());
        let mut last_end = 0;

        for captures in PLACEHOLDER_REGEX.captures_iter(&self.template) {
            let captures = captures
                .map_err(|e| AssistantError::Template(format!("Failed to scan template: {}", e)))?;
            let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
                continue;
            };

            let value = variables
                .iter()
                .find(|(key, _)| *key == name.as_str())
                .map(|(_, value)| *value)
                .ok_or_else(|| {
                    AssistantError::Template(format!(
                        "No value supplied for placeholder '{}'",
                        name.as_str()
                    ))
                })?;

            rendered.push_str(self.template.get(last_end..whole.start()).unwrap_or_default());
            rendered.push_str(value);
            last_end = whole.end();
        }

        rendered.push_str(self.template.get(last_end..).unwrap_or_default());
        Ok(rendered)
    }
}
