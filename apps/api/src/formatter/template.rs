//! Prompt template: validated once at startup, rendered once per alert.
//!
//! Rendering is a single explicit substitution: the template is split at its one
//! `{alert_data}` placeholder when it is parsed, and each render concatenates
//! `prefix + alert data + suffix`. Alert data is never re-scanned, so payloads
//! that happen to contain braces (or the placeholder itself) pass through verbatim.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::formatter::prompts::{ALERT_DATA_PLACEHOLDER, SRE_ANALYSIS_TEMPLATE};
use crate::formatter::AlertData;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("prompt template is missing the {{alert_data}} placeholder")]
    MissingPlaceholder,

    #[error("prompt template contains {count} {{alert_data}} placeholders, expected exactly one")]
    DuplicatePlaceholder { count: usize },

    #[error("failed to read prompt template {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A prompt with the alert data substituted in. Sent to the backend once, then dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt(String);

impl RenderedPrompt {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A validated prompt template holding exactly one substitution point.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    prefix: String,
    suffix: String,
}

impl PromptTemplate {
    /// The built-in SRE analysis template.
    pub fn builtin() -> Result<Self, TemplateError> {
        Self::parse(SRE_ANALYSIS_TEMPLATE)
    }

    /// Loads a template override from disk (`PROMPT_TEMPLATE_PATH`).
    pub fn from_file(path: &Path) -> Result<Self, TemplateError> {
        let text = std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, TemplateError> {
        let count = text.matches(ALERT_DATA_PLACEHOLDER).count();
        match count {
            0 => Err(TemplateError::MissingPlaceholder),
            1 => {
                let (prefix, rest) = text
                    .split_once(ALERT_DATA_PLACEHOLDER)
                    .ok_or(TemplateError::MissingPlaceholder)?;
                Ok(Self {
                    prefix: prefix.to_string(),
                    suffix: rest.to_string(),
                })
            }
            count => Err(TemplateError::DuplicatePlaceholder { count }),
        }
    }

    pub fn render(&self, alert: &AlertData) -> RenderedPrompt {
        let data = alert.as_str();
        let mut out = String::with_capacity(self.prefix.len() + data.len() + self.suffix.len());
        out.push_str(&self.prefix);
        out.push_str(data);
        out.push_str(&self.suffix);
        RenderedPrompt(out)
    }
}
