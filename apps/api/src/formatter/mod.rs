// Alert Formatter: render the SRE prompt, call the backend chain, shape the answer.
// All backend calls go through llm_client; nothing here speaks HTTP to a provider.

pub mod handlers;
pub mod pipeline;
pub mod prompts;
pub mod sections;
pub mod template;
pub mod validate;

use serde_json::Value;

pub use pipeline::{AlertFormatter, AnalysisResult, FormatterError, RetryPolicy};
pub use template::PromptTemplate;

/// Raw alert payload supplied by the caller. No structure is assumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertData(String);

impl AlertData {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// A JSON string is taken as-is; any other value is serialized compactly.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::String(text) => Self::new(text.as_str()),
            other => Self::new(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
