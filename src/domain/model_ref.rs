use serde::{Deserialize, Serialize};

/// A model identifier as supplied by a client, optionally carrying a
/// provider prefix (`"<provider>/<model-id>"`).
///
/// Constructed per-request from client input; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRef {
    /// Provider tag, when the raw ID contained a `/`.
    pub provider: Option<String>,
    /// The model ID with any provider prefix stripped.
    pub id: String,
}

impl ModelRef {
    /// Split a raw model ID on the first `/`.
    ///
    /// `ollama/deepseek-r1:7b` -> provider `ollama`, id `deepseek-r1:7b`.
    /// An ID without a prefix keeps its full form and implies the default
    /// provider.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once('/') {
            Some((provider, id)) => Self {
                provider: Some(provider.to_string()),
                id: id.to_string(),
            },
            None => Self {
                provider: None,
                id: raw.to_string(),
            },
        }
    }
}
