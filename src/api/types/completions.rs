//! Legacy completions types
//!
//! `POST /v1/completions` is kept for old clients; the prompt is rewritten
//! into a single user message and the request delegates to the chat route.

use serde::{Deserialize, Serialize};

use super::chat::{ChatCompletionRequest, ChatMessage, ChatMessageRole, MessageContent, StopSequence};

/// Prompt - string or array of strings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PromptInput {
    Single(String),
    Multiple(Vec<String>),
}

impl PromptInput {
    /// Join multi-part prompts with newlines.
    pub fn to_text(&self) -> String {
        match self {
            Self::Single(prompt) => prompt.clone(),
            Self::Multiple(prompts) => prompts.join("\n"),
        }
    }
}

/// Legacy completion request (OpenAI format)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: PromptInput,
    #[serde(default)]
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<StopSequence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
}

impl CompletionRequest {
    /// Rewrite into a chat-completion request with one user message.
    pub fn into_chat_request(self) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model,
            messages: vec![ChatMessage {
                role: ChatMessageRole::User,
                content: Some(MessageContent::Text(self.prompt.to_text())),
                name: None,
            }],
            temperature: self.temperature,
            top_p: self.top_p,
            stream: self.stream,
            stop: self.stop,
            max_tokens: self.max_tokens,
            presence_penalty: self.presence_penalty,
            frequency_penalty: self.frequency_penalty,
            user: self.user,
            seed: self.seed,
        }
    }
}
