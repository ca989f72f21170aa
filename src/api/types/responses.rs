//! OpenAI Responses API types
//!
//! Requests are rewritten into chat requests; replies are reshaped from the
//! chat translation, as one message item with one `output_text` part.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::chat::{ChatCompletionRequest, ChatMessage, ChatMessageRole, MessageContent};
use crate::domain::Usage;

/// Content of a Responses input item - plain text or typed parts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponsesContent {
    Text(String),
    Parts(Vec<ResponsesContentPart>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsesContentPart {
    InputText { text: String },
    OutputText { text: String },
    Text { text: String },
    #[serde(other)]
    Unsupported,
}

impl ResponsesContent {
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ResponsesContentPart::InputText { text }
                    | ResponsesContentPart::OutputText { text }
                    | ResponsesContentPart::Text { text } => Some(text.as_str()),
                    ResponsesContentPart::Unsupported => None,
                })
                .collect(),
        }
    }
}

/// One role/content item of a Responses `input` array
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsesInputItem {
    pub role: String,
    pub content: ResponsesContent,
}

/// Responses `input` - a bare string or a list of items
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponsesInput {
    Text(String),
    Items(Vec<ResponsesInputItem>),
}

/// Responses API request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsesRequest {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    pub input: ResponsesInput,
    #[serde(default)]
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

impl ResponsesRequest {
    /// Rewrite into a chat request: `instructions` becomes a system message,
    /// each input item becomes a message with flattened content.
    pub fn into_chat_request(self) -> ChatCompletionRequest {
        let mut messages = Vec::new();

        if let Some(instructions) = self.instructions {
            messages.push(ChatMessage {
                role: ChatMessageRole::System,
                content: Some(MessageContent::Text(instructions)),
                name: None,
            });
        }

        match self.input {
            ResponsesInput::Text(text) => messages.push(ChatMessage {
                role: ChatMessageRole::User,
                content: Some(MessageContent::Text(text)),
                name: None,
            }),
            ResponsesInput::Items(items) => {
                for item in items {
                    messages.push(ChatMessage {
                        role: parse_role(&item.role),
                        content: Some(MessageContent::Text(item.content.to_text())),
                        name: None,
                    });
                }
            }
        }

        ChatCompletionRequest {
            model: self.model,
            messages,
            temperature: self.temperature,
            top_p: self.top_p,
            stream: self.stream,
            stop: None,
            max_tokens: self.max_output_tokens,
            presence_penalty: None,
            frequency_penalty: None,
            user: None,
            seed: None,
        }
    }
}

fn parse_role(role: &str) -> ChatMessageRole {
    match role {
        "system" | "developer" => ChatMessageRole::System,
        "assistant" => ChatMessageRole::Assistant,
        "tool" => ChatMessageRole::Tool,
        _ => ChatMessageRole::User,
    }
}

/// Usage in Responses naming (`input_tokens`/`output_tokens`)
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ResponsesUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

impl From<Usage> for ResponsesUsage {
    fn from(usage: Usage) -> Self {
        Self {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }
    }
}

/// Non-streaming Responses API reply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsesResponse {
    pub id: String,
    pub object: String,
    pub created_at: i64,
    pub model: String,
    pub status: String,
    pub output: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<ResponsesUsage>,
}

impl ResponsesResponse {
    pub fn completed(
        request_id: &str,
        model: &str,
        text: &str,
        usage: Option<Usage>,
    ) -> Self {
        Self {
            id: format!("resp-{}", request_id),
            object: "response".to_string(),
            created_at: chrono::Utc::now().timestamp(),
            model: model.to_string(),
            status: "completed".to_string(),
            output: vec![message_item(&format!("msg-{}", request_id), text, "completed")],
            usage: usage.map(ResponsesUsage::from),
        }
    }
}

fn message_item(item_id: &str, text: &str, status: &str) -> Value {
    json!({
        "id": item_id,
        "type": "message",
        "role": "assistant",
        "status": status,
        "content": [{"type": "output_text", "text": text, "annotations": []}],
    })
}

/// One server-sent event of the streaming Responses translation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponsesEvent {
    pub name: &'static str,
    pub payload: Value,
}

/// Builds the fixed Responses lifecycle event sequence with strictly
/// increasing sequence numbers.
#[derive(Debug)]
pub struct ResponsesStreamEvents {
    response_id: String,
    item_id: String,
    model: String,
    seq: u64,
}

impl ResponsesStreamEvents {
    pub fn new(request_id: &str, model: &str) -> Self {
        Self {
            response_id: format!("resp-{}", request_id),
            item_id: format!("msg-{}", request_id),
            model: model.to_string(),
            seq: 0,
        }
    }

    fn event(&mut self, name: &'static str, mut payload: Value) -> ResponsesEvent {
        payload["type"] = json!(name);
        payload["sequence_number"] = json!(self.seq);
        self.seq += 1;
        ResponsesEvent { name, payload }
    }

    pub fn created(&mut self) -> ResponsesEvent {
        let payload = json!({
            "response": {
                "id": self.response_id,
                "object": "response",
                "model": self.model,
                "status": "in_progress",
                "output": [],
            },
        });
        self.event("response.created", payload)
    }

    pub fn output_item_added(&mut self) -> ResponsesEvent {
        let payload = json!({
            "output_index": 0,
            "item": {
                "id": self.item_id,
                "type": "message",
                "role": "assistant",
                "status": "in_progress",
                "content": [],
            },
        });
        self.event("response.output_item.added", payload)
    }

    pub fn content_part_added(&mut self) -> ResponsesEvent {
        let payload = json!({
            "item_id": self.item_id,
            "output_index": 0,
            "content_index": 0,
            "part": {"type": "output_text", "text": "", "annotations": []},
        });
        self.event("response.content_part.added", payload)
    }

    pub fn output_text_delta(&mut self, delta: &str) -> ResponsesEvent {
        let payload = json!({
            "item_id": self.item_id,
            "output_index": 0,
            "content_index": 0,
            "delta": delta,
        });
        self.event("response.output_text.delta", payload)
    }

    pub fn output_text_done(&mut self, text: &str) -> ResponsesEvent {
        let payload = json!({
            "item_id": self.item_id,
            "output_index": 0,
            "content_index": 0,
            "text": text,
        });
        self.event("response.output_text.done", payload)
    }

    pub fn content_part_done(&mut self, text: &str) -> ResponsesEvent {
        let payload = json!({
            "item_id": self.item_id,
            "output_index": 0,
            "content_index": 0,
            "part": {"type": "output_text", "text": text, "annotations": []},
        });
        self.event("response.content_part.done", payload)
    }

    pub fn output_item_done(&mut self, text: &str) -> ResponsesEvent {
        let item = message_item(&self.item_id, text, "completed");
        let payload = json!({"output_index": 0, "item": item});
        self.event("response.output_item.done", payload)
    }

    pub fn done(&mut self, text: &str, usage: Option<Usage>) -> ResponsesEvent {
        let item = message_item(&self.item_id, text, "completed");
        let mut response = json!({
            "id": self.response_id,
            "object": "response",
            "model": self.model,
            "status": "completed",
            "output": [item],
        });
        if let Some(usage) = usage {
            let usage = ResponsesUsage::from(usage);
            response["usage"] = json!({
                "input_tokens": usage.input_tokens,
                "output_tokens": usage.output_tokens,
                "total_tokens": usage.total_tokens,
            });
        }
        self.event("response.done", json!({"response": response}))
    }
}
