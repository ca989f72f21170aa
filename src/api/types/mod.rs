//! OpenAI-compatible API types
//!
//! These types mirror the OpenAI API format for compatibility.

pub mod chat;
pub mod completions;
pub mod embeddings;
pub mod error;
pub mod json;
pub mod models;
pub mod responses;

pub use chat::{
    ChatCompletionChoice, ChatCompletionRequest, ChatCompletionResponse,
    ChatCompletionStreamChoice, ChatCompletionStreamResponse, ChatMessage, ChatMessageRole,
    ContentPart, DeltaContent, MessageContent, StopSequence,
};
pub use completions::{CompletionRequest, PromptInput};
pub use embeddings::{EmbeddingObject, EmbeddingsInput, EmbeddingsRequest, EmbeddingsResponse};
pub use error::{ApiError, ApiErrorResponse};
pub use json::Json;
pub use models::{ModelsResponse, OkResponse};
pub use responses::{
    ResponsesEvent, ResponsesInput, ResponsesRequest, ResponsesResponse, ResponsesStreamEvents,
    ResponsesUsage,
};
