//! Domain layer - backend-neutral types and seams

pub mod chat;
pub mod error;
pub mod model_entry;
pub mod model_ref;

pub use chat::{
    ChatRequest, ChatRequestBuilder, ChatResponse, ChatStream, Dialect, EvalStats, FinishReason,
    InferenceBackend, Message, MessageRole, SamplingOptions, SseByteStream, StreamChunk, Usage,
};
pub use error::GatewayError;
pub use model_entry::ModelEntry;
pub use model_ref::ModelRef;
