//! Backend-neutral chat types and the backend seam

pub mod backend;
pub mod message;
pub mod request;
pub mod response;

pub use backend::{ChatStream, Dialect, InferenceBackend, SseByteStream};
pub use message::{Message, MessageRole};
pub use request::{ChatRequest, ChatRequestBuilder, SamplingOptions};
pub use response::{ChatResponse, EvalStats, FinishReason, StreamChunk, Usage};
