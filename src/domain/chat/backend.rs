use std::fmt::Debug;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use super::{ChatRequest, ChatResponse, StreamChunk};
use crate::domain::{GatewayError, ModelEntry};

/// Stream of translated chat chunks
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, GatewayError>> + Send>>;

/// Raw SSE bytes, forwarded without re-framing
pub type SseByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, GatewayError>> + Send>>;

/// Wire shape a backend speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// NDJSON chat lines, `/api/*` routes
    Ollama,
    /// OpenAI chat-completions JSON and SSE
    OpenAi,
}

/// An inference server the gateway forwards requests to.
#[async_trait]
pub trait InferenceBackend: Send + Sync + Debug {
    /// Provider name, used as the model-ID prefix and `owned_by` value.
    fn name(&self) -> &str;

    fn dialect(&self) -> Dialect;

    /// Fetch the backend's native model list, already mapped to list entries.
    async fn list_models(&self) -> Result<Vec<ModelEntry>, GatewayError>;

    async fn chat(&self, model: &str, request: ChatRequest) -> Result<ChatResponse, GatewayError>;

    async fn chat_stream(
        &self,
        model: &str,
        request: ChatRequest,
    ) -> Result<ChatStream, GatewayError>;

    /// Verbatim SSE passthrough for backends whose dialect already matches
    /// the gateway's chat surface. Only meaningful for `Dialect::OpenAi`.
    async fn chat_stream_raw(
        &self,
        _model: &str,
        _request: ChatRequest,
    ) -> Result<SseByteStream, GatewayError> {
        Err(GatewayError::internal(format!(
            "{} does not support SSE passthrough",
            self.name()
        )))
    }

    async fn embed(&self, model: &str, input: &[String]) -> Result<Vec<Vec<f32>>, GatewayError>;

    /// Liveness probe; true when the backend answered with a non-5xx status.
    async fn probe(&self) -> bool;
}

#[cfg(test)]
pub mod mock {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::RwLock;

    use futures::stream;

    use super::*;
    use crate::domain::Message;

    /// Scriptable backend for cache, routing and translation tests.
    #[derive(Debug)]
    pub struct MockBackend {
        name: String,
        dialect: Dialect,
        models: RwLock<Result<Vec<ModelEntry>, String>>,
        list_calls: AtomicUsize,
        chat_response: RwLock<Option<ChatResponse>>,
        chunks: RwLock<Vec<StreamChunk>>,
        up: AtomicBool,
    }

    impl MockBackend {
        pub fn new(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                dialect: Dialect::Ollama,
                models: RwLock::new(Ok(Vec::new())),
                list_calls: AtomicUsize::new(0),
                chat_response: RwLock::new(None),
                chunks: RwLock::new(Vec::new()),
                up: AtomicBool::new(true),
            }
        }

        pub fn with_dialect(mut self, dialect: Dialect) -> Self {
            self.dialect = dialect;
            self
        }

        pub fn with_models(self, models: Vec<ModelEntry>) -> Self {
            *self.models.write().unwrap() = Ok(models);
            self
        }

        pub fn with_chat_response(self, response: ChatResponse) -> Self {
            *self.chat_response.write().unwrap() = Some(response);
            self
        }

        pub fn with_chunks(self, chunks: Vec<StreamChunk>) -> Self {
            *self.chunks.write().unwrap() = chunks;
            self
        }

        pub fn set_models(&self, models: Vec<ModelEntry>) {
            *self.models.write().unwrap() = Ok(models);
        }

        pub fn set_models_error(&self, message: impl Into<String>) {
            *self.models.write().unwrap() = Err(message.into());
        }

        pub fn list_calls(&self) -> usize {
            self.list_calls.load(Ordering::SeqCst)
        }

        pub fn set_up(&self, up: bool) {
            self.up.store(up, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl InferenceBackend for MockBackend {
        fn name(&self) -> &str {
            &self.name
        }

        fn dialect(&self) -> Dialect {
            self.dialect
        }

        async fn list_models(&self) -> Result<Vec<ModelEntry>, GatewayError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            match &*self.models.read().unwrap() {
                Ok(models) => Ok(models.clone()),
                Err(message) => Err(GatewayError::unreachable(&self.name, message)),
            }
        }

        async fn chat(
            &self,
            model: &str,
            _request: ChatRequest,
        ) -> Result<ChatResponse, GatewayError> {
            self.chat_response
                .read()
                .unwrap()
                .clone()
                .map(Ok)
                .unwrap_or_else(|| {
                    Ok(ChatResponse::new(model, Message::assistant("mock reply")))
                })
        }

        async fn chat_stream(
            &self,
            _model: &str,
            _request: ChatRequest,
        ) -> Result<ChatStream, GatewayError> {
            let chunks: Vec<Result<StreamChunk, GatewayError>> = self
                .chunks
                .read()
                .unwrap()
                .iter()
                .cloned()
                .map(Ok)
                .collect();
            Ok(Box::pin(stream::iter(chunks)))
        }

        async fn embed(
            &self,
            _model: &str,
            input: &[String],
        ) -> Result<Vec<Vec<f32>>, GatewayError> {
            Ok(input.iter().map(|_| vec![0.0, 0.1, 0.2]).collect())
        }

        async fn probe(&self) -> bool {
            self.up.load(Ordering::SeqCst)
        }
    }
}
