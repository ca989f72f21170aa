use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};

use super::{CHAT_TIMEOUT, EMBED_TIMEOUT, LIST_TIMEOUT, PROBE_TIMEOUT, STREAM_TIMEOUT};
use crate::domain::{
    ChatRequest, ChatResponse, ChatStream, Dialect, FinishReason, GatewayError, InferenceBackend,
    Message, ModelEntry, SseByteStream, StreamChunk, Usage,
};
use crate::infrastructure::http_client::HttpClientTrait;
use crate::infrastructure::sse::SseLineBuffer;

/// Generic OpenAI-compatible backend adapter.
///
/// Chat requests need no re-framing; the streaming body can be proxied
/// verbatim via `chat_stream_raw`. The parsed `chat_stream` exists for
/// translators that consume chunks (the Responses API path).
#[derive(Debug)]
pub struct OpenAiBackend<C: HttpClientTrait> {
    client: C,
    name: String,
    base_url: String,
    auth_header: Option<String>,
}

impl<C: HttpClientTrait> OpenAiBackend<C> {
    pub fn new(
        client: C,
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_header: api_key.map(|key| format!("Bearer {}", key)),
        }
    }

    fn models_url(&self) -> String {
        format!("{}/v1/models", self.base_url)
    }

    fn chat_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn embeddings_url(&self) -> String {
        format!("{}/v1/embeddings", self.base_url)
    }

    fn health_url(&self) -> String {
        format!("{}/health", self.base_url)
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        match &self.auth_header {
            Some(auth) => vec![("Authorization", auth.as_str())],
            None => Vec::new(),
        }
    }

    fn build_chat_body(&self, model: &str, request: &ChatRequest, stream: bool) -> Value {
        let mut body = json!({
            "model": model,
            "messages": request.messages,
            "stream": stream,
        });

        let sampling = &request.options;
        if let Some(temperature) = sampling.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(top_p) = sampling.top_p {
            body["top_p"] = json!(top_p);
        }
        if let Some(max_tokens) = sampling.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if let Some(ref stop) = sampling.stop {
            body["stop"] = json!(stop);
        }
        if let Some(penalty) = sampling.presence_penalty {
            body["presence_penalty"] = json!(penalty);
        }
        if let Some(penalty) = sampling.frequency_penalty {
            body["frequency_penalty"] = json!(penalty);
        }
        if let Some(seed) = sampling.seed {
            body["seed"] = json!(seed);
        }

        body
    }
}

#[async_trait]
impl<C: HttpClientTrait> InferenceBackend for OpenAiBackend<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn dialect(&self) -> Dialect {
        Dialect::OpenAi
    }

    async fn list_models(&self) -> Result<Vec<ModelEntry>, GatewayError> {
        let json = self
            .client
            .get_json(&self.models_url(), self.headers(), LIST_TIMEOUT)
            .await?;

        let mut entries = Vec::new();
        if let Some(models) = json["data"].as_array() {
            for model in models {
                let id = model["id"].as_str().unwrap_or_default();
                if id.is_empty() {
                    continue;
                }
                entries.push(ModelEntry::new(
                    format!("{}/{}", self.name, id),
                    model["created"].as_i64().unwrap_or(0),
                    &self.name,
                ));
            }
        }

        Ok(entries)
    }

    async fn chat(&self, model: &str, request: ChatRequest) -> Result<ChatResponse, GatewayError> {
        let body = self.build_chat_body(model, &request, false);
        let json = self
            .client
            .post_json(&self.chat_url(), self.headers(), &body, CHAT_TIMEOUT)
            .await?;

        let choice = &json["choices"][0];
        let content = choice["message"]["content"].as_str().unwrap_or_default();

        let mut response = ChatResponse::new(model, Message::assistant(content))
            .with_finish_reason(parse_finish_reason(choice["finish_reason"].as_str()));

        // usage passes through verbatim for an already-OpenAI-shaped backend
        if json["usage"].is_object() {
            response = response.with_usage(Usage {
                prompt_tokens: json["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
                completion_tokens: json["usage"]["completion_tokens"].as_u64().unwrap_or(0)
                    as u32,
                total_tokens: json["usage"]["total_tokens"].as_u64().unwrap_or(0) as u32,
            });
        }

        Ok(response)
    }

    async fn chat_stream(
        &self,
        model: &str,
        request: ChatRequest,
    ) -> Result<ChatStream, GatewayError> {
        let body = self.build_chat_body(model, &request, true);
        let bytes = self
            .client
            .post_json_stream(&self.chat_url(), self.headers(), &body, STREAM_TIMEOUT)
            .await?;

        let mut buffer = SseLineBuffer::new();
        let stream = bytes
            .map(|result| result.map(Some))
            .chain(futures::stream::once(async { Ok(None) }))
            .map(move |result| {
                let chunks: Vec<Result<StreamChunk, GatewayError>> = match result {
                    Ok(Some(bytes)) => buffer
                        .push(&bytes)
                        .iter()
                        .filter_map(|payload| parse_chunk_payload(payload))
                        .map(Ok)
                        .collect(),
                    Ok(None) => buffer
                        .flush()
                        .and_then(|payload| parse_chunk_payload(&payload))
                        .map(Ok)
                        .into_iter()
                        .collect(),
                    Err(e) => vec![Err(e)],
                };
                futures::stream::iter(chunks)
            })
            .flatten();

        Ok(Box::pin(stream))
    }

    async fn chat_stream_raw(
        &self,
        model: &str,
        request: ChatRequest,
    ) -> Result<SseByteStream, GatewayError> {
        let body = self.build_chat_body(model, &request, true);
        self.client
            .post_json_stream(&self.chat_url(), self.headers(), &body, STREAM_TIMEOUT)
            .await
    }

    async fn embed(&self, model: &str, input: &[String]) -> Result<Vec<Vec<f32>>, GatewayError> {
        let body = json!({ "model": model, "input": input });
        let json = self
            .client
            .post_json(&self.embeddings_url(), self.headers(), &body, EMBED_TIMEOUT)
            .await?;

        let mut rows: Vec<(i64, Vec<f32>)> = Vec::new();
        if let Some(data) = json["data"].as_array() {
            for item in data {
                let vector = item["embedding"]
                    .as_array()
                    .map(|xs| {
                        xs.iter()
                            .map(|x| x.as_f64().unwrap_or(0.0) as f32)
                            .collect()
                    })
                    .unwrap_or_default();
                rows.push((item["index"].as_i64().unwrap_or(rows.len() as i64), vector));
            }
        }
        rows.sort_by_key(|(index, _)| *index);

        Ok(rows.into_iter().map(|(_, vector)| vector).collect())
    }

    async fn probe(&self) -> bool {
        matches!(
            self.client.get_status(&self.health_url(), PROBE_TIMEOUT).await,
            Ok(status) if status < 500
        )
    }
}

/// Parse one chat-completion SSE payload into a chunk. The `[DONE]` sentinel
/// yields nothing; stream completion is signalled by the stream ending.
fn parse_chunk_payload(payload: &str) -> Option<StreamChunk> {
    if payload.trim() == "[DONE]" {
        return None;
    }

    let value: Value = serde_json::from_str(payload).ok()?;
    let choice = &value["choices"][0];

    let mut chunk = StreamChunk::default();
    if let Some(delta) = choice["delta"]["content"].as_str() {
        if !delta.is_empty() {
            chunk.delta = Some(delta.to_string());
        }
    }
    if let Some(reason) = choice["finish_reason"].as_str() {
        chunk.finish_reason = Some(parse_finish_reason(Some(reason)));
    }
    if value["usage"].is_object() {
        chunk.usage = Some(Usage {
            prompt_tokens: value["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
            completion_tokens: value["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
            total_tokens: value["usage"]["total_tokens"].as_u64().unwrap_or(0) as u32,
        });
    }

    if chunk == StreamChunk::default() {
        None
    } else {
        Some(chunk)
    }
}

fn parse_finish_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("length") => FinishReason::Length,
        Some("content_filter") => FinishReason::ContentFilter,
        Some("tool_calls") | Some("function_call") => FinishReason::ToolCalls,
        _ => FinishReason::Stop,
    }
}
