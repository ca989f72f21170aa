use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};
use tracing::debug;

use super::{CHAT_TIMEOUT, EMBED_TIMEOUT, LIST_TIMEOUT, PROBE_TIMEOUT, STREAM_TIMEOUT};
use crate::domain::{
    ChatRequest, ChatResponse, ChatStream, Dialect, EvalStats, FinishReason, GatewayError,
    InferenceBackend, Message, ModelEntry, StreamChunk, Usage,
};
use crate::infrastructure::http_client::HttpClientTrait;

/// Ollama-dialect backend adapter.
///
/// Speaks `/api/tags`, `/api/chat`, `/api/embed` and `/api/version`, and
/// translates the NDJSON chat stream into clean per-token deltas.
#[derive(Debug)]
pub struct OllamaBackend<C: HttpClientTrait> {
    client: C,
    name: String,
    base_url: String,
}

impl<C: HttpClientTrait> OllamaBackend<C> {
    pub fn new(client: C, name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn tags_url(&self) -> String {
        format!("{}/api/tags", self.base_url)
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    fn embed_url(&self) -> String {
        format!("{}/api/embed", self.base_url)
    }

    fn version_url(&self) -> String {
        format!("{}/api/version", self.base_url)
    }

    fn build_chat_body(&self, model: &str, request: &ChatRequest, stream: bool) -> Value {
        let mut body = json!({
            "model": model,
            "messages": request.messages,
            "stream": stream,
        });

        let mut options = serde_json::Map::new();
        let sampling = &request.options;
        if let Some(temperature) = sampling.temperature {
            options.insert("temperature".into(), json!(temperature));
        }
        if let Some(top_p) = sampling.top_p {
            options.insert("top_p".into(), json!(top_p));
        }
        if let Some(max_tokens) = sampling.max_tokens {
            options.insert("num_predict".into(), json!(max_tokens));
        }
        if let Some(ref stop) = sampling.stop {
            options.insert("stop".into(), json!(stop));
        }
        if let Some(penalty) = sampling.presence_penalty {
            options.insert("presence_penalty".into(), json!(penalty));
        }
        if let Some(penalty) = sampling.frequency_penalty {
            options.insert("frequency_penalty".into(), json!(penalty));
        }
        if let Some(seed) = sampling.seed {
            options.insert("seed".into(), json!(seed));
        }
        if !options.is_empty() {
            body["options"] = Value::Object(options);
        }

        body
    }

    fn parse_chat_response(&self, model: &str, json: Value) -> ChatResponse {
        let content = flatten_content(&json["message"]["content"]);
        let prompt_tokens = json["prompt_eval_count"].as_u64().unwrap_or(0) as u32;
        let eval_count = json["eval_count"].as_u64().unwrap_or(0);
        let eval_duration = json["eval_duration"].as_u64().unwrap_or(0);

        let mut response = ChatResponse::new(model, Message::assistant(content))
            .with_finish_reason(parse_done_reason(json["done_reason"].as_str()))
            .with_usage(Usage::new(prompt_tokens, eval_count as u32));

        if eval_count > 0 && eval_duration > 0 {
            response = response.with_eval(EvalStats {
                eval_count,
                eval_duration_ns: eval_duration,
            });
        }

        response
    }
}

#[async_trait]
impl<C: HttpClientTrait> InferenceBackend for OllamaBackend<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn dialect(&self) -> Dialect {
        Dialect::Ollama
    }

    async fn list_models(&self) -> Result<Vec<ModelEntry>, GatewayError> {
        let json = self
            .client
            .get_json(&self.tags_url(), Vec::new(), LIST_TIMEOUT)
            .await?;

        let mut entries = Vec::new();
        if let Some(models) = json["models"].as_array() {
            for model in models {
                let name = model["name"].as_str().unwrap_or_default();
                if name.is_empty() {
                    continue;
                }
                entries.push(ModelEntry::new(
                    format!("{}/{}", self.name, name),
                    parse_modified_at(&model["modified_at"]),
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
            .post_json(&self.chat_url(), Vec::new(), &body, CHAT_TIMEOUT)
            .await?;

        Ok(self.parse_chat_response(model, json))
    }

    async fn chat_stream(
        &self,
        model: &str,
        request: ChatRequest,
    ) -> Result<ChatStream, GatewayError> {
        let body = self.build_chat_body(model, &request, true);
        let bytes = self
            .client
            .post_json_stream(&self.chat_url(), Vec::new(), &body, STREAM_TIMEOUT)
            .await?;

        let mut session = StreamSession::default();
        let stream = bytes
            .map(|result| result.map(Some))
            .chain(futures::stream::once(async { Ok(None) }))
            .map(move |result| {
                let items = match result {
                    Ok(Some(bytes)) => session.feed(&bytes),
                    Ok(None) => session.finish(),
                    Err(e) => vec![Err(e)],
                };
                futures::stream::iter(items)
            })
            .flatten();

        Ok(Box::pin(stream))
    }

    async fn embed(&self, model: &str, input: &[String]) -> Result<Vec<Vec<f32>>, GatewayError> {
        let body = json!({ "model": model, "input": input });
        let json = self
            .client
            .post_json(&self.embed_url(), Vec::new(), &body, EMBED_TIMEOUT)
            .await?;

        let embeddings = json["embeddings"]
            .as_array()
            .map(|rows| {
                rows.iter()
                    .map(|row| {
                        row.as_array()
                            .map(|xs| {
                                xs.iter()
                                    .map(|x| x.as_f64().unwrap_or(0.0) as f32)
                                    .collect()
                            })
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(embeddings)
    }

    async fn probe(&self) -> bool {
        matches!(
            self.client.get_status(&self.version_url(), PROBE_TIMEOUT).await,
            Ok(status) if status < 500
        )
    }
}

/// Whether a stream sends the full running message each line or only the new
/// tail. Backend versions differ, so the mode is learned per stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum DeltaMode {
    #[default]
    Unknown,
    Cumulative,
    Incremental,
}

/// Derives clean deltas from a stream whose framing mode is not known up
/// front. A superset check against the text seen so far decides the mode on
/// the second non-empty observation; empty content never changes the mode.
#[derive(Debug, Default)]
pub struct DeltaTracker {
    mode: DeltaMode,
    seen: String,
}

impl DeltaTracker {
    pub fn advance(&mut self, content: &str) -> String {
        if content.is_empty() {
            return String::new();
        }

        match self.mode {
            DeltaMode::Unknown => {
                if self.seen.is_empty() {
                    self.seen = content.to_string();
                    content.to_string()
                } else if content.len() >= self.seen.len() && content.starts_with(&self.seen) {
                    self.mode = DeltaMode::Cumulative;
                    let delta = content[self.seen.len()..].to_string();
                    self.seen = content.to_string();
                    delta
                } else {
                    self.mode = DeltaMode::Incremental;
                    self.seen.push_str(content);
                    content.to_string()
                }
            }
            DeltaMode::Cumulative => {
                if content.len() >= self.seen.len() && content.starts_with(&self.seen) {
                    let delta = content[self.seen.len()..].to_string();
                    self.seen = content.to_string();
                    delta
                } else {
                    // framing changed mid-stream; passing the text through
                    // beats dropping it
                    self.seen = content.to_string();
                    content.to_string()
                }
            }
            DeltaMode::Incremental => {
                self.seen.push_str(content);
                content.to_string()
            }
        }
    }
}

/// Per-request streaming state: reassembles NDJSON lines split across reads,
/// tracks the delta mode and captures the terminal evaluation counters.
#[derive(Debug, Default)]
pub struct StreamSession {
    line_buf: Vec<u8>,
    tracker: DeltaTracker,
}

impl StreamSession {
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Result<StreamChunk, GatewayError>> {
        self.line_buf.extend_from_slice(bytes);

        let mut chunks = Vec::new();
        while let Some(pos) = self.line_buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.line_buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(chunk) = self.translate_line(&line) {
                chunks.push(Ok(chunk));
            }
        }
        chunks
    }

    pub fn finish(&mut self) -> Vec<Result<StreamChunk, GatewayError>> {
        if self.line_buf.is_empty() {
            return Vec::new();
        }
        let rest = std::mem::take(&mut self.line_buf);
        let line = String::from_utf8_lossy(&rest);
        self.translate_line(&line).map(Ok).into_iter().collect()
    }

    fn translate_line(&mut self, line: &str) -> Option<StreamChunk> {
        let line = line.trim();
        if line.is_empty() || line == "data: [DONE]" {
            return None;
        }

        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(_) => {
                debug!("skipping malformed stream line");
                return None;
            }
        };

        let done = value["done"].as_bool().unwrap_or(false);
        let content = flatten_content(&value["message"]["content"]);
        let delta = self.tracker.advance(&content);

        if delta.is_empty() && !done {
            return None;
        }

        let mut chunk = StreamChunk::default();
        if !delta.is_empty() {
            chunk.delta = Some(delta);
        }
        if done {
            chunk.finish_reason = Some(parse_done_reason(value["done_reason"].as_str()));

            let prompt_tokens = value["prompt_eval_count"].as_u64().unwrap_or(0) as u32;
            let eval_count = value["eval_count"].as_u64().unwrap_or(0);
            let eval_duration = value["eval_duration"].as_u64().unwrap_or(0);
            if prompt_tokens > 0 || eval_count > 0 {
                chunk.usage = Some(Usage::new(prompt_tokens, eval_count as u32));
            }
            if eval_count > 0 && eval_duration > 0 {
                chunk.eval = Some(EvalStats {
                    eval_count,
                    eval_duration_ns: eval_duration,
                });
            }
        }

        Some(chunk)
    }
}

/// Flatten message content that may be a string or a list of typed parts.
fn flatten_content(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(parts) => parts
            .iter()
            .map(|part| match part {
                Value::String(text) => text.as_str(),
                Value::Object(_) => part["text"].as_str().unwrap_or(""),
                _ => "",
            })
            .collect(),
        _ => String::new(),
    }
}

fn parse_done_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("length") => FinishReason::Length,
        _ => FinishReason::Stop,
    }
}

fn parse_modified_at(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n.as_i64().unwrap_or(0),
        Value::String(s) => chrono::DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.timestamp())
            .unwrap_or(0),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use futures::StreamExt;

    use super::*;
    use crate::infrastructure::http_client::mock::MockHttpClient;

    const TAGS_URL: &str = "http://ollama:11434/api/tags";
    const CHAT_URL: &str = "http://ollama:11434/api/chat";

    fn backend(client: MockHttpClient) -> OllamaBackend<MockHttpClient> {
        OllamaBackend::new(client, "ollama", "http://ollama:11434")
    }

    #[test]
    fn test_delta_tracker_cumulative() {
        let mut tracker = DeltaTracker::default();
        assert_eq!(tracker.advance("Hi"), "Hi");
        assert_eq!(tracker.advance("Hi there"), " there");
        assert_eq!(tracker.advance("Hi there!"), "!");
    }

    #[test]
    fn test_delta_tracker_incremental() {
        let mut tracker = DeltaTracker::default();
        assert_eq!(tracker.advance("Hello"), "Hello");
        assert_eq!(tracker.advance(" wor"), " wor");
        assert_eq!(tracker.advance("ld"), "ld");
    }

    #[test]
    fn test_delta_tracker_ignores_empty_content() {
        let mut tracker = DeltaTracker::default();
        assert_eq!(tracker.advance("Hi"), "Hi");
        assert_eq!(tracker.advance(""), "");
        // mode still undecided, cumulative continuation works
        assert_eq!(tracker.advance("Hi!"), "!");
    }

    #[test]
    fn test_session_reassembles_split_lines() {
        let mut session = StreamSession::default();

        let first = session.feed(br#"{"message": {"content"#);
        assert!(first.is_empty());

        let second = session.feed(b"\": \"Hi\"}, \"done\": false}\n");
        assert_eq!(second.len(), 1);
        let chunk = second[0].as_ref().unwrap();
        assert_eq!(chunk.delta.as_deref(), Some("Hi"));
    }

    #[test]
    fn test_session_skips_malformed_lines() {
        let mut session = StreamSession::default();
        let chunks = session.feed(
            b"not json at all\n{\"message\": {\"content\": \"ok\"}, \"done\": false}\n",
        );
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap().delta.as_deref(), Some("ok"));
    }

    #[test]
    fn test_session_captures_terminal_counters() {
        let mut session = StreamSession::default();
        let chunks = session.feed(
            br#"{"message": {"content": ""}, "done": true, "eval_count": 2, "eval_duration": 500000000, "prompt_eval_count": 7}
"#,
        );
        assert_eq!(chunks.len(), 1);
        let chunk = chunks[0].as_ref().unwrap();
        assert_eq!(chunk.finish_reason, Some(FinishReason::Stop));
        assert_eq!(
            chunk.eval,
            Some(EvalStats {
                eval_count: 2,
                eval_duration_ns: 500_000_000
            })
        );
        assert_eq!(chunk.usage.unwrap().prompt_tokens, 7);
    }

    #[test]
    fn test_session_flattens_part_lists() {
        let mut session = StreamSession::default();
        let chunks = session.feed(
            br#"{"message": {"content": [{"type": "text", "text": "a"}, {"type": "text", "text": "b"}]}, "done": false}
"#,
        );
        assert_eq!(chunks[0].as_ref().unwrap().delta.as_deref(), Some("ab"));
    }

    #[tokio::test]
    async fn test_list_models_prefixes_and_skips_unnamed() {
        let client = MockHttpClient::new().with_response(
            TAGS_URL,
            serde_json::json!({
                "models": [
                    {"name": "qwen2.5:7b", "modified_at": "2024-06-01T12:00:00Z"},
                    {"name": "", "modified_at": 0},
                ]
            }),
        );

        let models = backend(client).list_models().await.unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].id, "ollama/qwen2.5:7b");
        assert_eq!(models[0].owned_by, "ollama");
        assert!(models[0].created > 0);
    }

    #[tokio::test]
    async fn test_chat_maps_usage_from_counters() {
        let client = MockHttpClient::new().with_response(
            CHAT_URL,
            serde_json::json!({
                "message": {"role": "assistant", "content": "Hello!"},
                "done": true,
                "done_reason": "stop",
                "prompt_eval_count": 10,
                "eval_count": 8,
                "eval_duration": 2_000_000_000u64
            }),
        );

        let request = ChatRequest::builder().user("Hi").build();
        let response = backend(client).chat("qwen2.5:7b", request).await.unwrap();

        assert_eq!(response.content(), "Hello!");
        let usage = response.usage.unwrap();
        assert_eq!(usage.prompt_tokens, 10);
        assert_eq!(usage.completion_tokens, 8);
        assert_eq!(usage.total_tokens, 18);
        assert_eq!(response.eval.unwrap().eval_count, 8);
    }

    #[tokio::test]
    async fn test_chat_stream_emits_deltas_from_cumulative_lines() {
        let client = MockHttpClient::new().with_stream_response(
            CHAT_URL,
            vec![
                Bytes::from_static(
                    b"{\"message\": {\"content\": \"Hi\"}, \"done\": false}\n",
                ),
                Bytes::from_static(
                    b"{\"message\": {\"content\": \"Hi there\"}, \"done\": false}\n{\"message\": {\"content\": \"\"}, \"done\": true, \"eval_count\": 2, \"eval_duration\": 500000000}\n",
                ),
            ],
        );

        let request = ChatRequest::builder().user("Hi").stream(true).build();
        let stream = backend(client)
            .chat_stream("qwen2.5:7b", request)
            .await
            .unwrap();
        let chunks: Vec<_> = stream.map(|c| c.unwrap()).collect().await;

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].delta.as_deref(), Some("Hi"));
        assert_eq!(chunks[1].delta.as_deref(), Some(" there"));
        assert_eq!(chunks[2].finish_reason, Some(FinishReason::Stop));
        assert_eq!(chunks[2].eval.unwrap().eval_count, 2);
    }

    #[tokio::test]
    async fn test_probe_reports_backend_state() {
        let up = backend(
            MockHttpClient::new().with_status("http://ollama:11434/api/version", 200),
        );
        assert!(up.probe().await);

        let down = backend(
            MockHttpClient::new().with_status("http://ollama:11434/api/version", 500),
        );
        assert!(!down.probe().await);

        let unreachable = backend(
            MockHttpClient::new().with_error("http://ollama:11434/api/version", "refused"),
        );
        assert!(!unreachable.probe().await);
    }

    #[tokio::test]
    async fn test_embed_parses_vectors() {
        let client = MockHttpClient::new().with_response(
            "http://ollama:11434/api/embed",
            serde_json::json!({"embeddings": [[0.1, 0.2], [0.3, 0.4]]}),
        );

        let input = vec!["a".to_string(), "b".to_string()];
        let vectors = backend(client).embed("nomic-embed", &input).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].len(), 2);
    }
}
