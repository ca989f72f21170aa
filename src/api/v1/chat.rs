//! Chat completions endpoint handler

use std::convert::Infallible;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue},
    response::{sse::Event, IntoResponse, Response, Sse},
    Extension,
};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info};

use crate::api::attribution::service_from_headers;
use crate::api::middleware::RequestId;
use crate::api::state::AppState;
use crate::api::types::{
    ApiError, ChatCompletionRequest, ChatCompletionResponse, ChatCompletionStreamResponse, Json,
};
use crate::domain::{ChatRequest, ChatStream, Dialect, EvalStats, SamplingOptions};

/// POST /v1/chat/completions
pub async fn create_chat_completion(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    Json(request): Json<ChatCompletionRequest>,
) -> Result<Response, ApiError> {
    let service = service_from_headers(&headers);
    respond(state, service, request_id.0, request).await
}

/// Shared by the chat route and the legacy completions rewrite.
pub(crate) async fn respond(
    state: AppState,
    service: String,
    request_id: String,
    request: ChatCompletionRequest,
) -> Result<Response, ApiError> {
    info!(
        request_id = %request_id,
        model = %request.model,
        stream = request.stream,
        service = %service,
        "Processing chat completion request"
    );

    if request.messages.is_empty() {
        return Err(ApiError::bad_request("Messages cannot be empty").with_param("messages"));
    }

    let chat_request = build_chat_request(&request, request.stream)?;
    let route = state.router.resolve(&request.model);

    if request.stream {
        // the alternate provider already speaks this dialect; proxy verbatim
        if route.backend.dialect() == Dialect::OpenAi {
            let bytes = route
                .backend
                .chat_stream_raw(&route.model, chat_request)
                .await
                .map_err(ApiError::from)?;
            return Ok(sse_headers(Body::from_stream(bytes).into_response()));
        }

        let (tx, rx) = mpsc::channel::<String>(32);
        let telemetry = state.telemetry.clone();
        let backend = route.backend.clone();
        let backend_model = route.model.clone();
        let model = request.model.clone();

        tokio::spawn(async move {
            match backend.chat_stream(&backend_model, chat_request).await {
                Ok(stream) => {
                    let eval = pump_chat_stream(stream, &model, &request_id, &tx).await;
                    if let Some(eval) = eval {
                        telemetry.record(&backend_model, &eval, &service);
                    }
                }
                Err(e) => {
                    // dropping tx closes the stream without a terminal
                    // sentinel; clients must treat that as a failure
                    error!(error = %e, model = %backend_model, "chat stream failed to start");
                }
            }
        });

        let stream = ReceiverStream::new(rx)
            .map(|data| Ok::<_, Infallible>(Event::default().data(data)));
        let sse = Sse::new(stream).keep_alive(axum::response::sse::KeepAlive::default());
        return Ok(sse_headers(sse.into_response()));
    }

    let response = route
        .backend
        .chat(&route.model, chat_request)
        .await
        .map_err(ApiError::from)?;

    if let Some(eval) = &response.eval {
        state.telemetry.record(&route.model, eval, &service);
    }

    Ok(Json(ChatCompletionResponse::from_backend(
        &response,
        &request.model,
        &request_id,
    ))
    .into_response())
}

/// Re-frame translated chunks as chat-completion SSE data lines.
///
/// The first non-empty delta carries the `role` field; completion emits an
/// empty delta with `finish_reason: stop` followed by the `[DONE]` sentinel.
/// Returns the terminal evaluation counters only when the backend signalled
/// completion and the client was still connected.
pub(crate) async fn pump_chat_stream(
    mut stream: ChatStream,
    model: &str,
    request_id: &str,
    tx: &mpsc::Sender<String>,
) -> Option<EvalStats> {
    let mut sent_role = false;
    let mut eval = None;

    while let Some(item) = stream.next().await {
        match item {
            Ok(chunk) => {
                if let Some(stats) = chunk.eval {
                    eval = Some(stats);
                }
                if let Some(delta) = chunk.delta.as_deref().filter(|d| !d.is_empty()) {
                    let frame = if sent_role {
                        ChatCompletionStreamResponse::content(model, request_id, delta)
                    } else {
                        sent_role = true;
                        ChatCompletionStreamResponse::first(model, request_id, delta)
                    };
                    let data = serde_json::to_string(&frame).unwrap();
                    if tx.send(data).await.is_err() {
                        // client disconnected; stop reading, emit no telemetry
                        return None;
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "chat stream aborted mid-flight");
                return None;
            }
        }
    }

    let finish = ChatCompletionStreamResponse::finish(model, request_id);
    if tx.send(serde_json::to_string(&finish).unwrap()).await.is_err() {
        return None;
    }
    let _ = tx.send("[DONE]".to_string()).await;

    eval
}

pub(crate) fn build_chat_request(
    request: &ChatCompletionRequest,
    stream: bool,
) -> Result<ChatRequest, ApiError> {
    if let Some(temperature) = request.temperature {
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ApiError::bad_request("Temperature must be between 0 and 2")
                .with_param("temperature"));
        }
    }
    if let Some(top_p) = request.top_p {
        if !(0.0..=1.0).contains(&top_p) {
            return Err(ApiError::bad_request("top_p must be between 0 and 1").with_param("top_p"));
        }
    }
    if let Some(penalty) = request.presence_penalty {
        if !(-2.0..=2.0).contains(&penalty) {
            return Err(
                ApiError::bad_request("presence_penalty must be between -2 and 2")
                    .with_param("presence_penalty"),
            );
        }
    }
    if let Some(penalty) = request.frequency_penalty {
        if !(-2.0..=2.0).contains(&penalty) {
            return Err(
                ApiError::bad_request("frequency_penalty must be between -2 and 2")
                    .with_param("frequency_penalty"),
            );
        }
    }

    Ok(ChatRequest {
        messages: request.messages.iter().map(|m| m.to_domain()).collect(),
        options: SamplingOptions {
            temperature: request.temperature,
            top_p: request.top_p,
            max_tokens: request.max_tokens,
            stop: request.stop.as_ref().map(|stop| stop.to_vec()),
            presence_penalty: request.presence_penalty,
            frequency_penalty: request.frequency_penalty,
            seed: request.seed,
        },
        stream,
    })
}

/// Streaming response headers the original proxies rely on.
fn sse_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache"),
    );
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));
    response
}

#[cfg(test)]
mod tests {
    use futures::stream;

    use super::*;
    use crate::api::types::chat::{ChatMessage, ChatMessageRole, MessageContent};
    use crate::domain::{FinishReason, GatewayError, StreamChunk};

    fn chunk_stream(chunks: Vec<Result<StreamChunk, GatewayError>>) -> ChatStream {
        Box::pin(stream::iter(chunks))
    }

    fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(frame);
        }
        frames
    }

    #[tokio::test]
    async fn test_pump_emits_role_once_then_finish_and_done() {
        let stream = chunk_stream(vec![
            Ok(StreamChunk::delta("Hi")),
            Ok(StreamChunk::delta(" there")),
            Ok(StreamChunk::finish(FinishReason::Stop).with_eval(EvalStats {
                eval_count: 2,
                eval_duration_ns: 500_000_000,
            })),
        ]);

        let (tx, mut rx) = mpsc::channel(32);
        let eval = pump_chat_stream(stream, "ollama/m", "rid", &tx).await;
        drop(tx);

        assert_eq!(eval.unwrap().eval_count, 2);

        let frames = drain(&mut rx);
        assert_eq!(frames.len(), 4);

        let first: serde_json::Value = serde_json::from_str(&frames[0]).unwrap();
        assert_eq!(first["choices"][0]["delta"]["role"], "assistant");
        assert_eq!(first["choices"][0]["delta"]["content"], "Hi");

        let second: serde_json::Value = serde_json::from_str(&frames[1]).unwrap();
        assert!(second["choices"][0]["delta"]["role"].is_null());

        let finish: serde_json::Value = serde_json::from_str(&frames[2]).unwrap();
        assert_eq!(finish["choices"][0]["finish_reason"], "stop");
        assert!(finish["choices"][0]["delta"]["content"].is_null());

        assert_eq!(frames[3], "[DONE]");
    }

    #[tokio::test]
    async fn test_pump_mid_stream_error_truncates_without_sentinel() {
        let stream = chunk_stream(vec![
            Ok(StreamChunk::delta("partial")),
            Err(GatewayError::unreachable("ollama", "reset")),
        ]);

        let (tx, mut rx) = mpsc::channel(32);
        let eval = pump_chat_stream(stream, "m", "rid", &tx).await;
        drop(tx);

        assert!(eval.is_none(), "no telemetry for an aborted stream");

        let frames = drain(&mut rx);
        assert_eq!(frames.len(), 1, "only the partial delta, no finish/[DONE]");
    }

    #[tokio::test]
    async fn test_pump_without_eval_counters_reports_none() {
        let stream = chunk_stream(vec![
            Ok(StreamChunk::delta("x")),
            Ok(StreamChunk::finish(FinishReason::Stop)),
        ]);

        let (tx, mut rx) = mpsc::channel(32);
        let eval = pump_chat_stream(stream, "m", "rid", &tx).await;
        drop(tx);

        assert!(eval.is_none());
        let frames = drain(&mut rx);
        assert_eq!(*frames.last().unwrap(), "[DONE]");
    }

    #[test]
    fn test_build_chat_request_rejects_bad_temperature() {
        let request = ChatCompletionRequest {
            model: "m".to_string(),
            messages: vec![ChatMessage {
                role: ChatMessageRole::User,
                content: Some(MessageContent::Text("hi".to_string())),
                name: None,
            }],
            temperature: Some(3.0),
            top_p: None,
            stream: false,
            stop: None,
            max_tokens: None,
            presence_penalty: None,
            frequency_penalty: None,
            user: None,
            seed: None,
        };

        assert!(build_chat_request(&request, false).is_err());
    }

    #[test]
    fn test_build_chat_request_flattens_messages() {
        let request = ChatCompletionRequest {
            model: "m".to_string(),
            messages: vec![ChatMessage {
                role: ChatMessageRole::User,
                content: Some(MessageContent::Text("hi".to_string())),
                name: None,
            }],
            temperature: Some(0.7),
            top_p: None,
            stream: false,
            stop: None,
            max_tokens: Some(64),
            presence_penalty: None,
            frequency_penalty: None,
            user: None,
            seed: Some(7),
        };

        let chat = build_chat_request(&request, true).unwrap();
        assert_eq!(chat.messages[0].content, "hi");
        assert_eq!(chat.options.max_tokens, Some(64));
        assert_eq!(chat.options.seed, Some(7));
        assert!(chat.stream);
    }
}
