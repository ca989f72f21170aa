//! Responses API endpoint handler
//!
//! Rewrites the request into a chat request, then reshapes the chat
//! translation back into Responses form: one message item with one
//! `output_text` part, or the fixed lifecycle event sequence when streaming.

use std::convert::Infallible;

use axum::{
    extract::State,
    http::HeaderMap,
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
    ApiError, Json, ResponsesEvent, ResponsesRequest, ResponsesResponse, ResponsesStreamEvents,
};
use crate::domain::{ChatStream, EvalStats, Usage};

/// POST /v1/responses
pub async fn create_response(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    Json(request): Json<ResponsesRequest>,
) -> Result<Response, ApiError> {
    let service = service_from_headers(&headers);
    let request_id = request_id.0;
    let model = request.model.clone();
    let stream = request.stream;

    info!(
        request_id = %request_id,
        model = %model,
        stream = stream,
        "Processing responses request"
    );

    let chat_request = request.into_chat_request();
    if chat_request.messages.is_empty() {
        return Err(ApiError::bad_request("Input cannot be empty").with_param("input"));
    }

    let domain_request = super::chat::build_chat_request(&chat_request, stream)?;
    let route = state.router.resolve(&model);

    if stream {
        let chunk_stream = route
            .backend
            .chat_stream(&route.model, domain_request)
            .await
            .map_err(ApiError::from)?;

        let (tx, rx) = mpsc::channel::<ResponsesEvent>(32);
        let telemetry = state.telemetry.clone();
        let backend_model = route.model.clone();
        let events = ResponsesStreamEvents::new(&request_id, &model);

        tokio::spawn(async move {
            if let Some(eval) = pump_responses(chunk_stream, events, &tx).await {
                telemetry.record(&backend_model, &eval, &service);
            }
        });

        let stream = ReceiverStream::new(rx).map(|event| {
            Ok::<_, Infallible>(
                Event::default()
                    .event(event.name)
                    .data(event.payload.to_string()),
            )
        });
        let sse = Sse::new(stream).keep_alive(axum::response::sse::KeepAlive::default());
        return Ok(sse.into_response());
    }

    let response = route
        .backend
        .chat(&route.model, domain_request)
        .await
        .map_err(ApiError::from)?;

    if let Some(eval) = &response.eval {
        state.telemetry.record(&route.model, eval, &service);
    }

    Ok(Json(ResponsesResponse::completed(
        &request_id,
        &model,
        response.content(),
        response.usage,
    ))
    .into_response())
}

/// Re-emit a translated chat stream as Responses lifecycle events, in fixed
/// order: created, output_item.added, content_part.added, one delta per
/// non-empty chat delta, then the done ladder.
///
/// A mid-stream backend error truncates without the closing events. Returns
/// the terminal evaluation counters only on normal completion.
pub(crate) async fn pump_responses(
    mut stream: ChatStream,
    mut events: ResponsesStreamEvents,
    tx: &mpsc::Sender<ResponsesEvent>,
) -> Option<EvalStats> {
    for event in [
        events.created(),
        events.output_item_added(),
        events.content_part_added(),
    ] {
        if tx.send(event).await.is_err() {
            return None;
        }
    }

    let mut text = String::new();
    let mut usage: Option<Usage> = None;
    let mut eval = None;

    while let Some(item) = stream.next().await {
        match item {
            Ok(chunk) => {
                if let Some(stats) = chunk.eval {
                    eval = Some(stats);
                }
                if let Some(chunk_usage) = chunk.usage {
                    usage = Some(chunk_usage);
                }
                if let Some(delta) = chunk.delta.as_deref().filter(|d| !d.is_empty()) {
                    text.push_str(delta);
                    if tx.send(events.output_text_delta(delta)).await.is_err() {
                        return None;
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "responses stream aborted mid-flight");
                return None;
            }
        }
    }

    for event in [
        events.output_text_done(&text),
        events.content_part_done(&text),
        events.output_item_done(&text),
        events.done(&text, usage),
    ] {
        if tx.send(event).await.is_err() {
            return None;
        }
    }

    eval
}
