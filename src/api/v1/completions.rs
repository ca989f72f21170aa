//! Legacy completions endpoint handler

use axum::{extract::State, http::HeaderMap, response::Response, Extension};
use tracing::debug;

use super::chat;
use crate::api::attribution::service_from_headers;
use crate::api::middleware::RequestId;
use crate::api::state::AppState;
use crate::api::types::{ApiError, CompletionRequest, Json};

/// POST /v1/completions
///
/// Rewrites the prompt into a single user message and delegates to the chat
/// route; the response is chat-completion shaped.
pub async fn create_completion(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    Json(request): Json<CompletionRequest>,
) -> Result<Response, ApiError> {
    debug!(model = %request.model, "rewriting legacy completion to chat");

    let service = service_from_headers(&headers);
    chat::respond(state, service, request_id.0, request.into_chat_request()).await
}
