//! Embeddings endpoint handler

use axum::extract::State;
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ApiError, EmbeddingsRequest, EmbeddingsResponse, Json};

/// POST /v1/embeddings
///
/// Scalar input is treated as a single-element batch; an empty input returns
/// an empty data list without contacting any backend.
pub async fn create_embeddings(
    State(state): State<AppState>,
    Json(request): Json<EmbeddingsRequest>,
) -> Result<Json<EmbeddingsResponse>, ApiError> {
    let model = request.model;
    let input = request.input.into_batch();

    if input.is_empty() {
        debug!(model = %model, "empty embeddings input, short-circuiting");
        return Ok(Json(EmbeddingsResponse::empty(model)));
    }

    let route = state.router.resolve(&model);
    let vectors = route
        .backend
        .embed(&route.model, &input)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(EmbeddingsResponse::new(model, vectors)))
}
