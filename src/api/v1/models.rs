//! Models endpoint handler

use axum::extract::State;
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{Json, ModelsResponse};

/// GET /v1/models
///
/// Serves the cached aggregated model list (see the model registry for the
/// TTL and stale-serving rules).
pub async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    let models = state.registry.list().await;
    debug!(count = models.len(), "listing models");

    Json(ModelsResponse::new(models))
}
