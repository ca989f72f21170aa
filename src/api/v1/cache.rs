//! Cache maintenance endpoint

use axum::extract::State;
use tracing::info;

use crate::api::state::AppState;
use crate::api::types::{Json, OkResponse};

/// DELETE /v1/cache
///
/// Unconditionally clears the model list snapshot; the next listing performs
/// a fresh fetch.
pub async fn invalidate_cache(State(state): State<AppState>) -> Json<OkResponse> {
    state.registry.invalidate();
    info!("model list cache cleared");

    Json(OkResponse { ok: true })
}
