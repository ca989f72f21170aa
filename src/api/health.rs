//! Gateway health check

use axum::extract::State;
use serde::Serialize;

use super::state::AppState;
use crate::api::types::Json;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
}

/// `{"ok": true}` iff at least one configured backend answers its liveness
/// probe. The endpoint itself always returns 200; the body carries the
/// verdict.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut ok = false;
    for backend in state.router.backends() {
        if backend.probe().await {
            ok = true;
            break;
        }
    }

    Json(HealthResponse { ok })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() {
        let json = serde_json::to_string(&HealthResponse { ok: true }).unwrap();
        assert_eq!(json, "{\"ok\":true}");
    }
}
