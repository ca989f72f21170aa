//! OpenAI-compatible v1 API endpoints

pub mod cache;
pub mod chat;
pub mod completions;
pub mod embeddings;
pub mod models;
pub mod responses;

use axum::{
    routing::{delete, get, post},
    Router,
};

use super::state::AppState;

/// Create v1 API router
pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/models", get(models::list_models))
        .route("/cache", delete(cache::invalidate_cache))
        .route("/chat/completions", post(chat::create_chat_completion))
        .route("/completions", post(completions::create_completion))
        .route("/responses", post(responses::create_response))
        .route("/embeddings", post(embeddings::create_embeddings))
}
