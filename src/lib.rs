//! PMP Model Gateway
//!
//! An OpenAI-compatible gateway in front of Ollama-dialect and
//! OpenAI-compatible inference backends:
//! - model list aggregation with a TTL cache and stale-serving fallback
//! - chat/completions/responses/embeddings translation, streaming included
//! - throughput telemetry posted to the dashboard collaborator

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;
use std::time::Duration;

use api::AppState;
use domain::InferenceBackend;
use infrastructure::{
    BackendRouter, HttpClient, ModelRegistry, OllamaBackend, OpenAiBackend, ThroughputReporter,
};
use tracing::info;

/// Wire up backends, cache and telemetry from the configuration.
pub fn create_app_state(config: &AppConfig) -> AppState {
    let client = HttpClient::new();

    let ollama: Arc<dyn InferenceBackend> = Arc::new(OllamaBackend::new(
        client.clone(),
        &config.backends.ollama.name,
        &config.backends.ollama.url,
    ));
    info!(
        name = %config.backends.ollama.name,
        url = %config.backends.ollama.url,
        "configured default backend"
    );

    let mut alternates: Vec<Arc<dyn InferenceBackend>> = Vec::new();
    if let Some(alternate) = &config.backends.alternate {
        alternates.push(Arc::new(OpenAiBackend::new(
            client.clone(),
            &alternate.name,
            &alternate.url,
            alternate.api_key.clone(),
        )));
        info!(name = %alternate.name, url = %alternate.url, "configured alternate backend");
    }

    let router = Arc::new(BackendRouter::new(ollama, alternates));
    let registry = Arc::new(ModelRegistry::new(
        router.backends(),
        Duration::from_secs(config.cache.model_list_ttl_secs),
    ));
    let telemetry = Arc::new(ThroughputReporter::new(
        Arc::new(client),
        config.telemetry.dashboard_url.clone(),
    ));

    AppState::new(router, registry, telemetry)
}
