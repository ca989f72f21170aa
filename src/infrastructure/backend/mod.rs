//! Inference backend adapters and provider routing

mod ollama;
mod openai;

pub use ollama::{DeltaTracker, OllamaBackend, StreamSession};
pub use openai::OpenAiBackend;

use std::sync::Arc;
use std::time::Duration;

use crate::domain::{InferenceBackend, ModelRef};

/// Liveness probes
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);
/// Model list fetches
pub const LIST_TIMEOUT: Duration = Duration::from_secs(30);
/// Embedding requests
pub const EMBED_TIMEOUT: Duration = Duration::from_secs(120);
/// Non-streaming chat
pub const CHAT_TIMEOUT: Duration = Duration::from_secs(600);
/// Streaming chat, kept long for slow local models
pub const STREAM_TIMEOUT: Duration = Duration::from_secs(3600);

/// A resolved request target: the backend to call and the model ID with its
/// provider prefix already stripped.
#[derive(Debug, Clone)]
pub struct Route {
    pub backend: Arc<dyn InferenceBackend>,
    pub model: String,
}

/// Maps model-ID prefixes to backends.
///
/// A prefix naming a configured alternate selects it; any other prefix is
/// stripped and the request goes to the default provider, which always speaks
/// the Ollama dialect.
#[derive(Debug)]
pub struct BackendRouter {
    default_backend: Arc<dyn InferenceBackend>,
    alternates: Vec<Arc<dyn InferenceBackend>>,
}

impl BackendRouter {
    pub fn new(
        default_backend: Arc<dyn InferenceBackend>,
        alternates: Vec<Arc<dyn InferenceBackend>>,
    ) -> Self {
        Self {
            default_backend,
            alternates,
        }
    }

    pub fn resolve(&self, model: &str) -> Route {
        let model_ref = ModelRef::parse(model);

        if let Some(provider) = &model_ref.provider {
            if let Some(backend) = self
                .alternates
                .iter()
                .find(|backend| backend.name() == provider)
            {
                return Route {
                    backend: backend.clone(),
                    model: model_ref.id,
                };
            }
        }

        Route {
            backend: self.default_backend.clone(),
            model: model_ref.id,
        }
    }

    /// All configured backends, default provider first.
    pub fn backends(&self) -> Vec<Arc<dyn InferenceBackend>> {
        std::iter::once(self.default_backend.clone())
            .chain(self.alternates.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chat::backend::mock::MockBackend;
    use crate::domain::Dialect;

    fn router() -> BackendRouter {
        BackendRouter::new(
            Arc::new(MockBackend::new("ollama")),
            vec![Arc::new(MockBackend::new("altprovider").with_dialect(Dialect::OpenAi))],
        )
    }

    #[test]
    fn test_alternate_prefix_routes_and_strips() {
        let route = router().resolve("altprovider/foo");
        assert_eq!(route.backend.name(), "altprovider");
        assert_eq!(route.model, "foo");
    }

    #[test]
    fn test_no_prefix_routes_to_default_unchanged() {
        let route = router().resolve("foo");
        assert_eq!(route.backend.name(), "ollama");
        assert_eq!(route.model, "foo");
    }

    #[test]
    fn test_default_provider_prefix_is_stripped() {
        let route = router().resolve("ollama/deepseek-r1:7b");
        assert_eq!(route.backend.name(), "ollama");
        assert_eq!(route.model, "deepseek-r1:7b");
    }

    #[test]
    fn test_unrecognized_prefix_falls_back_to_default() {
        let route = router().resolve("mystery/some-model");
        assert_eq!(route.backend.name(), "ollama");
        assert_eq!(route.model, "some-model");
    }

    #[test]
    fn test_backends_lists_default_first() {
        let backends = router().backends();
        assert_eq!(backends.len(), 2);
        assert_eq!(backends[0].name(), "ollama");
    }
}
