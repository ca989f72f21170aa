//! Infrastructure layer - backend adapters, cache, telemetry

pub mod backend;
pub mod http_client;
pub mod logging;
pub mod registry;
pub mod sse;
pub mod telemetry;

pub use backend::{BackendRouter, OllamaBackend, OpenAiBackend, Route};
pub use http_client::{HttpClient, HttpClientTrait};
pub use registry::ModelRegistry;
pub use telemetry::{ThroughputReporter, ThroughputSample};
