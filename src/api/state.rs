//! Application state for shared services

use std::sync::Arc;

use crate::infrastructure::{BackendRouter, ModelRegistry, ThroughputReporter};

/// Shared per-process services handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<BackendRouter>,
    pub registry: Arc<ModelRegistry>,
    pub telemetry: Arc<ThroughputReporter>,
}

impl AppState {
    pub fn new(
        router: Arc<BackendRouter>,
        registry: Arc<ModelRegistry>,
        telemetry: Arc<ThroughputReporter>,
    ) -> Self {
        Self {
            router,
            registry,
            telemetry,
        }
    }
}
