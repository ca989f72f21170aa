//! OpenAI-compatible model list types

use serde::{Deserialize, Serialize};

use crate::domain::ModelEntry;

/// List models response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub object: String,
    pub data: Vec<ModelEntry>,
}

impl ModelsResponse {
    pub fn new(models: Vec<ModelEntry>) -> Self {
        Self {
            object: "list".to_string(),
            data: models,
        }
    }
}

/// Acknowledgement body for maintenance endpoints (`DELETE /v1/cache`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}
