//! OpenAI-compatible embeddings types

use serde::{Deserialize, Serialize};

/// Embeddings input - scalar or batch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmbeddingsInput {
    Single(String),
    Batch(Vec<String>),
}

impl EmbeddingsInput {
    /// A scalar input is wrapped as a single-element batch.
    pub fn into_batch(self) -> Vec<String> {
        match self {
            Self::Single(input) => vec![input],
            Self::Batch(inputs) => inputs,
        }
    }
}

/// Embeddings request (OpenAI format)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsRequest {
    pub model: String,
    pub input: EmbeddingsInput,
}

/// One embedding vector, wrapped in input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingObject {
    pub object: String,
    pub embedding: Vec<f32>,
    pub index: usize,
}

/// Embeddings response (OpenAI format)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsResponse {
    pub object: String,
    pub data: Vec<EmbeddingObject>,
    pub model: String,
}

impl EmbeddingsResponse {
    pub fn new(model: impl Into<String>, vectors: Vec<Vec<f32>>) -> Self {
        Self {
            object: "list".to_string(),
            data: vectors
                .into_iter()
                .enumerate()
                .map(|(index, embedding)| EmbeddingObject {
                    object: "embedding".to_string(),
                    embedding,
                    index,
                })
                .collect(),
            model: model.into(),
        }
    }

    pub fn empty(model: impl Into<String>) -> Self {
        Self::new(model, Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_input_wrapped_as_batch() {
        let input = EmbeddingsInput::Single("hello".to_string());
        assert_eq!(input.into_batch(), vec!["hello"]);
    }

    #[test]
    fn test_response_preserves_input_order() {
        let response =
            EmbeddingsResponse::new("nomic-embed", vec![vec![0.1, 0.2], vec![0.3, 0.4]]);

        assert_eq!(response.data.len(), 2);
        assert_eq!(response.data[0].index, 0);
        assert_eq!(response.data[1].index, 1);
        assert_eq!(response.data[1].embedding, vec![0.3, 0.4]);

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"object\":\"embedding\""));
    }

    #[test]
    fn test_empty_response() {
        let response = EmbeddingsResponse::empty("nomic-embed");
        assert!(response.data.is_empty());
        assert_eq!(response.object, "list");
    }
}
