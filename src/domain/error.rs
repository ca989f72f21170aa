use thiserror::Error;

/// Core gateway errors
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{backend}: request failed: {message}")]
    Unreachable { backend: String, message: String },

    #[error("{backend} returned HTTP {status}: {message}")]
    Upstream {
        backend: String,
        status: u16,
        message: String,
    },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl GatewayError {
    pub fn unreachable(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unreachable {
            backend: backend.into(),
            message: message.into(),
        }
    }

    pub fn upstream(backend: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Upstream {
            backend: backend.into(),
            status,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_error() {
        let error = GatewayError::unreachable("ollama", "connection refused");
        assert_eq!(
            error.to_string(),
            "ollama: request failed: connection refused"
        );
    }

    #[test]
    fn test_upstream_error_keeps_status_and_message() {
        let error = GatewayError::upstream("ollama", 404, "model 'nope' not found");
        assert!(error.to_string().contains("404"));
        assert!(error.to_string().contains("model 'nope' not found"));
    }

    #[test]
    fn test_validation_error() {
        let error = GatewayError::validation("messages cannot be empty");
        assert_eq!(
            error.to_string(),
            "Validation error: messages cannot be empty"
        );
    }
}
