use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::domain::GatewayError;

/// Stream type for HTTP response bodies
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, GatewayError>> + Send>>;

/// Trait for HTTP client operations (for mocking).
///
/// Timeouts are per-call: probes are short, streaming chat runs for up to an
/// hour, so a single client-level timeout would not fit.
#[async_trait]
pub trait HttpClientTrait: Send + Sync + std::fmt::Debug {
    async fn get_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        timeout: Duration,
    ) -> Result<serde_json::Value, GatewayError>;

    async fn get_status(&self, url: &str, timeout: Duration) -> Result<u16, GatewayError>;

    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<serde_json::Value, GatewayError>;

    async fn post_json_stream(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<ByteStream, GatewayError>;
}

/// Real HTTP client using reqwest
#[derive(Debug, Clone, Default)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    async fn send(
        &self,
        mut request: reqwest::RequestBuilder,
        headers: Vec<(&str, &str)>,
        url: &str,
    ) -> Result<reqwest::Response, GatewayError> {
        for (key, value) in headers {
            request = request.header(key, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::unreachable(url, e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::upstream(url, status, body));
        }

        Ok(response)
    }
}

#[async_trait]
impl HttpClientTrait for HttpClient {
    async fn get_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        timeout: Duration,
    ) -> Result<serde_json::Value, GatewayError> {
        let request = self.client.get(url).timeout(timeout);
        let response = self.send(request, headers, url).await?;

        response
            .json()
            .await
            .map_err(|e| GatewayError::unreachable(url, format!("invalid response body: {}", e)))
    }

    async fn get_status(&self, url: &str, timeout: Duration) -> Result<u16, GatewayError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| GatewayError::unreachable(url, e.to_string()))?;

        Ok(response.status().as_u16())
    }

    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<serde_json::Value, GatewayError> {
        let request = self.client.post(url).timeout(timeout).json(body);
        let response = self.send(request, headers, url).await?;

        response
            .json()
            .await
            .map_err(|e| GatewayError::unreachable(url, format!("invalid response body: {}", e)))
    }

    async fn post_json_stream(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<ByteStream, GatewayError> {
        let request = self.client.post(url).timeout(timeout).json(body);
        let response = self.send(request, headers, url).await?;

        use futures::StreamExt;
        let url = url.to_string();
        let stream = response.bytes_stream().map(move |result| {
            result.map_err(|e| GatewayError::unreachable(&url, format!("stream error: {}", e)))
        });

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
pub mod mock {
    use std::collections::HashMap;
    use std::sync::RwLock;

    use futures::stream;

    use super::*;

    /// Scriptable HTTP client recording every call it serves.
    #[derive(Debug, Default)]
    pub struct MockHttpClient {
        responses: RwLock<HashMap<String, serde_json::Value>>,
        stream_responses: RwLock<HashMap<String, Vec<Bytes>>>,
        statuses: RwLock<HashMap<String, u16>>,
        errors: RwLock<HashMap<String, String>>,
        posts: RwLock<Vec<(String, serde_json::Value)>>,
    }

    impl MockHttpClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_response(self, url: impl Into<String>, response: serde_json::Value) -> Self {
            self.responses.write().unwrap().insert(url.into(), response);
            self
        }

        pub fn with_stream_response(self, url: impl Into<String>, chunks: Vec<Bytes>) -> Self {
            self.stream_responses
                .write()
                .unwrap()
                .insert(url.into(), chunks);
            self
        }

        pub fn with_status(self, url: impl Into<String>, status: u16) -> Self {
            self.statuses.write().unwrap().insert(url.into(), status);
            self
        }

        pub fn with_error(self, url: impl Into<String>, error: impl Into<String>) -> Self {
            self.errors.write().unwrap().insert(url.into(), error.into());
            self
        }

        /// Bodies posted so far, in call order.
        pub fn posts(&self) -> Vec<(String, serde_json::Value)> {
            self.posts.read().unwrap().clone()
        }

        fn check_error(&self, url: &str) -> Result<(), GatewayError> {
            if let Some(error) = self.errors.read().unwrap().get(url) {
                return Err(GatewayError::unreachable("mock", error));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl HttpClientTrait for MockHttpClient {
        async fn get_json(
            &self,
            url: &str,
            _headers: Vec<(&str, &str)>,
            _timeout: Duration,
        ) -> Result<serde_json::Value, GatewayError> {
            self.check_error(url)?;
            self.responses
                .read()
                .unwrap()
                .get(url)
                .cloned()
                .ok_or_else(|| {
                    GatewayError::unreachable("mock", format!("no mock response for {}", url))
                })
        }

        async fn get_status(&self, url: &str, _timeout: Duration) -> Result<u16, GatewayError> {
            self.check_error(url)?;
            Ok(*self.statuses.read().unwrap().get(url).unwrap_or(&200))
        }

        async fn post_json(
            &self,
            url: &str,
            _headers: Vec<(&str, &str)>,
            body: &serde_json::Value,
            _timeout: Duration,
        ) -> Result<serde_json::Value, GatewayError> {
            self.check_error(url)?;
            self.posts
                .write()
                .unwrap()
                .push((url.to_string(), body.clone()));
            self.responses
                .read()
                .unwrap()
                .get(url)
                .cloned()
                .ok_or_else(|| {
                    GatewayError::unreachable("mock", format!("no mock response for {}", url))
                })
        }

        async fn post_json_stream(
            &self,
            url: &str,
            _headers: Vec<(&str, &str)>,
            body: &serde_json::Value,
            _timeout: Duration,
        ) -> Result<ByteStream, GatewayError> {
            self.check_error(url)?;
            self.posts
                .write()
                .unwrap()
                .push((url.to_string(), body.clone()));

            let chunks = self
                .stream_responses
                .read()
                .unwrap()
                .get(url)
                .cloned()
                .unwrap_or_default();

            let stream = stream::iter(chunks.into_iter().map(Ok));
            Ok(Box::pin(stream))
        }
    }
}
