//! Throughput telemetry
//!
//! Streaming and non-streaming chat completions report their terminal
//! evaluation counters here. Samples are posted to the dashboard collaborator
//! fire-and-forget: delivery failures never affect the caller's response.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::domain::EvalStats;
use crate::infrastructure::http_client::HttpClientTrait;

const TELEMETRY_TIMEOUT: Duration = Duration::from_secs(5);

/// One throughput observation, as posted to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThroughputSample {
    pub model: String,
    pub output_tokens_per_sec: f64,
    pub service: String,
}

impl ThroughputSample {
    /// Derive a sample from terminal evaluation counters. Returns `None`
    /// unless both counters are positive.
    pub fn from_eval(model: &str, eval: &EvalStats, service: &str) -> Option<Self> {
        if eval.eval_count == 0 || eval.eval_duration_ns == 0 {
            return None;
        }

        let seconds = eval.eval_duration_ns as f64 / 1e9;
        let tps = eval.eval_count as f64 / seconds;

        Some(Self {
            model: model.to_string(),
            output_tokens_per_sec: (tps * 10.0).round() / 10.0,
            service: if service.is_empty() {
                "unknown".to_string()
            } else {
                service.to_string()
            },
        })
    }
}

/// Posts throughput samples to the dashboard without blocking the caller.
#[derive(Debug, Clone)]
pub struct ThroughputReporter {
    client: Arc<dyn HttpClientTrait>,
    record_url: Option<String>,
}

impl ThroughputReporter {
    /// `dashboard_url` of `None` (or empty) disables reporting entirely.
    pub fn new(client: Arc<dyn HttpClientTrait>, dashboard_url: Option<String>) -> Self {
        let record_url = dashboard_url
            .filter(|url| !url.trim().is_empty())
            .map(|url| format!("{}/api/throughput/record", url.trim_end_matches('/')));

        Self { client, record_url }
    }

    /// Fire-and-forget: derive a sample and post it on a detached task.
    pub fn record(&self, model: &str, eval: &EvalStats, service: &str) {
        if self.record_url.is_none() {
            return;
        }
        let Some(sample) = ThroughputSample::from_eval(model, eval, service) else {
            return;
        };

        let reporter = self.clone();
        tokio::spawn(async move {
            reporter.send(sample).await;
        });
    }

    /// Deliver one sample, swallowing any error.
    pub(crate) async fn send(&self, sample: ThroughputSample) {
        let Some(url) = &self.record_url else { return };

        let body = json!({
            "model": sample.model,
            "output_tokens_per_sec": sample.output_tokens_per_sec,
            "service": sample.service,
        });

        if let Err(e) = self
            .client
            .post_json(url, Vec::new(), &body, TELEMETRY_TIMEOUT)
            .await
        {
            debug!(error = %e, "throughput sample dropped");
        }
    }
}
