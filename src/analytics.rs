use std::future::Future;
use std::time::Duration;

use serde_json::json;

use crate::config::AnalyticsConfig;
use crate::golem_error::{GolemError, Result};
use crate::http;
use crate::log_warn;

pub const EVENT_REQUESTED: &str = "optimization_requested";
pub const EVENT_COMPLETED: &str = "optimization_completed";
pub const EVENT_FAILED: &str = "optimization_failed";

pub trait Analytics: Send + Sync {
    fn capture(&self, event: &str, job_id: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Capture an event, logging instead of propagating any failure.
pub async fn capture_logged<A: Analytics>(analytics: &A, event: &str, job_id: &str) {
    if let Err(e) = analytics.capture(event, job_id).await {
        log_warn!("[analytics] Failed to capture '{}' for {}: {}", event, job_id, e);
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAnalytics;

impl Analytics for NoopAnalytics {
    async fn capture(&self, _event: &str, _job_id: &str) -> Result<()> {
        Ok(())
    }
}

/// Posts events to a PostHog-style `/capture/` endpoint.
#[derive(Debug, Clone)]
pub struct HttpAnalytics {
    client: reqwest::Client,
    capture_url: String,
    api_key: String,
}

impl HttpAnalytics {
    pub fn new(config: &AnalyticsConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(GolemError::Config("analytics.api_key is empty".to_string()));
        }
        Ok(Self {
            client: http::build_client(&[], Duration::from_secs(10))?,
            capture_url: format!("{}/capture/", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
        })
    }
}

impl Analytics for HttpAnalytics {
    async fn capture(&self, event: &str, job_id: &str) -> Result<()> {
        let request = self.client.post(&self.capture_url).json(&json!({
            "api_key": self.api_key,
            "event": event,
            "properties": { "distinct_id": job_id },
        }));
        http::send(request, 200).await?;
        Ok(())
    }
}

/// Either backend, chosen from config at startup.
pub enum AnyAnalytics {
    Noop(NoopAnalytics),
    Http(HttpAnalytics),
}

impl AnyAnalytics {
    pub fn from_config(config: &AnalyticsConfig) -> Result<Self> {
        if config.enabled {
            Ok(AnyAnalytics::Http(HttpAnalytics::new(config)?))
        } else {
            Ok(AnyAnalytics::Noop(NoopAnalytics))
        }
    }
}

impl Analytics for AnyAnalytics {
    async fn capture(&self, event: &str, job_id: &str) -> Result<()> {
        match self {
            AnyAnalytics::Noop(a) => a.capture(event, job_id).await,
            AnyAnalytics::Http(a) => a.capture(event, job_id).await,
        }
    }
}
