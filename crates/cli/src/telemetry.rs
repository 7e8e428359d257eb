//! Usage telemetry
//!
//! One event per capture, posted fire-and-forget. Failures are logged and
//! dropped; nothing here ever reaches the user.

use crate::config::TelemetryConfig;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Context tag for captures triggered by the keyboard shortcut
pub const FROM_SHORTCUT: &str = "fromShortcut";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryEvent {
    pub context: String,
    pub user_identifier: String,
    pub autosave_enabled: bool,
    pub no_entries: usize,
    /// Mean description length excluding the newest entry
    pub avg_desc_len: Option<f64>,
}

pub trait TelemetrySink: Send + Sync {
    fn record(&self, event: TelemetryEvent);
}

/// Drops every event
pub struct NoopTelemetry;

impl TelemetrySink for NoopTelemetry {
    fn record(&self, event: TelemetryEvent) {
        debug!(context = %event.context, "Telemetry disabled, dropping event");
    }
}

/// Posts events as JSON to a REST endpoint
pub struct HttpTelemetry {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpTelemetry {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }

    fn request(&self, event: &TelemetryEvent) -> reqwest::RequestBuilder {
        self.http
            .post(&self.endpoint)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=minimal")
            .json(event)
    }
}

impl TelemetrySink for HttpTelemetry {
    fn record(&self, event: TelemetryEvent) {
        let request = self.request(&event);
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime, dropping telemetry event");
            return;
        };

        runtime.spawn(async move {
            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(context = %event.context, "Telemetry event sent");
                }
                Ok(response) => warn!("Failed to log action: HTTP {}", response.status()),
                Err(e) => warn!("Failed to log action: {}", e),
            }
        });
    }
}

/// Sink for the configured telemetry settings
pub fn from_config(config: &TelemetryConfig) -> Arc<dyn TelemetrySink> {
    let endpoint = config.endpoint.as_deref().filter(|e| !e.trim().is_empty());
    match (config.enabled, endpoint) {
        (true, Some(endpoint)) => {
            let api_key = config.api_key.clone().unwrap_or_default();
            match HttpTelemetry::new(endpoint, api_key) {
                Ok(sink) => Arc::new(sink),
                Err(e) => {
                    warn!("Telemetry client unavailable: {}", e);
                    Arc::new(NoopTelemetry)
                }
            }
        }
        _ => Arc::new(NoopTelemetry),
    }
}
