use std::time::Duration;

use reqwest::blocking::Client;
use tracing::debug;

use ferret_model::Method;

use crate::config::EnvConfig;
use crate::transport::{TargetRequest, TargetResponse, Transport, TransportError, LATENCY_HEADER};

/// Blocking HTTP transport with a bounded per-request timeout.
///
/// Every request stays under the configured base address; the transport
/// never follows links to other hosts.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| TransportError::Setup(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn from_config(config: &EnvConfig) -> Result<Self, TransportError> {
        Self::new(&config.base_url, config.request_timeout())
    }

    fn map_error(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            TransportError::Unreachable(err.to_string())
        }
    }
}

impl Transport for HttpTransport {
    fn send(&mut self, request: &TargetRequest) -> Result<TargetResponse, TransportError> {
        let url = format!("{}{}", self.base_url, request.path);
        let builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        let builder = match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        };

        let response = builder.send().map_err(|e| self.map_error(e))?;
        let status = response.status().as_u16();
        let reported_latency_ms = response
            .headers()
            .get(LATENCY_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<f64>().ok());
        // The status has arrived; a body cut short must not turn the exchange
        // into a transport failure.
        let body = match response.text() {
            Ok(text) => parse_body(&text),
            Err(e) => {
                debug!(status, error = %e, "response body unreadable");
                serde_json::Value::Null
            }
        };

        Ok(TargetResponse {
            status,
            body,
            reported_latency_ms,
        })
    }

    fn target(&self) -> &str {
        &self.base_url
    }
}

fn parse_body(text: &str) -> serde_json::Value {
    if text.trim().is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| serde_json::json!({ "raw_body": text }))
}
