use std::time::Instant;

use tracing::{debug, info, warn};

use ferret_model::{Action, ExchangeStatus, Method, Observation, StateSnapshot};

use crate::classify::Classifier;
use crate::config::EnvConfig;
use crate::transport::{TargetRequest, Transport, TransportError};

#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error("Reset failed against {target}: {reason}")]
    ResetFailure { target: String, reason: String },
}

/// The only component that talks to the target. Turns one action into one
/// observation; failures of the exchange are recorded, never raised.
pub struct Environment<T: Transport> {
    transport: T,
    config: EnvConfig,
    classifier: Classifier,
}

impl<T: Transport> Environment<T> {
    pub fn new(transport: T, config: EnvConfig) -> Self {
        let classifier = Classifier::from_config(&config);
        Self {
            transport,
            config,
            classifier,
        }
    }

    /// Identity of the target, as recorded in artifacts.
    pub fn target(&self) -> &str {
        self.transport.target()
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Restore the target's baseline and return the baseline snapshot.
    ///
    /// Anything but a 2xx acknowledgement is a `ResetFailure`.
    pub fn reset(&mut self) -> Result<StateSnapshot, EnvError> {
        let request = TargetRequest::post(&self.config.reset_path, serde_json::json!({}));
        let response = self.transport.send(&request).map_err(|e| {
            warn!(target_service = %self.transport.target(), error = %e, "reset not acknowledged");
            EnvError::ResetFailure {
                target: self.transport.target().to_string(),
                reason: e.to_string(),
            }
        })?;
        if !response.is_success() {
            warn!(target_service = %self.transport.target(), status = response.status, "reset rejected");
            return Err(EnvError::ResetFailure {
                target: self.transport.target().to_string(),
                reason: format!("target answered status {}", response.status),
            });
        }

        let snapshot = self
            .read_state()
            .or_else(|| StateSnapshot::from_response_body(&response.body))
            .unwrap_or_default();
        info!(target_service = %self.transport.target(), "target reset to baseline");
        Ok(snapshot)
    }

    /// Whether the state endpoint currently answers with a 2xx.
    pub fn probe(&mut self) -> bool {
        let request = TargetRequest::get(&self.config.state_path);
        matches!(self.transport.send(&request), Ok(resp) if resp.is_success())
    }

    /// Execute one action and package everything observed about it.
    pub fn execute(&mut self, action: &Action) -> Observation {
        let route = action.route();
        let request = match route.method {
            Method::Get => TargetRequest::get(&route.path),
            Method::Post => TargetRequest::post(&route.path, action.body()),
        };

        let start = Instant::now();
        let outcome = self.transport.send(&request);
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        let (status, failure, response, reported_latency_ms) = match outcome {
            Ok(resp) => (
                ExchangeStatus::Http { code: resp.status },
                None,
                resp.body,
                resp.reported_latency_ms,
            ),
            Err(TransportError::Timeout { timeout_ms }) => (
                ExchangeStatus::Timeout,
                Some(TransportError::Timeout { timeout_ms }),
                serde_json::Value::Null,
                None,
            ),
            Err(err) => (
                ExchangeStatus::Unreachable,
                Some(err),
                serde_json::Value::Null,
                None,
            ),
        };

        let state = self
            .read_state()
            .or_else(|| StateSnapshot::from_response_body(&response))
            .unwrap_or_default();
        let log_excerpt = self.read_logs();
        let markers = self
            .classifier
            .classify(&status, failure.as_ref(), latency_ms, &state);

        debug!(
            action = %action,
            status = %status,
            latency_ms,
            markers = markers.len(),
            "executed action"
        );

        Observation {
            status,
            latency_ms,
            reported_latency_ms,
            response,
            state,
            log_excerpt,
            markers,
        }
    }

    fn read_state(&mut self) -> Option<StateSnapshot> {
        let request = TargetRequest::get(&self.config.state_path);
        match self.transport.send(&request) {
            Ok(resp) if resp.is_success() => StateSnapshot::from_response_body(&resp.body),
            Ok(resp) => {
                debug!(status = resp.status, "state read rejected");
                None
            }
            Err(e) => {
                debug!(error = %e, "state read failed");
                None
            }
        }
    }

    fn read_logs(&mut self) -> Vec<String> {
        let request = TargetRequest::get(&self.config.diagnostics_path);
        match self.transport.send(&request) {
            Ok(resp) if resp.is_success() => tail(log_lines(&resp.body), self.config.log_tail),
            _ => Vec::new(),
        }
    }
}

/// Extract log lines from a diagnostics body.
///
/// Accepts `logs` or `lines` string arrays; otherwise renders
/// `state.recent_events` as compact JSON lines.
fn log_lines(body: &serde_json::Value) -> Vec<String> {
    for key in ["logs", "lines"] {
        if let Some(lines) = body.get(key).and_then(|v| v.as_array()) {
            return lines
                .iter()
                .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                .collect();
        }
    }
    body.pointer("/state/recent_events")
        .and_then(|v| v.as_array())
        .map(|events| events.iter().map(|e| e.to_string()).collect())
        .unwrap_or_default()
}

fn tail(mut lines: Vec<String>, keep: usize) -> Vec<String> {
    if lines.len() > keep {
        lines.drain(..lines.len() - keep);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_log_lines_prefers_logs_array() {
        let body = json!({"logs": ["a", "b"], "state": {"recent_events": [{"name": "x"}]}});
        assert_eq!(log_lines(&body), vec!["a", "b"]);
    }

    #[test]
    fn test_log_lines_falls_back_to_events() {
        let body = json!({"state": {"recent_events": [{"name": "reset"}]}});
        assert_eq!(log_lines(&body), vec![r#"{"name":"reset"}"#]);
        assert!(log_lines(&json!({})).is_empty());
    }

    #[test]
    fn test_tail_keeps_most_recent() {
        let lines: Vec<String> = (0..5).map(|i| i.to_string()).collect();
        assert_eq!(tail(lines.clone(), 2), vec!["3", "4"]);
        assert_eq!(tail(lines, 10).len(), 5);
    }
}
