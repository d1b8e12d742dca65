//! Environment configuration: where the target lives and how to judge it.

use serde::{Deserialize, Serialize};

/// Configuration for talking to one target service.
///
/// Classification thresholds live here so that exploration and replay judge
/// observations with identical rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    /// Base address of the target, e.g. `http://127.0.0.1:8000`.
    pub base_url: String,
    /// Bound on every request to the target.
    pub request_timeout_ms: u64,
    /// Latency strictly above this is a slow response.
    pub slow_threshold_ms: u64,
    /// Number of most recent log lines kept per observation.
    pub log_tail: usize,
    pub state_path: String,
    pub diagnostics_path: String,
    pub reset_path: String,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            request_timeout_ms: 5_000,
            slow_threshold_ms: 250,
            log_tail: 10,
            state_path: "/state".to_string(),
            diagnostics_path: "/diagnostics".to_string(),
            reset_path: "/reset".to_string(),
        }
    }
}

impl EnvConfig {
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.request_timeout_ms)
    }
}
