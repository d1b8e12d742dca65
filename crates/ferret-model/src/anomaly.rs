use std::fmt;

use serde::{Deserialize, Serialize};

/// Class of abnormal behavior observed at one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// A state invariant broke, e.g. a quantity went negative.
    StateInvariantViolation,
    /// The target answered with a 4xx/5xx status.
    HttpError,
    /// Latency strictly above the configured threshold.
    SlowResponse,
    /// No answer within the request timeout.
    Timeout,
    /// Connection could not be made or was dropped.
    Unreachable,
    /// The target raised an alert of its own.
    AlertRaised,
}

impl AnomalyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyKind::StateInvariantViolation => "state_invariant_violation",
            AnomalyKind::HttpError => "http_error",
            AnomalyKind::SlowResponse => "slow_response",
            AnomalyKind::Timeout => "timeout",
            AnomalyKind::Unreachable => "unreachable",
            AnomalyKind::AlertRaised => "alert_raised",
        }
    }
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable identity of a marker: kind plus subject, without volatile evidence
/// such as measured latency. Replay and determinism checks compare keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarkerKey {
    pub kind: AnomalyKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl fmt::Display for MarkerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subject {
            Some(subject) => write!(f, "{}:{subject}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// A tagged, evidenced record of abnormal behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyMarker {
    pub kind: AnomalyKind,
    /// What the marker is about: violated field, status code, alert id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<serde_json::Value>,
}

impl AnomalyMarker {
    pub fn invariant_violation(subject: &str, observed: Option<serde_json::Value>) -> Self {
        Self {
            kind: AnomalyKind::StateInvariantViolation,
            subject: Some(subject.to_string()),
            observed,
            threshold: None,
        }
    }

    pub fn http_error(status: u16) -> Self {
        Self {
            kind: AnomalyKind::HttpError,
            subject: Some(status.to_string()),
            observed: Some(serde_json::Value::from(status)),
            threshold: Some(serde_json::Value::from(400u16)),
        }
    }

    pub fn slow_response(latency_ms: f64, threshold_ms: u64) -> Self {
        Self {
            kind: AnomalyKind::SlowResponse,
            subject: None,
            observed: Some(serde_json::Value::from(latency_ms)),
            threshold: Some(serde_json::Value::from(threshold_ms)),
        }
    }

    pub fn timeout(timeout_ms: u64) -> Self {
        Self {
            kind: AnomalyKind::Timeout,
            subject: None,
            observed: None,
            threshold: Some(serde_json::Value::from(timeout_ms)),
        }
    }

    pub fn unreachable(detail: &str) -> Self {
        Self {
            kind: AnomalyKind::Unreachable,
            subject: None,
            observed: Some(serde_json::Value::String(detail.to_string())),
            threshold: None,
        }
    }

    pub fn alert(subject: &str) -> Self {
        Self {
            kind: AnomalyKind::AlertRaised,
            subject: Some(subject.to_string()),
            observed: None,
            threshold: None,
        }
    }

    pub fn key(&self) -> MarkerKey {
        MarkerKey {
            kind: self.kind,
            subject: self.subject.clone(),
        }
    }
}

impl fmt::Display for AnomalyMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())?;
        if let Some(observed) = &self.observed {
            write!(f, " observed={observed}")?;
        }
        if let Some(threshold) = &self.threshold {
            write!(f, " threshold={threshold}")?;
        }
        Ok(())
    }
}
