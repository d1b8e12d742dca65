use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::anomaly::{AnomalyKind, AnomalyMarker, MarkerKey};
use crate::signature::StateSignature;
use crate::snapshot::StateSnapshot;

/// Outcome of the action request itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExchangeStatus {
    Http { code: u16 },
    /// Sentinel: the request never got an HTTP answer.
    Unreachable,
    /// Sentinel: no answer within the request timeout.
    Timeout,
}

impl ExchangeStatus {
    pub fn code(&self) -> Option<u16> {
        match self {
            ExchangeStatus::Http { code } => Some(*code),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExchangeStatus::Http { code } if (200..300).contains(code))
    }
}

impl fmt::Display for ExchangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangeStatus::Http { code } => write!(f, "{code}"),
            ExchangeStatus::Unreachable => f.write_str("unreachable"),
            ExchangeStatus::Timeout => f.write_str("timeout"),
        }
    }
}

/// Structured result of executing one action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub status: ExchangeStatus,
    /// Wall-clock latency measured by the engine.
    pub latency_ms: f64,
    /// Latency the target echoed in a response header, if any. Informational.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_latency_ms: Option<f64>,
    /// Body of the action response; `{"raw_body": ..}` when it was not JSON,
    /// null when no response arrived.
    #[serde(default)]
    pub response: serde_json::Value,
    /// Snapshot read after the action completed.
    pub state: StateSnapshot,
    /// Most recent diagnostic log lines, oldest first.
    #[serde(default)]
    pub log_excerpt: Vec<String>,
    #[serde(default)]
    pub markers: Vec<AnomalyMarker>,
}

impl Observation {
    pub fn signature(&self) -> StateSignature {
        StateSignature::of(&self.state)
    }

    pub fn is_anomalous(&self) -> bool {
        !self.markers.is_empty()
    }

    pub fn marker_keys(&self) -> BTreeSet<MarkerKey> {
        self.markers.iter().map(AnomalyMarker::key).collect()
    }

    /// Distinct anomaly kinds present at this step.
    pub fn kinds(&self) -> BTreeSet<AnomalyKind> {
        self.markers.iter().map(|m| m.kind).collect()
    }
}
