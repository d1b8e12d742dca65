//! Anomaly classification.
//!
//! Shared by exploration and replay so both see identical markers for
//! identical inputs. Output order is canonical (sorted by marker key).

use std::collections::BTreeMap;

use ferret_model::{AnomalyMarker, ExchangeStatus, MarkerKey, StateSnapshot};

use crate::config::EnvConfig;
use crate::transport::TransportError;

/// Prefix of the invariant subject for a negative quantity.
pub const NEGATIVE_INVENTORY: &str = "inventory_negative";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classifier {
    pub slow_threshold_ms: u64,
    pub request_timeout_ms: u64,
}

impl Classifier {
    pub fn from_config(config: &EnvConfig) -> Self {
        Self {
            slow_threshold_ms: config.slow_threshold_ms,
            request_timeout_ms: config.request_timeout_ms,
        }
    }

    pub fn classify(
        &self,
        status: &ExchangeStatus,
        failure: Option<&TransportError>,
        latency_ms: f64,
        snapshot: &StateSnapshot,
    ) -> Vec<AnomalyMarker> {
        let mut markers: BTreeMap<MarkerKey, AnomalyMarker> = BTreeMap::new();
        let mut add = |marker: AnomalyMarker| {
            markers.entry(marker.key()).or_insert(marker);
        };

        match status {
            ExchangeStatus::Http { code } if *code >= 400 => add(AnomalyMarker::http_error(*code)),
            ExchangeStatus::Http { .. } => {}
            ExchangeStatus::Timeout => add(AnomalyMarker::timeout(self.request_timeout_ms)),
            ExchangeStatus::Unreachable => {
                let detail = failure.map(|f| f.to_string()).unwrap_or_default();
                add(AnomalyMarker::unreachable(&detail));
            }
        }

        if latency_ms > self.slow_threshold_ms as f64 {
            add(AnomalyMarker::slow_response(latency_ms, self.slow_threshold_ms));
        }

        // Engine-side check first so its evidence wins over the bare flag.
        for (item, qty) in snapshot.negative_items() {
            add(AnomalyMarker::invariant_violation(
                &format!("{NEGATIVE_INVENTORY}:{item}"),
                Some(serde_json::Value::from(qty)),
            ));
        }
        for violation in &snapshot.violations {
            add(AnomalyMarker::invariant_violation(violation, None));
        }
        for alert in &snapshot.alerts {
            add(AnomalyMarker::alert(alert));
        }

        markers.into_values().collect()
    }
}
