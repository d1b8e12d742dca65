use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// One entry from the target's bounded event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetEvent {
    pub name: String,
    #[serde(default)]
    pub detail: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_version: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

/// Fixed-shape view of the target's state, as returned by its state endpoint.
///
/// Every field is optional on the wire; missing collections read as empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StateSnapshot {
    #[serde(default)]
    pub mode: Option<String>,
    /// Item -> quantity. Quantities must never go negative.
    #[serde(default)]
    pub inventory: BTreeMap<String, i64>,
    #[serde(default)]
    pub alerts: BTreeSet<String>,
    /// Invariant flags reported by the target itself.
    #[serde(default, alias = "invariants")]
    pub violations: BTreeSet<String>,
    #[serde(default)]
    pub recent_events: Vec<TargetEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orders_total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_version: Option<u64>,
}

impl StateSnapshot {
    /// Parse a snapshot out of a response body.
    ///
    /// Accepts both the enveloped form `{"state": {...}}` and a bare snapshot
    /// object. Returns None when the body carries neither.
    pub fn from_response_body(body: &serde_json::Value) -> Option<Self> {
        let candidate = match body.get("state") {
            Some(inner) if inner.is_object() => inner,
            _ if body.is_object() && looks_like_snapshot(body) => body,
            _ => return None,
        };
        serde_json::from_value(candidate.clone()).ok()
    }

    /// Quantity on hand for an item; unknown items count as zero.
    pub fn quantity(&self, item: &str) -> i64 {
        self.inventory.get(item).copied().unwrap_or(0)
    }

    /// Items whose quantity is below zero, in item order.
    pub fn negative_items(&self) -> impl Iterator<Item = (&str, i64)> + '_ {
        self.inventory
            .iter()
            .filter(|(_, qty)| **qty < 0)
            .map(|(item, qty)| (item.as_str(), *qty))
    }
}

fn looks_like_snapshot(body: &serde_json::Value) -> bool {
    ["mode", "inventory", "alerts", "invariants", "violations"]
        .iter()
        .any(|key| body.get(key).is_some())
}
