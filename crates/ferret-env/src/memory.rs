//! In-process reference target.
//!
//! Implements the target contract (action endpoints, state, diagnostics,
//! reset) for a small stateful inventory store, deterministically and without
//! sockets. It carries a deliberate regression: expedited purchases debit
//! stock before checking availability. Tests and demos run the engine
//! against it; `handle` can also be served over real HTTP.

use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use serde_json::{json, Value};

use ferret_model::Method;

use crate::transport::{TargetRequest, TargetResponse, Transport, TransportError};

const EVENT_CAPACITY: usize = 200;
const RECENT_EVENTS: usize = 10;
const RECENT_ORDERS: usize = 5;
const MODES: [&str; 3] = ["normal", "maintenance", "slow"];

/// Injectable misbehavior of the reference target.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetFaults {
    /// Expedited purchases skip the availability check (the planted bug).
    pub expedite_skips_stock_check: bool,
    /// Reset answers 503 instead of restoring the baseline.
    pub fail_reset: bool,
    /// Every request fails as if the host were down.
    pub unreachable: bool,
    /// Purchases sleep this long while the store is in slow mode.
    pub slow_mode_delay: Duration,
}

impl Default for TargetFaults {
    fn default() -> Self {
        Self {
            expedite_skips_stock_check: true,
            fail_reset: false,
            unreachable: false,
            slow_mode_delay: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
struct Order {
    item: String,
    quantity: i64,
    expedite: bool,
    status: &'static str,
    order_id: usize,
}

#[derive(Debug, Clone)]
struct StoreEvent {
    name: String,
    detail: Value,
    state_version: u64,
}

#[derive(Debug, Clone)]
struct Store {
    inventory: BTreeMap<String, i64>,
    mode: String,
    orders: Vec<Order>,
    state_version: u64,
    events: VecDeque<StoreEvent>,
    alerts: Vec<String>,
}

impl Store {
    fn baseline() -> Self {
        let mut store = Self {
            inventory: BTreeMap::from([
                ("widgets".to_string(), 6),
                ("gadgets".to_string(), 3),
                ("doodads".to_string(), 2),
            ]),
            mode: "normal".to_string(),
            orders: Vec::new(),
            state_version: 0,
            events: VecDeque::new(),
            alerts: Vec::new(),
        };
        store.record("reset", json!({"reason": "api"}));
        store
    }

    fn record(&mut self, name: &str, detail: Value) {
        self.events.push_back(StoreEvent {
            name: name.to_string(),
            detail,
            state_version: self.state_version,
        });
        while self.events.len() > EVENT_CAPACITY {
            self.events.pop_front();
        }
    }

    fn invariant_flags(&self) -> Vec<String> {
        let mut flags: Vec<String> = self
            .inventory
            .iter()
            .filter(|(_, qty)| **qty < 0)
            .map(|(item, _)| format!("inventory_negative:{item}"))
            .collect();
        if self.mode == "maintenance" && !self.orders.is_empty() {
            flags.push("orders_in_maintenance".to_string());
        }
        flags
    }

    fn summary(&self) -> Value {
        let orders: Vec<Value> = self
            .orders
            .iter()
            .rev()
            .take(RECENT_ORDERS)
            .rev()
            .map(|o| {
                json!({
                    "item": o.item,
                    "quantity": o.quantity,
                    "expedite": o.expedite,
                    "status": o.status,
                    "order_id": o.order_id,
                })
            })
            .collect();
        let recent_events: Vec<Value> = self
            .events
            .iter()
            .skip(self.events.len().saturating_sub(RECENT_EVENTS))
            .map(|e| json!({"name": e.name, "detail": e.detail, "state_version": e.state_version}))
            .collect();
        json!({
            "inventory": self.inventory,
            "mode": self.mode,
            "orders": orders,
            "orders_total": self.orders.len(),
            "state_version": self.state_version,
            "alerts": self.alerts,
            "invariants": self.invariant_flags(),
            "recent_events": recent_events,
        })
    }

    fn log_lines(&self) -> Vec<String> {
        self.events
            .iter()
            .map(|e| format!("event={} detail={}", e.name, e.detail))
            .collect()
    }
}

/// Deterministic in-memory implementation of the target contract.
#[derive(Debug, Clone)]
pub struct InMemoryTarget {
    store: Store,
    faults: TargetFaults,
    requests_served: u64,
}

impl InMemoryTarget {
    pub fn new() -> Self {
        Self::with_faults(TargetFaults::default())
    }

    pub fn with_faults(faults: TargetFaults) -> Self {
        Self {
            store: Store::baseline(),
            faults,
            requests_served: 0,
        }
    }

    pub fn faults_mut(&mut self) -> &mut TargetFaults {
        &mut self.faults
    }

    /// Total requests handled, including state and diagnostics reads.
    pub fn requests_served(&self) -> u64 {
        self.requests_served
    }

    /// Current quantity of an item, for assertions.
    pub fn quantity(&self, item: &str) -> i64 {
        self.store.inventory.get(item).copied().unwrap_or(0)
    }

    /// Serve one request. Returns `(status, body)`.
    pub fn handle(&mut self, method: Method, path: &str, body: Option<&Value>) -> (u16, Value) {
        self.requests_served += 1;
        let empty = json!({});
        let payload = body.unwrap_or(&empty);

        match (method, path) {
            (Method::Post, "/reset") => {
                if self.faults.fail_reset {
                    return (503, json!({"error": "reset unavailable"}));
                }
                self.store = Store::baseline();
                (200, json!({"state": self.store.summary()}))
            }
            (Method::Get, "/state") | (Method::Get, "/inventory") => {
                (200, json!({"state": self.store.summary()}))
            }
            (Method::Get, "/diagnostics") => (
                200,
                json!({
                    "logs": self.store.log_lines(),
                    "state": self.store.summary(),
                    "meta": {"app": "inventory-store", "description": "in-memory reference target"},
                }),
            ),
            (Method::Post, "/inventory") => self.restock(payload),
            (Method::Post, "/purchase") => self.purchase(payload),
            (Method::Post, "/mode") => self.toggle_mode(payload),
            _ => (404, json!({"error": "not found"})),
        }
    }

    fn restock(&mut self, payload: &Value) -> (u16, Value) {
        let (Some(item), Some(quantity)) = (payload.get("item"), payload.get("quantity")) else {
            return (400, json!({"error": "item and quantity required"}));
        };
        let Some(quantity) = as_int(quantity) else {
            return (400, json!({"error": "quantity must be integer"}));
        };
        if quantity == 0 {
            return (422, json!({"error": "quantity must not be zero"}));
        }
        let item = item_name(item);
        *self.store.inventory.entry(item.clone()).or_insert(0) += quantity;
        self.store.state_version += 1;
        self.store
            .record("restock", json!({"item": item, "quantity": quantity}));
        (201, json!({"state": self.store.summary()}))
    }

    fn purchase(&mut self, payload: &Value) -> (u16, Value) {
        let (Some(item), Some(quantity)) = (payload.get("item"), payload.get("quantity")) else {
            return (400, json!({"error": "item and quantity required"}));
        };
        let Some(quantity) = as_int(quantity) else {
            return (400, json!({"error": "quantity must be integer"}));
        };
        let expedite = payload
            .get("expedite")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let item = item_name(item);

        if self.store.mode == "slow" && !self.faults.slow_mode_delay.is_zero() {
            std::thread::sleep(self.faults.slow_mode_delay);
        }
        if quantity <= 0 {
            return (422, json!({"error": "quantity must be positive"}));
        }
        if self.store.mode == "maintenance" {
            self.store.record(
                "purchase_rejected",
                json!({"item": item, "reason": "maintenance"}),
            );
            return (
                409,
                json!({"error": "store in maintenance mode", "state": self.store.summary()}),
            );
        }

        let available = self.store.inventory.get(&item).copied().unwrap_or(0);
        let status = if expedite && self.faults.expedite_skips_stock_check {
            "accepted_expedited_without_validation"
        } else {
            if available < quantity {
                self.store.record(
                    "purchase_conflict",
                    json!({"item": item, "requested": quantity, "available": available}),
                );
                return (
                    409,
                    json!({"error": "not enough inventory", "state": self.store.summary()}),
                );
            }
            "accepted"
        };
        let remaining = available - quantity;
        self.store.inventory.insert(item.clone(), remaining);

        let order = Order {
            item: item.clone(),
            quantity,
            expedite,
            status,
            order_id: self.store.orders.len() + 1,
        };
        self.store.orders.push(order);
        self.store.state_version += 1;
        if remaining < 0 {
            self.store.alerts.push(format!("oversold:{item}"));
        }
        self.store.record(
            "purchase",
            json!({"item": item, "quantity": quantity, "expedite": expedite, "status": status}),
        );
        (201, json!({"state": self.store.summary()}))
    }

    fn toggle_mode(&mut self, payload: &Value) -> (u16, Value) {
        let Some(mode) = payload.get("mode").and_then(Value::as_str) else {
            return (400, json!({"error": "mode required"}));
        };
        if !MODES.contains(&mode) {
            return (
                400,
                json!({"error": "mode must be one of normal|maintenance|slow"}),
            );
        }
        self.store.mode = mode.to_string();
        self.store.state_version += 1;
        self.store.record("mode_change", json!({"mode": mode}));
        (200, json!({"state": self.store.summary()}))
    }
}

impl Default for InMemoryTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for InMemoryTarget {
    fn send(&mut self, request: &TargetRequest) -> Result<TargetResponse, TransportError> {
        if self.faults.unreachable {
            return Err(TransportError::Unreachable("connection refused".to_string()));
        }
        let (status, body) = self.handle(request.method, &request.path, request.body.as_ref());
        Ok(TargetResponse {
            status,
            body,
            reported_latency_ms: None,
        })
    }

    fn target(&self) -> &str {
        "memory://inventory-store"
    }
}

fn as_int(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

fn item_name(value: &Value) -> String {
    value
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(target: &mut InMemoryTarget, path: &str, body: Value) -> (u16, Value) {
        target.handle(Method::Post, path, Some(&body))
    }

    #[test]
    fn test_baseline_state() {
        let mut target = InMemoryTarget::new();
        let (status, body) = target.handle(Method::Get, "/state", None);
        assert_eq!(status, 200);
        assert_eq!(body["state"]["inventory"]["widgets"], 6);
        assert_eq!(body["state"]["mode"], "normal");
        assert_eq!(body["state"]["recent_events"][0]["name"], "reset");
    }

    #[test]
    fn test_checked_purchase_conflicts() {
        let mut target = InMemoryTarget::new();
        let (status, _) = post(
            &mut target,
            "/purchase",
            json!({"item": "gadgets", "quantity": 5, "expedite": false}),
        );
        assert_eq!(status, 409);
        assert_eq!(target.quantity("gadgets"), 3);
    }

    #[test]
    fn test_expedited_purchase_oversells() {
        let mut target = InMemoryTarget::new();
        let (status, body) = post(
            &mut target,
            "/purchase",
            json!({"item": "gadgets", "quantity": 5, "expedite": true}),
        );
        assert_eq!(status, 201);
        assert_eq!(target.quantity("gadgets"), -2);
        assert_eq!(body["state"]["alerts"][0], "oversold:gadgets");
        assert_eq!(body["state"]["invariants"][0], "inventory_negative:gadgets");
    }

    #[test]
    fn test_fixed_target_rejects_expedited_oversell() {
        let mut target = InMemoryTarget::with_faults(TargetFaults {
            expedite_skips_stock_check: false,
            ..Default::default()
        });
        let (status, _) = post(
            &mut target,
            "/purchase",
            json!({"item": "gadgets", "quantity": 5, "expedite": true}),
        );
        assert_eq!(status, 409);
    }

    #[test]
    fn test_maintenance_blocks_purchases() {
        let mut target = InMemoryTarget::new();
        assert_eq!(post(&mut target, "/mode", json!({"mode": "maintenance"})).0, 200);
        let (status, _) = post(
            &mut target,
            "/purchase",
            json!({"item": "widgets", "quantity": 1}),
        );
        assert_eq!(status, 409);
    }

    #[test]
    fn test_restock_validation() {
        let mut target = InMemoryTarget::new();
        assert_eq!(post(&mut target, "/inventory", json!({"item": "widgets"})).0, 400);
        assert_eq!(
            post(&mut target, "/inventory", json!({"item": "widgets", "quantity": "x"})).0,
            400
        );
        assert_eq!(
            post(&mut target, "/inventory", json!({"item": "widgets", "quantity": 0})).0,
            422
        );
        assert_eq!(
            post(&mut target, "/inventory", json!({"item": "widgets", "quantity": -2})).0,
            201
        );
        assert_eq!(target.quantity("widgets"), 4);
    }

    #[test]
    fn test_reset_restores_baseline() {
        let mut target = InMemoryTarget::new();
        post(
            &mut target,
            "/purchase",
            json!({"item": "doodads", "quantity": 4, "expedite": true}),
        );
        assert_eq!(target.quantity("doodads"), -2);
        assert_eq!(post(&mut target, "/reset", json!({})).0, 200);
        assert_eq!(target.quantity("doodads"), 2);
    }

    #[test]
    fn test_unknown_route_is_404() {
        let mut target = InMemoryTarget::new();
        assert_eq!(target.handle(Method::Get, "/admin", None).0, 404);
    }

    #[test]
    fn test_unreachable_fault() {
        let mut target = InMemoryTarget::with_faults(TargetFaults {
            unreachable: true,
            ..Default::default()
        });
        let err = target.send(&TargetRequest::get("/state")).unwrap_err();
        assert!(matches!(err, TransportError::Unreachable(_)));
    }
}
