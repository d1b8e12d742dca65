use ferret_env::{EnvConfig, EnvError, Environment, InMemoryTarget, TargetFaults};
use ferret_model::{ActionParams, AnomalyKind, ExchangeStatus, MarkerKey, ParamValue};
use ferret_space::ActionSpace;

fn env_with(faults: TargetFaults) -> Environment<InMemoryTarget> {
    Environment::new(InMemoryTarget::with_faults(faults), EnvConfig::default())
}

fn purchase(item: &str, quantity: i64, expedite: bool) -> ferret_model::Action {
    let mut params = ActionParams::new();
    params.insert("item".into(), ParamValue::Text(item.into()));
    params.insert("quantity".into(), ParamValue::Int(quantity));
    params.insert("expedite".into(), ParamValue::Bool(expedite));
    ActionSpace::inventory_store()
        .instantiate_with("purchase", params)
        .unwrap()
}

#[test]
fn test_reset_returns_baseline_snapshot() {
    let mut env = env_with(TargetFaults::default());
    let snapshot = env.reset().unwrap();
    assert_eq!(snapshot.quantity("widgets"), 6);
    assert_eq!(snapshot.quantity("doodads"), 2);
    assert_eq!(snapshot.mode.as_deref(), Some("normal"));
    assert_eq!(env.target(), "memory://inventory-store");
}

#[test]
fn test_reset_failure_is_error() {
    let mut env = env_with(TargetFaults {
        fail_reset: true,
        ..Default::default()
    });
    let err = env.reset().unwrap_err();
    let EnvError::ResetFailure { target, reason } = err;
    assert_eq!(target, "memory://inventory-store");
    assert!(reason.contains("503"), "unexpected reason: {reason}");
}

#[test]
fn test_reset_failure_when_unreachable() {
    let mut env = env_with(TargetFaults {
        unreachable: true,
        ..Default::default()
    });
    assert!(env.reset().is_err());
    assert!(!env.probe());
}

#[test]
fn test_execute_clean_action() {
    let mut env = env_with(TargetFaults::default());
    env.reset().unwrap();
    let obs = env.execute(&purchase("widgets", 1, false));
    assert_eq!(obs.status, ExchangeStatus::Http { code: 201 });
    assert_eq!(obs.state.quantity("widgets"), 5);
    assert!(obs.markers.is_empty(), "markers: {:?}", obs.markers);
    assert!(!obs.log_excerpt.is_empty());
    assert!(obs.log_excerpt.len() <= EnvConfig::default().log_tail);
}

#[test]
fn test_execute_oversell_marks_invariant_and_alert() {
    let mut env = env_with(TargetFaults::default());
    env.reset().unwrap();
    let obs = env.execute(&purchase("doodads", 10, true));
    assert_eq!(obs.state.quantity("doodads"), -8);
    let keys = obs.marker_keys();
    assert!(keys.contains(&MarkerKey {
        kind: AnomalyKind::StateInvariantViolation,
        subject: Some("inventory_negative:doodads".into()),
    }));
    assert!(keys.contains(&MarkerKey {
        kind: AnomalyKind::AlertRaised,
        subject: Some("oversold:doodads".into()),
    }));
}

#[test]
fn test_execute_conflict_is_http_error_marker() {
    let mut env = env_with(TargetFaults::default());
    env.reset().unwrap();
    let obs = env.execute(&purchase("doodads", 10, false));
    assert_eq!(obs.status.code(), Some(409));
    assert_eq!(obs.kinds().into_iter().collect::<Vec<_>>(), vec![AnomalyKind::HttpError]);
    assert_eq!(obs.state.quantity("doodads"), 2);
    assert_eq!(obs.response["error"], "not enough inventory");
}

#[test]
fn test_execute_unreachable_is_recorded_not_raised() {
    let mut env = env_with(TargetFaults::default());
    env.reset().unwrap();
    env.transport_mut().faults_mut().unreachable = true;
    let obs = env.execute(&purchase("widgets", 1, false));
    assert_eq!(obs.status, ExchangeStatus::Unreachable);
    assert_eq!(obs.kinds().into_iter().collect::<Vec<_>>(), vec![AnomalyKind::Unreachable]);
    assert!(obs.log_excerpt.is_empty());
    assert!(obs.response.is_null());
}

#[test]
fn test_execute_slow_mode_marks_slow_response() {
    let mut env = Environment::new(
        InMemoryTarget::with_faults(TargetFaults {
            slow_mode_delay: std::time::Duration::from_millis(40),
            ..Default::default()
        }),
        EnvConfig {
            slow_threshold_ms: 20,
            ..Default::default()
        },
    );
    env.reset().unwrap();
    let mut params = ActionParams::new();
    params.insert("mode".into(), ParamValue::Text("slow".into()));
    let toggle = ActionSpace::inventory_store()
        .instantiate_with("toggle_mode", params)
        .unwrap();
    assert!(env.execute(&toggle).markers.is_empty());

    let obs = env.execute(&purchase("widgets", 1, false));
    assert!(obs.latency_ms > 20.0);
    assert!(obs.kinds().contains(&AnomalyKind::SlowResponse));
}
