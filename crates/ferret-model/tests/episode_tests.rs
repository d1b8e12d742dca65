use ferret_model::anomaly::{AnomalyKind, AnomalyMarker};
use ferret_model::episode::{EpisodeFormatError, ARTIFACT_FORMAT_VERSION};
use ferret_model::{
    Action, ActionParams, EpisodeRecorder, ExchangeStatus, Observation, ParamValue, Precondition,
    Route, StateSnapshot, StopReason,
};

fn purchase(qty: i64) -> Action {
    let mut params = ActionParams::new();
    params.insert("item".into(), ParamValue::Text("doodads".into()));
    params.insert("quantity".into(), ParamValue::Int(qty));
    Action::new(
        "purchase",
        Route::post("/purchase"),
        params,
        Precondition::Always,
    )
}

fn observation(qty: i64, markers: Vec<AnomalyMarker>) -> Observation {
    let mut state = StateSnapshot {
        mode: Some("normal".into()),
        ..Default::default()
    };
    state.inventory.insert("doodads".into(), qty);
    Observation {
        status: ExchangeStatus::Http { code: 201 },
        latency_ms: 3.5,
        reported_latency_ms: Some(1.2),
        response: serde_json::json!({"order_id": 1}),
        state,
        log_excerpt: vec!["event=purchase".into()],
        markers,
    }
}

#[test]
fn test_recorder_indexes_steps_and_signs_them() {
    let mut recorder = EpisodeRecorder::new(42, "http://127.0.0.1:8000", "epsilon_greedy");
    let obs = observation(1, vec![]);
    let expected_sig = obs.signature();
    let step = recorder.push(purchase(1), obs, 1.0);
    assert_eq!(step.index, 0);
    assert_eq!(step.signature, expected_sig);
    recorder.push(purchase(2), observation(0, vec![]), 0.0);
    assert_eq!(recorder.len(), 2);

    let episode = recorder.finish(StopReason::BudgetExhausted);
    assert_eq!(episode.steps[1].index, 1);
    assert!(!episode.is_anomalous());
    assert_eq!(episode.format_version, ARTIFACT_FORMAT_VERSION);
}

#[test]
fn test_summary_aggregates_markers() {
    let mut recorder = EpisodeRecorder::new(7, "t", "scripted");
    recorder.push(purchase(1), observation(5, vec![]), 1.0);
    recorder.push(
        purchase(10),
        observation(
            -5,
            vec![
                AnomalyMarker::invariant_violation("inventory_negative:doodads", None),
                AnomalyMarker::alert("oversold:doodads"),
            ],
        ),
        5.0,
    );
    recorder.push(
        purchase(1),
        observation(
            -6,
            vec![AnomalyMarker::invariant_violation(
                "inventory_negative:doodads",
                None,
            )],
        ),
        2.0,
    );
    let episode = recorder.finish(StopReason::BudgetExhausted);
    let summary = &episode.anomaly_summary;
    assert!(episode.is_anomalous());
    assert_eq!(summary.total_markers, 3);
    assert_eq!(summary.anomalous_steps, vec![1, 2]);
    assert_eq!(summary.by_kind[&AnomalyKind::StateInvariantViolation], 2);
    assert_eq!(summary.by_kind[&AnomalyKind::AlertRaised], 1);
    assert_eq!(summary.distinct.len(), 2);
}

#[test]
fn test_artifact_json_survives_reload() {
    let mut recorder = EpisodeRecorder::new(42, "http://127.0.0.1:8000", "epsilon_greedy");
    recorder.push(
        purchase(10),
        observation(
            -3,
            vec![AnomalyMarker::invariant_violation(
                "inventory_negative:doodads",
                Some(serde_json::json!(-3)),
            )],
        ),
        4.0,
    );
    let episode = recorder.finish(StopReason::Aborted {
        reason: "selection exhausted".into(),
    });

    let json = episode.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["seed"], 42);
    assert_eq!(value["steps"][0]["action"]["name"], "purchase");
    assert_eq!(value["steps"][0]["observation"]["status"]["code"], 201);
    assert_eq!(value["steps"][0]["observation"]["response"]["order_id"], 1);
    assert_eq!(value["stop_reason"]["kind"], "aborted");
    assert_eq!(
        value["anomaly_summary"]["by_kind"]["state_invariant_violation"],
        1
    );

    let reloaded = ferret_model::Episode::from_json(&json).unwrap();
    assert_eq!(reloaded, episode);
}

#[test]
fn test_observation_without_response_field_loads() {
    let mut recorder = EpisodeRecorder::new(7, "t", "p");
    recorder.push(purchase(1), observation(1, vec![]), 1.0);
    let mut value = serde_json::to_value(recorder.finish(StopReason::BudgetExhausted)).unwrap();
    let removed = value["steps"][0]["observation"]
        .as_object_mut()
        .unwrap()
        .remove("response");
    assert!(removed.is_some());
    let reloaded = ferret_model::Episode::from_json(&value.to_string()).unwrap();
    assert_eq!(reloaded.steps[0].observation.response, serde_json::Value::Null);
}

#[test]
fn test_unknown_format_version_is_rejected() {
    let episode = EpisodeRecorder::new(1, "t", "p").finish(StopReason::BudgetExhausted);
    let mut value = serde_json::to_value(&episode).unwrap();
    value["format_version"] = serde_json::json!(99);
    let err = ferret_model::Episode::from_json(&value.to_string()).unwrap_err();
    assert!(matches!(
        err,
        EpisodeFormatError::UnsupportedVersion { found: 99, .. }
    ));
}
