use std::io::Read;
use std::sync::Arc;
use std::thread;

use ferret_core::{entry, run, EngineConfig, TransportFactory};
use ferret_env::{EnvConfig, Environment, InMemoryTarget, TargetFaults, Transport, TransportError};
use ferret_explore::{ArtifactStore, Explorer, ExplorerConfig, Scripted, StopSignal};
use ferret_model::{ActionParams, Method, ParamValue, StopReason};
use ferret_replay::ReplayVerdict;
use ferret_space::ActionSpace;

fn config(dir: &std::path::Path, episodes: u32) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.run.episodes = episodes;
    config.run.max_concurrent_episodes = 2;
    config.run.artifact_dir = dir.to_path_buf();
    config.explorer.max_steps = 20;
    config
}

fn memory_factory(faults_for: fn(u32) -> TargetFaults) -> TransportFactory {
    Arc::new(move |index| {
        let transport: Box<dyn Transport + Send> =
            Box::new(InMemoryTarget::with_faults(faults_for(index)));
        Ok(transport)
    })
}

fn healthy(_: u32) -> TargetFaults {
    TargetFaults::default()
}

#[tokio::test]
async fn test_run_reports_every_episode_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), 6);
    let report = run(
        &config,
        &ActionSpace::inventory_store(),
        memory_factory(healthy),
        &StopSignal::new(),
    )
    .await
    .unwrap();

    assert!(report.target_reachable);
    assert_eq!(report.target, "memory://inventory-store");
    let indices: Vec<u32> = report.episodes.iter().map(|e| e.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
    let seeds: Vec<u64> = report.episodes.iter().map(|e| e.seed).collect();
    assert_eq!(seeds, vec![42, 43, 44, 45, 46, 47]);
    assert_eq!(report.episodes_run(), 6);
    assert_eq!(report.anomalous_count(), report.artifacts().len());
    for path in report.artifacts() {
        assert!(path.exists());
    }
    let written = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(written, report.artifacts().len());
}

#[tokio::test]
async fn test_runs_are_deterministic() {
    let space = ActionSpace::inventory_store();
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    let a = run(&config(dir_a.path(), 4), &space, memory_factory(healthy), &StopSignal::new())
        .await
        .unwrap();
    let b = run(&config(dir_b.path(), 4), &space, memory_factory(healthy), &StopSignal::new())
        .await
        .unwrap();
    let shape = |r: &ferret_core::RunReport| {
        r.episodes
            .iter()
            .map(|e| (e.seed, e.steps, e.distinct_markers.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(shape(&a), shape(&b));
}

#[tokio::test]
async fn test_unwritable_artifact_dir_keeps_episodes_counted() {
    let space = ActionSpace::inventory_store();
    let dir = tempfile::tempdir().unwrap();
    let mut writable = config(dir.path(), 3);
    writable.explorer.max_steps = 40;

    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"file").unwrap();
    let mut unwritable = writable.clone();
    unwritable.run.artifact_dir = blocker.join("episodes");

    let ok = run(&writable, &space, memory_factory(healthy), &StopSignal::new())
        .await
        .unwrap();
    let bad = run(&unwritable, &space, memory_factory(healthy), &StopSignal::new())
        .await
        .unwrap();

    assert!(ok.anomalous_count() > 0);
    assert_eq!(bad.anomalous_count(), ok.anomalous_count());
    assert_eq!(bad.episodes_run(), ok.episodes_run());
    assert!(bad.artifacts().is_empty());
    assert!(bad.aborted().is_empty());
    assert_eq!(bad.unpersisted().len(), ok.anomalous_count());
    for (good, failed) in ok.episodes.iter().zip(&bad.episodes) {
        assert_eq!(good.steps, failed.steps);
        assert_eq!(good.distinct_markers, failed.distinct_markers);
        assert_eq!(failed.persist_error.is_some(), failed.is_anomalous());
    }
}

#[tokio::test]
async fn test_failed_reset_only_aborts_its_episode() {
    fn flaky(index: u32) -> TargetFaults {
        TargetFaults {
            fail_reset: index == 2,
            ..Default::default()
        }
    }
    let dir = tempfile::tempdir().unwrap();
    let report = run(
        &config(dir.path(), 4),
        &ActionSpace::inventory_store(),
        memory_factory(flaky),
        &StopSignal::new(),
    )
    .await
    .unwrap();

    assert_eq!(report.episodes.len(), 4);
    assert_eq!(report.episodes_run(), 3);
    let aborted = report.aborted();
    assert_eq!(aborted.len(), 1);
    assert_eq!(aborted[0].index, 2);
    assert!(aborted[0].error.as_deref().unwrap().contains("Reset failed"));
    for e in report.episodes.iter().filter(|e| e.index != 2) {
        assert_eq!(e.stop_reason, Some(StopReason::BudgetExhausted));
    }
}

#[tokio::test]
async fn test_factory_errors_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let factory: TransportFactory =
        Arc::new(|_| Err(TransportError::Setup("no client".to_string())));
    let report = run(
        &config(dir.path(), 2),
        &ActionSpace::inventory_store(),
        factory,
        &StopSignal::new(),
    )
    .await
    .unwrap();
    assert!(!report.target_reachable);
    assert_eq!(report.episodes_run(), 0);
    assert_eq!(report.aborted().len(), 2);
}

#[tokio::test]
async fn test_stop_before_run_launches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let stop = StopSignal::new();
    stop.request_stop();
    let report = run(
        &config(dir.path(), 3),
        &ActionSpace::inventory_store(),
        memory_factory(healthy),
        &stop,
    )
    .await
    .unwrap();
    assert!(report.episodes.is_empty());
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path(), 1);
    config.explorer.epsilon = 2.0;
    let err = run(
        &config,
        &ActionSpace::inventory_store(),
        memory_factory(healthy),
        &StopSignal::new(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ferret_core::RunError::Config(_)));
}

fn scenario_artifact(dir: &std::path::Path) -> std::path::PathBuf {
    let space = ActionSpace::inventory_store();
    let with = |name: &str, pairs: &[(&str, ParamValue)]| {
        let params: ActionParams = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        space.instantiate_with(name, params).unwrap()
    };
    let script = vec![
        with("reset", &[]),
        with(
            "restock",
            &[("item", ParamValue::Text("doodads".into())), ("quantity", ParamValue::Int(5))],
        ),
        with(
            "purchase",
            &[
                ("item", ParamValue::Text("doodads".into())),
                ("quantity", ParamValue::Int(10)),
                ("expedite", ParamValue::Bool(true)),
            ],
        ),
    ];
    let env = Environment::new(InMemoryTarget::new(), EnvConfig::default());
    Explorer::new(env, space.clone(), ExplorerConfig::default())
        .with_store(ArtifactStore::new(dir))
        .run_episode(42, &mut Scripted::new(script))
        .unwrap()
        .artifact
        .unwrap()
}

#[test]
fn test_replay_with_in_memory_target() {
    let dir = tempfile::tempdir().unwrap();
    let path = scenario_artifact(dir.path());
    let report = entry::replay_with(&path, InMemoryTarget::new(), &EnvConfig::default()).unwrap();
    assert_eq!(report.verdict, ReplayVerdict::Reproduced);
    assert_eq!(report.exit_code(), 0);
}

#[test]
fn test_replay_over_http_with_base_url_override() {
    let dir = tempfile::tempdir().unwrap();
    let path = scenario_artifact(dir.path());

    let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    thread::spawn(move || {
        let mut target = InMemoryTarget::new();
        for mut request in server.incoming_requests() {
            let method = match request.method() {
                tiny_http::Method::Get => Method::Get,
                _ => Method::Post,
            };
            let path = request.url().to_string();
            let mut raw = String::new();
            let _ = request.as_reader().read_to_string(&mut raw);
            let body = serde_json::from_str::<serde_json::Value>(&raw).ok();
            let (status, payload) = target.handle(method, &path, body.as_ref());
            let response = tiny_http::Response::from_string(payload.to_string())
                .with_status_code(status);
            let _ = request.respond(response);
        }
    });

    let report = entry::replay(
        &path,
        Some(&format!("http://{addr}")),
        &EnvConfig::default(),
    )
    .unwrap();
    assert_eq!(report.target, format!("http://{addr}"));
    assert_eq!(report.recorded_target, "memory://inventory-store");
    assert_eq!(report.verdict, ReplayVerdict::Reproduced);
}

#[test]
fn test_replay_unreachable_target_is_not_reproduced() {
    let dir = tempfile::tempdir().unwrap();
    let path = scenario_artifact(dir.path());
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let mut config = EnvConfig::default();
    config.request_timeout_ms = 500;
    let report = entry::replay(&path, Some(&format!("http://127.0.0.1:{port}")), &config).unwrap();
    assert_eq!(report.verdict, ReplayVerdict::NotReproduced);
    assert_eq!(report.exit_code(), 1);
}

#[test]
fn test_replay_missing_artifact_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = entry::replay_with(
        &dir.path().join("missing.json"),
        InMemoryTarget::new(),
        &EnvConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, ferret_core::RunError::Replay(_)));
}
