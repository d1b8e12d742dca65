//! Run and replay entrypoints for command-line collaborators.

use std::path::Path;

use tracing::{info, warn};

use ferret_env::{EnvConfig, Environment, HttpTransport, Transport, TransportError};
use ferret_explore::StopSignal;
use ferret_model::Episode;
use ferret_replay::{load_episode, replay_episode, ReplayError, ReplayReport};
use ferret_space::ActionSpace;

use crate::campaign::{run_episodes, TransportFactory};
use crate::config::{ConfigError, EngineConfig};
use crate::report::RunReport;

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Replay(#[from] ReplayError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Explore the target with `config.run.episodes` episodes.
///
/// The target is probed first (the factory is called with index 0 for
/// that); an unreachable target is logged, not fatal, since every episode
/// will then report its own reset failure. Only an invalid configuration is
/// an error.
pub async fn run(
    config: &EngineConfig,
    space: &ActionSpace,
    factory: TransportFactory,
    stop: &StopSignal,
) -> Result<RunReport, RunError> {
    config.validate()?;

    let probe_factory = factory.clone();
    let env_config = config.env.clone();
    let (target, target_reachable) = tokio::task::spawn_blocking(move || {
        match probe_factory(0) {
            Ok(transport) => {
                let mut env = Environment::new(transport, env_config);
                let reachable = env.probe();
                (env.target().to_string(), reachable)
            }
            Err(e) => {
                warn!(error = %e, "transport setup failed during probe");
                (env_config.base_url, false)
            }
        }
    })
    .await?;
    if !target_reachable {
        warn!(target_service = %target, "target state endpoint not reachable before run");
    }

    info!(
        target_service = %target,
        episodes = config.run.episodes,
        seed = config.run.seed,
        max_concurrent = config.run.max_concurrent_episodes,
        "run started"
    );
    let episodes = run_episodes(config, space, factory, stop).await;
    let report = RunReport {
        target,
        target_reachable,
        episodes,
    };
    info!(
        episodes_run = report.episodes_run(),
        anomalous = report.anomalous_count(),
        aborted = report.aborted().len(),
        unpersisted = report.unpersisted().len(),
        "run finished"
    );
    Ok(report)
}

/// Replay a persisted episode over HTTP.
///
/// The target is `base_url` if given, else the recorded target when it is
/// an HTTP address, else `config.base_url`. Blocking: call from a blocking
/// thread when inside an async runtime.
pub fn replay(
    path: &Path,
    base_url: Option<&str>,
    config: &EnvConfig,
) -> Result<ReplayReport, RunError> {
    let episode = load_episode(path)?;
    let target = match base_url {
        Some(url) => url.to_string(),
        None if episode.target.starts_with("http://") || episode.target.starts_with("https://") => {
            episode.target.clone()
        }
        None => config.base_url.clone(),
    };
    let config = config.clone().with_base_url(&target);
    let transport = HttpTransport::from_config(&config)?;
    Ok(replay_loaded(path, &episode, transport, &config))
}

/// Replay a persisted episode over any transport.
pub fn replay_with<T: Transport>(
    path: &Path,
    transport: T,
    config: &EnvConfig,
) -> Result<ReplayReport, RunError> {
    let episode = load_episode(path)?;
    Ok(replay_loaded(path, &episode, transport, config))
}

fn replay_loaded<T: Transport>(
    path: &Path,
    episode: &Episode,
    transport: T,
    config: &EnvConfig,
) -> ReplayReport {
    info!(path = %path.display(), seed = episode.seed, steps = episode.steps.len(), "replaying episode");
    let mut env = Environment::new(transport, config.clone());
    replay_episode(&mut env, episode)
}
