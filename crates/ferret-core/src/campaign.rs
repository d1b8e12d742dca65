use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use ferret_env::{EnvConfig, Environment, Transport, TransportError};
use ferret_explore::{ArtifactStore, EpsilonGreedy, Explorer, ExplorerConfig, StopSignal};
use ferret_space::{episode_seed, ActionSpace};

use crate::config::EngineConfig;
use crate::report::EpisodeSummary;

/// Builds one transport per episode, given the episode index.
///
/// Called on a blocking thread. If several episodes reach the same target
/// instance, keeping them from interfering (separate instances, or
/// `max_concurrent_episodes = 1`) is the caller's responsibility: the engine
/// only resets the target at the start of each episode.
pub type TransportFactory =
    Arc<dyn Fn(u32) -> Result<Box<dyn Transport + Send>, TransportError> + Send + Sync>;

/// Everything one episode task owns.
struct EpisodeJob {
    index: u32,
    seed: u64,
    env: EnvConfig,
    explorer: ExplorerConfig,
    space: ActionSpace,
    store: ArtifactStore,
    stop: StopSignal,
    factory: TransportFactory,
}

impl EpisodeJob {
    fn run(self) -> EpisodeSummary {
        let transport = match (self.factory)(self.index) {
            Ok(transport) => transport,
            Err(e) => {
                warn!(episode = self.index, error = %e, "transport setup failed");
                return EpisodeSummary::failed(self.index, self.seed, e.to_string());
            }
        };
        let epsilon = self.explorer.epsilon;
        let env = Environment::new(transport, self.env);
        let mut explorer = Explorer::new(env, self.space, self.explorer)
            .with_store(self.store)
            .with_stop(self.stop);
        let mut policy = EpsilonGreedy::new(epsilon);

        match explorer.run_episode(self.seed, &mut policy) {
            Ok(outcome) => EpisodeSummary::from_outcome(self.index, self.seed, &outcome),
            Err(e) => {
                warn!(episode = self.index, seed = self.seed, error = %e, "episode failed");
                EpisodeSummary::failed(self.index, self.seed, e.to_string())
            }
        }
    }
}

/// Run the configured number of episodes, at most
/// `max_concurrent_episodes` at a time.
///
/// Each episode gets its own seed, transport, and exploration state, and
/// runs on a blocking thread. A failing episode never affects its siblings.
/// Once a stop is requested no further episodes are launched. Summaries come
/// back in episode index order.
pub async fn run_episodes(
    config: &EngineConfig,
    space: &ActionSpace,
    factory: TransportFactory,
    stop: &StopSignal,
) -> Vec<EpisodeSummary> {
    let permits = Arc::new(Semaphore::new(config.run.max_concurrent_episodes.max(1) as usize));
    let store = ArtifactStore::new(&config.run.artifact_dir);
    let mut handles = Vec::with_capacity(config.run.episodes as usize);

    for index in 0..config.run.episodes {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        if stop.is_requested() {
            info!(launched = index, "stop requested; no further episodes");
            break;
        }

        let seed = episode_seed(config.run.seed, u64::from(index));
        let job = EpisodeJob {
            index,
            seed,
            env: config.env.clone(),
            explorer: config.explorer.clone(),
            space: space.clone(),
            store: store.clone(),
            stop: stop.clone(),
            factory: factory.clone(),
        };
        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job.run()
        });
        handles.push((index, seed, handle));
    }

    let mut summaries = Vec::with_capacity(handles.len());
    for (index, seed, handle) in handles {
        let summary = match handle.await {
            Ok(summary) => summary,
            Err(e) => {
                error!(episode = index, error = %e, "episode task did not complete");
                EpisodeSummary::failed(index, seed, format!("episode task failed: {e}"))
            }
        };
        summaries.push(summary);
    }
    summaries.sort_by_key(|s| s.index);
    summaries
}
