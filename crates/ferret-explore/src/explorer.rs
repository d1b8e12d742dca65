use std::collections::BTreeSet;
use std::path::PathBuf;

use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use ferret_env::{EnvError, Environment, Transport};
use ferret_model::{Action, Episode, EpisodeRecorder, StateSignature, StateSnapshot, StopReason};
use ferret_space::{seeded_rng, ActionSpace, SpaceError};

use crate::novelty::NoveltyMemory;
use crate::policy::{Policy, SelectionContext};
use crate::reward::RewardConfig;
use crate::stats::ActionStats;
use crate::stop::StopSignal;
use crate::store::ArtifactStore;

#[derive(Debug, thiserror::Error)]
pub enum ExploreError {
    #[error(transparent)]
    Env(#[from] EnvError),

    #[error(transparent)]
    Space(#[from] SpaceError),
}

/// Run-level exploration settings. Not mutated by episodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Probability of a random pick in the epsilon-greedy policy.
    pub epsilon: f64,
    /// Step budget per episode.
    pub max_steps: u32,
    /// Extra selections allowed per step after precondition rejections.
    pub max_reselect: u32,
    pub reward: RewardConfig,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.25,
            max_steps: 25,
            max_reselect: 8,
            reward: RewardConfig::default(),
        }
    }
}

/// A finished episode and where it was written, if it was anomalous.
///
/// A failed write never loses the episode: it comes back with
/// `persist_error` set and no artifact.
#[derive(Debug, Clone)]
pub struct EpisodeOutcome {
    pub episode: Episode,
    pub artifact: Option<PathBuf>,
    pub persist_error: Option<String>,
}

enum Selection {
    Chosen(Action),
    /// The policy offered nothing at all.
    Exhausted,
    /// Every offer failed its precondition, or the reselect bound was hit.
    Blocked { rejected: BTreeSet<String> },
}

/// Drives one environment through episodes.
///
/// The environment is strictly sequential: one step finishes before the
/// next starts. All randomness comes from the episode seed.
pub struct Explorer<T: Transport> {
    env: Environment<T>,
    space: ActionSpace,
    config: ExplorerConfig,
    store: Option<ArtifactStore>,
    stop: StopSignal,
}

impl<T: Transport> Explorer<T> {
    pub fn new(env: Environment<T>, space: ActionSpace, config: ExplorerConfig) -> Self {
        Self {
            env,
            space,
            config,
            store: None,
            stop: StopSignal::new(),
        }
    }

    /// Persist anomalous episodes into `store`.
    pub fn with_store(mut self, store: ArtifactStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_stop(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    pub fn environment(&self) -> &Environment<T> {
        &self.env
    }

    /// Run one episode from a freshly reset target.
    ///
    /// A failed reset is an error and yields no episode. Everything after
    /// that ends in an `Episode`, possibly with an `Aborted` stop reason.
    pub fn run_episode(
        &mut self,
        seed: u64,
        policy: &mut dyn Policy,
    ) -> Result<EpisodeOutcome, ExploreError> {
        let target = self.env.target().to_string();
        info!(seed, target_service = %target, policy = policy.name(), "episode started");

        let baseline = self.env.reset()?;
        let mut rng = seeded_rng(seed);
        let mut novelty = NoveltyMemory::new();
        novelty.observe(&StateSignature::of(&baseline));
        let mut stats = ActionStats::new();
        let mut recorder = EpisodeRecorder::new(seed, &target, policy.name());
        let mut snapshot = baseline;

        let stop_reason = loop {
            let step = recorder.len() as u32;
            if step >= self.config.max_steps {
                break StopReason::BudgetExhausted;
            }
            if self.stop.is_requested() {
                break StopReason::StopRequested;
            }

            let selection = match self.select_legal(policy, &snapshot, &stats, &mut rng, step) {
                Ok(selection) => selection,
                Err(e) => {
                    warn!(seed, step, error = %e, "action selection failed");
                    break StopReason::Aborted {
                        reason: e.to_string(),
                    };
                }
            };
            let action = match selection {
                Selection::Chosen(action) => action,
                Selection::Exhausted => break StopReason::PolicyExhausted,
                Selection::Blocked { rejected } => {
                    let names: Vec<&str> = rejected.iter().map(String::as_str).collect();
                    warn!(seed, step, rejected = ?names, "no action satisfied its precondition");
                    break StopReason::Aborted {
                        reason: format!(
                            "no legal action at step {step} (rejected: {})",
                            names.join(", ")
                        ),
                    };
                }
            };

            let observation = self.env.execute(&action);
            let novel = novelty.observe(&observation.signature());
            let reward = self.config.reward.score(&observation, novel);
            stats.record(action.name(), reward);
            snapshot = observation.state.clone();
            recorder.push(action, observation, reward);
        };

        let episode = recorder.finish(stop_reason);
        info!(
            seed,
            steps = episode.steps.len(),
            anomalous = episode.is_anomalous(),
            distinct_states = novelty.len(),
            stop_reason = %episode.stop_reason,
            "episode finished"
        );

        let (artifact, persist_error) = match (&self.store, episode.is_anomalous()) {
            (Some(store), true) => match store.persist(&episode) {
                Ok(path) => (Some(path), None),
                Err(e) => {
                    warn!(seed, dir = %store.dir().display(), error = %e, "anomalous episode not persisted");
                    (None, Some(e.to_string()))
                }
            },
            _ => (None, None),
        };
        Ok(EpisodeOutcome {
            episode,
            artifact,
            persist_error,
        })
    }

    /// Ask the policy until it offers an action whose precondition holds
    /// against the last snapshot, within the reselect bound.
    fn select_legal(
        &self,
        policy: &mut dyn Policy,
        snapshot: &StateSnapshot,
        stats: &ActionStats,
        rng: &mut ChaCha8Rng,
        step: u32,
    ) -> Result<Selection, ExploreError> {
        let mut rejected = BTreeSet::new();
        let mut rejections = 0u32;
        loop {
            let mut ctx = SelectionContext {
                space: &self.space,
                snapshot,
                stats,
                rng: &mut *rng,
                rejected: &rejected,
                step,
            };
            let Some(action) = policy.select(&mut ctx)? else {
                return Ok(if rejected.is_empty() {
                    Selection::Exhausted
                } else {
                    Selection::Blocked { rejected }
                });
            };
            if action.precondition_holds(snapshot) {
                return Ok(Selection::Chosen(action));
            }

            debug!(step, action = %action, "precondition rejected");
            rejected.insert(action.name().to_string());
            rejections += 1;
            if rejections > self.config.max_reselect {
                return Ok(Selection::Blocked { rejected });
            }
        }
    }
}
