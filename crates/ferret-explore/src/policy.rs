use std::collections::BTreeSet;

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use ferret_model::{Action, StateSnapshot};
use ferret_space::ActionSpace;

use crate::explorer::ExploreError;
use crate::stats::ActionStats;

/// Everything a policy may look at when choosing the next action.
pub struct SelectionContext<'a> {
    pub space: &'a ActionSpace,
    /// Last snapshot observed (the reset baseline before the first step).
    pub snapshot: &'a StateSnapshot,
    pub stats: &'a ActionStats,
    pub rng: &'a mut ChaCha8Rng,
    /// Action names whose precondition failed earlier in this step.
    pub rejected: &'a BTreeSet<String>,
    pub step: u32,
}

/// An exploration policy. Chooses one concrete action per step.
///
/// `Ok(None)` means the policy has nothing more to offer.
pub trait Policy: Send {
    fn select(&mut self, ctx: &mut SelectionContext<'_>) -> Result<Option<Action>, ExploreError>;

    /// Name of this policy (recorded in artifacts).
    fn name(&self) -> &str;
}

/// Epsilon-greedy over action names.
///
/// With probability epsilon, or while nothing has been scored yet, a
/// uniformly random catalog action is drawn. Otherwise the action with the
/// highest mean reward this episode wins, ties going to catalog order.
/// Names rejected earlier in the step are never offered again.
#[derive(Debug, Clone)]
pub struct EpsilonGreedy {
    epsilon: f64,
}

impl EpsilonGreedy {
    pub fn new(epsilon: f64) -> Self {
        Self {
            epsilon: epsilon.clamp(0.0, 1.0),
        }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    fn greedy_choice<'s>(candidates: &[&'s str], stats: &ActionStats) -> Option<&'s str> {
        let mut best: Option<(&str, f64)> = None;
        for &name in candidates {
            let Some(mean) = stats.mean(name) else {
                continue;
            };
            match best {
                Some((_, best_mean)) if mean <= best_mean => {}
                _ => best = Some((name, mean)),
            }
        }
        best.map(|(name, _)| name)
    }
}

impl Default for EpsilonGreedy {
    fn default() -> Self {
        Self::new(0.25)
    }
}

impl Policy for EpsilonGreedy {
    fn select(&mut self, ctx: &mut SelectionContext<'_>) -> Result<Option<Action>, ExploreError> {
        let candidates: Vec<&str> = ctx
            .space
            .names()
            .filter(|name| !ctx.rejected.contains(*name))
            .collect();
        if candidates.is_empty() {
            return Ok(None);
        }

        // Always consume the roll so the rng stream does not depend on stats.
        let roll: f64 = ctx.rng.gen();
        let greedy = if ctx.stats.is_empty() || roll < self.epsilon {
            None
        } else {
            Self::greedy_choice(&candidates, ctx.stats)
        };
        let name = match greedy {
            Some(name) => name,
            None => candidates[ctx.rng.gen_range(0..candidates.len())],
        };

        let action = ctx.space.instantiate(name, &mut *ctx.rng)?;
        Ok(Some(action))
    }

    fn name(&self) -> &str {
        "epsilon_greedy"
    }
}

/// Replays a fixed action list, one per step, then reports exhaustion.
///
/// Used to reproduce reported sequences. There is nothing to reselect, so a
/// rejected precondition leaves the policy with no offer for that step.
#[derive(Debug, Clone)]
pub struct Scripted {
    actions: Vec<Action>,
}

impl Scripted {
    pub fn new(actions: Vec<Action>) -> Self {
        Self { actions }
    }
}

impl Policy for Scripted {
    fn select(&mut self, ctx: &mut SelectionContext<'_>) -> Result<Option<Action>, ExploreError> {
        let Some(action) = self.actions.get(ctx.step as usize) else {
            return Ok(None);
        };
        if ctx.rejected.contains(action.name()) {
            return Ok(None);
        }
        Ok(Some(action.clone()))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
