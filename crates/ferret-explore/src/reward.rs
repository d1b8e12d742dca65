//! Reward shaping.
//!
//! `reward = novelty_bonus (first visit only) + sum of weights over the
//! distinct anomaly kinds at the step`. Invariant violations carry the
//! largest weight so search drifts toward broken states rather than
//! uniform coverage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use ferret_model::{AnomalyKind, Observation};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Granted when the step reaches a signature not yet seen this episode.
    pub novelty_bonus: f64,
    /// Weight per anomaly kind; kinds missing here weigh nothing.
    pub weights: BTreeMap<AnomalyKind, f64>,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            novelty_bonus: 1.0,
            weights: BTreeMap::from([
                (AnomalyKind::StateInvariantViolation, 3.0),
                (AnomalyKind::AlertRaised, 2.0),
                (AnomalyKind::Timeout, 0.5),
                (AnomalyKind::Unreachable, 0.5),
                (AnomalyKind::SlowResponse, 0.5),
                (AnomalyKind::HttpError, 0.3),
            ]),
        }
    }
}

impl RewardConfig {
    pub fn weight(&self, kind: AnomalyKind) -> f64 {
        self.weights.get(&kind).copied().unwrap_or(0.0)
    }

    /// Sum of weights over the distinct kinds present. Repeated markers of
    /// one kind count once.
    pub fn anomaly_bonus(&self, observation: &Observation) -> f64 {
        observation.kinds().into_iter().map(|k| self.weight(k)).sum()
    }

    pub fn score(&self, observation: &Observation, novel: bool) -> f64 {
        let novelty = if novel { self.novelty_bonus } else { 0.0 };
        novelty + self.anomaly_bonus(observation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferret_model::{AnomalyMarker, ExchangeStatus, StateSnapshot};

    fn observation(markers: Vec<AnomalyMarker>) -> Observation {
        Observation {
            status: ExchangeStatus::Http { code: 200 },
            latency_ms: 1.0,
            reported_latency_ms: None,
            response: serde_json::Value::Null,
            state: StateSnapshot::default(),
            log_excerpt: vec![],
            markers,
        }
    }

    #[test]
    fn test_novelty_only() {
        let config = RewardConfig::default();
        let obs = observation(vec![]);
        assert_eq!(config.score(&obs, true), 1.0);
        assert_eq!(config.score(&obs, false), 0.0);
    }

    #[test]
    fn test_kinds_count_once() {
        let config = RewardConfig::default();
        let obs = observation(vec![
            AnomalyMarker::invariant_violation("inventory_negative:a", None),
            AnomalyMarker::invariant_violation("inventory_negative:b", None),
            AnomalyMarker::alert("oversold:a"),
        ]);
        assert_eq!(config.anomaly_bonus(&obs), 5.0);
        assert_eq!(config.score(&obs, true), 6.0);
    }

    #[test]
    fn test_new_and_broken_beats_new() {
        let config = RewardConfig::default();
        let broken = observation(vec![AnomalyMarker::invariant_violation("x", None)]);
        assert!(config.score(&broken, true) > config.score(&observation(vec![]), true));
    }

    #[test]
    fn test_missing_weight_is_zero() {
        let config = RewardConfig {
            novelty_bonus: 0.0,
            weights: BTreeMap::new(),
        };
        let obs = observation(vec![AnomalyMarker::http_error(500)]);
        assert_eq!(config.score(&obs, true), 0.0);
    }
}
