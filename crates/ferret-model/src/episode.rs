use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::anomaly::{AnomalyKind, MarkerKey};
use crate::observation::Observation;
use crate::signature::StateSignature;

/// Artifact layout version written into every persisted episode.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum EpisodeFormatError {
    #[error("Malformed episode artifact: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported artifact format version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
}

/// Why an episode stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StopReason {
    /// Step budget used up.
    BudgetExhausted,
    /// An explicit stop request arrived between steps.
    StopRequested,
    /// The policy had no further action to offer.
    PolicyExhausted,
    /// Exploration could not meaningfully continue.
    Aborted { reason: String },
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::BudgetExhausted => f.write_str("budget exhausted"),
            StopReason::StopRequested => f.write_str("stop requested"),
            StopReason::PolicyExhausted => f.write_str("policy exhausted"),
            StopReason::Aborted { reason } => write!(f, "aborted: {reason}"),
        }
    }
}

/// One (action, observation, reward, signature) tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeStep {
    pub index: u32,
    pub action: Action,
    pub reward: f64,
    /// Signature of the snapshot observed after this step.
    pub signature: StateSignature,
    pub observation: Observation,
}

/// Aggregate of every marker seen in an episode.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnomalySummary {
    pub total_markers: u32,
    pub by_kind: BTreeMap<AnomalyKind, u32>,
    pub anomalous_steps: Vec<u32>,
    pub distinct: BTreeSet<MarkerKey>,
}

impl AnomalySummary {
    pub fn is_empty(&self) -> bool {
        self.total_markers == 0
    }

    fn record(&mut self, step_index: u32, observation: &Observation) {
        if observation.markers.is_empty() {
            return;
        }
        self.anomalous_steps.push(step_index);
        for marker in &observation.markers {
            self.total_markers += 1;
            *self.by_kind.entry(marker.kind).or_insert(0) += 1;
            self.distinct.insert(marker.key());
        }
    }
}

/// A finished exploration record, ready to persist or replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub format_version: u32,
    pub seed: u64,
    /// Base address of the target the episode ran against.
    pub target: String,
    pub policy: String,
    pub started_at: DateTime<Utc>,
    pub stop_reason: StopReason,
    pub steps: Vec<EpisodeStep>,
    pub anomaly_summary: AnomalySummary,
}

impl Episode {
    pub fn is_anomalous(&self) -> bool {
        !self.anomaly_summary.is_empty()
    }

    pub fn actions(&self) -> impl Iterator<Item = &Action> + '_ {
        self.steps.iter().map(|s| &s.action)
    }

    pub fn signatures(&self) -> Vec<StateSignature> {
        self.steps.iter().map(|s| s.signature.clone()).collect()
    }

    /// Marker keys per step, in step order.
    pub fn marker_keys(&self) -> Vec<BTreeSet<MarkerKey>> {
        self.steps
            .iter()
            .map(|s| s.observation.marker_keys())
            .collect()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, EpisodeFormatError> {
        let episode: Episode = serde_json::from_str(json)?;
        if episode.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(EpisodeFormatError::UnsupportedVersion {
                found: episode.format_version,
                supported: ARTIFACT_FORMAT_VERSION,
            });
        }
        Ok(episode)
    }
}

/// Append-only builder used while an episode is running.
#[derive(Debug, Clone)]
pub struct EpisodeRecorder {
    seed: u64,
    target: String,
    policy: String,
    started_at: DateTime<Utc>,
    steps: Vec<EpisodeStep>,
    summary: AnomalySummary,
}

impl EpisodeRecorder {
    pub fn new(seed: u64, target: &str, policy: &str) -> Self {
        Self::started_at(seed, target, policy, Utc::now())
    }

    pub fn started_at(seed: u64, target: &str, policy: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            seed,
            target: target.to_string(),
            policy: policy.to_string(),
            started_at,
            steps: Vec::new(),
            summary: AnomalySummary::default(),
        }
    }

    /// Append a step; the index and signature are derived here.
    pub fn push(&mut self, action: Action, observation: Observation, reward: f64) -> &EpisodeStep {
        let index = self.steps.len() as u32;
        self.summary.record(index, &observation);
        self.steps.push(EpisodeStep {
            index,
            action,
            reward,
            signature: observation.signature(),
            observation,
        });
        &self.steps[self.steps.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn summary(&self) -> &AnomalySummary {
        &self.summary
    }

    pub fn finish(self, stop_reason: StopReason) -> Episode {
        Episode {
            format_version: ARTIFACT_FORMAT_VERSION,
            seed: self.seed,
            target: self.target,
            policy: self.policy,
            started_at: self.started_at,
            stop_reason,
            steps: self.steps,
            anomaly_summary: self.summary,
        }
    }
}
