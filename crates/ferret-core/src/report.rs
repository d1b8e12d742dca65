use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use ferret_explore::EpisodeOutcome;
use ferret_model::{MarkerKey, StopReason};

/// What one episode of a run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    pub index: u32,
    pub seed: u64,
    pub steps: u32,
    /// `None` when the episode never started (setup or reset failure).
    pub stop_reason: Option<StopReason>,
    pub distinct_markers: BTreeSet<MarkerKey>,
    pub artifact: Option<PathBuf>,
    /// Why an anomalous episode has no artifact. The episode still counts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persist_error: Option<String>,
    pub error: Option<String>,
}

impl EpisodeSummary {
    pub fn from_outcome(index: u32, seed: u64, outcome: &EpisodeOutcome) -> Self {
        let episode = &outcome.episode;
        Self {
            index,
            seed,
            steps: episode.steps.len() as u32,
            stop_reason: Some(episode.stop_reason.clone()),
            distinct_markers: episode.anomaly_summary.distinct.clone(),
            artifact: outcome.artifact.clone(),
            persist_error: outcome.persist_error.clone(),
            error: None,
        }
    }

    pub fn failed(index: u32, seed: u64, error: String) -> Self {
        Self {
            index,
            seed,
            steps: 0,
            stop_reason: None,
            distinct_markers: BTreeSet::new(),
            artifact: None,
            persist_error: None,
            error: Some(error),
        }
    }

    pub fn is_anomalous(&self) -> bool {
        !self.distinct_markers.is_empty()
    }

    /// Failed to start, or stopped early for a reason other than a request.
    pub fn is_aborted(&self) -> bool {
        self.error.is_some() || matches!(self.stop_reason, Some(StopReason::Aborted { .. }))
    }
}

/// Result of a whole run. Always produced, even if every episode failed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub target: String,
    /// Whether the target answered the state probe before the run.
    pub target_reachable: bool,
    /// Episodes in index order.
    pub episodes: Vec<EpisodeSummary>,
}

impl RunReport {
    pub fn episodes_run(&self) -> usize {
        self.episodes.iter().filter(|e| e.error.is_none()).count()
    }

    pub fn anomalous_count(&self) -> usize {
        self.episodes.iter().filter(|e| e.is_anomalous()).count()
    }

    pub fn artifacts(&self) -> Vec<&Path> {
        self.episodes
            .iter()
            .filter_map(|e| e.artifact.as_deref())
            .collect()
    }

    /// Anomalous episodes whose artifact could not be written.
    pub fn unpersisted(&self) -> Vec<&EpisodeSummary> {
        self.episodes
            .iter()
            .filter(|e| e.persist_error.is_some())
            .collect()
    }

    pub fn aborted(&self) -> Vec<&EpisodeSummary> {
        self.episodes.iter().filter(|e| e.is_aborted()).collect()
    }

    /// Union of marker keys over all episodes.
    pub fn distinct_markers(&self) -> BTreeSet<MarkerKey> {
        self.episodes
            .iter()
            .flat_map(|e| e.distinct_markers.iter().cloned())
            .collect()
    }
}
