use std::path::{Path, PathBuf};

use tracing::{info, warn};

use ferret_env::{Environment, Transport};
use ferret_model::{Episode, EpisodeFormatError, EpisodeStep, Observation};

use crate::report::{ReplayMismatch, ReplayReport, ReplayVerdict, StepComparison};

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("Cannot read artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid artifact {path}: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: EpisodeFormatError,
    },
}

/// Read and validate a persisted episode.
pub fn load_episode(path: &Path) -> Result<Episode, ReplayError> {
    let json = std::fs::read_to_string(path).map_err(|source| ReplayError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Episode::from_json(&json).map_err(|source| ReplayError::Format {
        path: path.to_path_buf(),
        source,
    })
}

/// Re-execute `episode` against `env` and compare step by step.
///
/// Always yields a report. A failed reset produces `NotReproduced` with the
/// error recorded as a mismatch and no steps executed.
pub fn replay_episode<T: Transport>(env: &mut Environment<T>, episode: &Episode) -> ReplayReport {
    let expected_anomalies: u32 = episode
        .steps
        .iter()
        .map(|s| s.observation.marker_keys().len() as u32)
        .sum();
    let mut report = ReplayReport {
        seed: episode.seed,
        target: env.target().to_string(),
        recorded_target: episode.target.clone(),
        steps: Vec::with_capacity(episode.steps.len()),
        mismatches: Vec::new(),
        expected_anomalies,
        reproduced_anomalies: 0,
        verdict: ReplayVerdict::NotReproduced,
    };

    if let Err(e) = env.reset() {
        warn!(seed = episode.seed, error = %e, "replay aborted: reset failed");
        report.mismatches.push(ReplayMismatch::ResetFailed {
            reason: e.to_string(),
        });
        return report;
    }

    for stored in &episode.steps {
        let fresh = env.execute(&stored.action);
        let comparison = compare_step(stored, fresh);
        report.reproduced_anomalies += comparison.reproduced.len() as u32;
        report.mismatches.extend(mismatches_for(&comparison));
        report.steps.push(comparison);
    }

    report.verdict =
        ReplayVerdict::from_counts(report.expected_anomalies, report.reproduced_anomalies);
    info!(
        seed = episode.seed,
        verdict = %report.verdict,
        expected = report.expected_anomalies,
        reproduced = report.reproduced_anomalies,
        mismatches = report.mismatches.len(),
        "replay finished"
    );
    report
}

fn compare_step(stored: &EpisodeStep, fresh: Observation) -> StepComparison {
    let expected = stored.observation.marker_keys();
    let actual = fresh.marker_keys();
    StepComparison {
        index: stored.index,
        action: stored.action.to_string(),
        expected_status: stored.observation.status,
        actual_status: fresh.status,
        expected_signature: stored.signature.clone(),
        actual_signature: fresh.signature(),
        missing: expected.difference(&actual).cloned().collect(),
        extra: actual.difference(&expected).cloned().collect(),
        reproduced: expected.intersection(&actual).cloned().collect(),
        observation: fresh,
    }
}

fn mismatches_for(step: &StepComparison) -> Vec<ReplayMismatch> {
    let mut out = Vec::new();
    if step.expected_status != step.actual_status {
        out.push(ReplayMismatch::StatusChanged {
            step: step.index,
            expected: step.expected_status,
            actual: step.actual_status,
        });
    }
    if !step.signature_matches() {
        out.push(ReplayMismatch::SignatureChanged {
            step: step.index,
            expected: step.expected_signature.clone(),
            actual: step.actual_signature.clone(),
        });
    }
    for key in &step.missing {
        out.push(ReplayMismatch::MissingMarker {
            step: step.index,
            key: key.clone(),
        });
    }
    for key in &step.extra {
        out.push(ReplayMismatch::ExtraMarker {
            step: step.index,
            key: key.clone(),
        });
    }
    out
}
