use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use ferret_model::{ExchangeStatus, MarkerKey, Observation, StateSignature};

/// Outcome of a replay over the stored anomaly markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayVerdict {
    /// Every stored `(step, marker)` pair showed up again.
    Reproduced,
    /// Some, but not all, stored markers showed up again.
    PartiallyReproduced,
    /// None did, or the target could not be reset.
    NotReproduced,
}

impl ReplayVerdict {
    /// Process exit code for command-line callers.
    pub fn exit_code(&self) -> i32 {
        match self {
            ReplayVerdict::Reproduced => 0,
            ReplayVerdict::NotReproduced => 1,
            ReplayVerdict::PartiallyReproduced => 2,
        }
    }

    pub fn from_counts(expected: u32, reproduced: u32) -> Self {
        if reproduced >= expected {
            ReplayVerdict::Reproduced
        } else if reproduced > 0 {
            ReplayVerdict::PartiallyReproduced
        } else {
            ReplayVerdict::NotReproduced
        }
    }
}

impl fmt::Display for ReplayVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayVerdict::Reproduced => f.write_str("reproduced"),
            ReplayVerdict::PartiallyReproduced => f.write_str("partially reproduced"),
            ReplayVerdict::NotReproduced => f.write_str("not reproduced"),
        }
    }
}

/// A divergence between the artifact and the fresh run. Data, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplayMismatch {
    ResetFailed {
        reason: String,
    },
    StatusChanged {
        step: u32,
        expected: ExchangeStatus,
        actual: ExchangeStatus,
    },
    SignatureChanged {
        step: u32,
        expected: StateSignature,
        actual: StateSignature,
    },
    /// Stored marker absent from the fresh observation.
    MissingMarker { step: u32, key: MarkerKey },
    /// Fresh marker the artifact did not have.
    ExtraMarker { step: u32, key: MarkerKey },
}

impl fmt::Display for ReplayMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayMismatch::ResetFailed { reason } => write!(f, "reset failed: {reason}"),
            ReplayMismatch::StatusChanged {
                step,
                expected,
                actual,
            } => write!(f, "step {step}: status {expected} -> {actual}"),
            ReplayMismatch::SignatureChanged {
                step,
                expected,
                actual,
            } => write!(f, "step {step}: signature {expected} -> {actual}"),
            ReplayMismatch::MissingMarker { step, key } => {
                write!(f, "step {step}: missing marker {key}")
            }
            ReplayMismatch::ExtraMarker { step, key } => {
                write!(f, "step {step}: extra marker {key}")
            }
        }
    }
}

/// Stored vs fresh view of one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepComparison {
    pub index: u32,
    /// Rendered action, e.g. `purchase(expedite=true, item=doodads, quantity=10)`.
    pub action: String,
    pub expected_status: ExchangeStatus,
    pub actual_status: ExchangeStatus,
    pub expected_signature: StateSignature,
    pub actual_signature: StateSignature,
    pub missing: BTreeSet<MarkerKey>,
    pub extra: BTreeSet<MarkerKey>,
    /// Stored markers that appeared again at this step.
    pub reproduced: BTreeSet<MarkerKey>,
    pub observation: Observation,
}

impl StepComparison {
    pub fn signature_matches(&self) -> bool {
        self.expected_signature == self.actual_signature
    }

    pub fn is_exact(&self) -> bool {
        self.signature_matches()
            && self.expected_status == self.actual_status
            && self.missing.is_empty()
            && self.extra.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayReport {
    pub seed: u64,
    /// Target the replay ran against (may differ from the recorded one).
    pub target: String,
    pub recorded_target: String,
    pub steps: Vec<StepComparison>,
    pub mismatches: Vec<ReplayMismatch>,
    /// Stored `(step, marker)` pairs.
    pub expected_anomalies: u32,
    pub reproduced_anomalies: u32,
    pub verdict: ReplayVerdict,
}

impl ReplayReport {
    pub fn exit_code(&self) -> i32 {
        self.verdict.exit_code()
    }

    /// True when every step matched status, signature, and markers.
    pub fn is_exact(&self) -> bool {
        self.mismatches.is_empty()
    }
}
