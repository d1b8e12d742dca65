//! Deterministic re-execution of persisted episodes.
//!
//! A replay resets the target, sends the stored actions in stored order with
//! stored parameters, and compares what comes back against the artifact.
//! No policy and no randomness are involved.

pub mod replay;
pub mod report;

pub use replay::{load_episode, replay_episode, ReplayError};
pub use report::{ReplayMismatch, ReplayReport, ReplayVerdict, StepComparison};
