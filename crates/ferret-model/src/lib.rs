pub mod action;
pub mod anomaly;
pub mod episode;
pub mod observation;
pub mod signature;
pub mod snapshot;

pub use action::{Action, ActionParams, Method, ParamValue, Precondition, Route};
pub use anomaly::{AnomalyKind, AnomalyMarker, MarkerKey};
pub use episode::{
    AnomalySummary, Episode, EpisodeFormatError, EpisodeRecorder, EpisodeStep, StopReason,
    ARTIFACT_FORMAT_VERSION,
};
pub use observation::{ExchangeStatus, Observation};
pub use signature::StateSignature;
pub use snapshot::{StateSnapshot, TargetEvent};
