pub mod explorer;
pub mod novelty;
pub mod policy;
pub mod reward;
pub mod stats;
pub mod stop;
pub mod store;

pub use explorer::{EpisodeOutcome, ExploreError, Explorer, ExplorerConfig};
pub use novelty::NoveltyMemory;
pub use policy::{EpsilonGreedy, Policy, Scripted, SelectionContext};
pub use reward::RewardConfig;
pub use stats::ActionStats;
pub use stop::StopSignal;
pub use store::{ArtifactStore, StoreError};
