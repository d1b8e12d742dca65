pub mod campaign;
pub mod config;
pub mod entry;
pub mod logging;
pub mod report;

pub use campaign::{run_episodes, TransportFactory};
pub use config::{ConfigError, EngineConfig, RunConfig};
pub use entry::{replay, replay_with, run, RunError};
pub use report::{EpisodeSummary, RunReport};
