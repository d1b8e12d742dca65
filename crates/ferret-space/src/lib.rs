pub mod catalog;
pub mod domain;
pub mod rng;

pub use catalog::{ActionDescriptor, ActionSpace, ParamSpec, SpaceError};
pub use domain::ParamDomain;
pub use rng::{episode_rng, episode_seed, seeded_rng};
