pub mod classify;
pub mod config;
pub mod environment;
pub mod http;
pub mod memory;
pub mod transport;

pub use classify::Classifier;
pub use config::EnvConfig;
pub use environment::{EnvError, Environment};
pub use http::HttpTransport;
pub use memory::{InMemoryTarget, TargetFaults};
pub use transport::{TargetRequest, TargetResponse, Transport, TransportError};
