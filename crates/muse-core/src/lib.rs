pub mod config;
pub mod error;
pub mod format;
pub mod git;
pub mod hash;
pub mod heuristic;
pub mod pipeline;
pub mod prompt;
pub mod provider;
pub mod style;
pub mod types;

pub use error::{FailureKind, GenerationFailure};
pub use pipeline::{Generated, Pipeline, PipelineSettings};
pub use provider::{ProviderConfig, ProviderGateway, ProviderId};

pub const SCHEMA_VERSION: &str = "v1";
