pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliArgs;
pub use config::ReconConfig;

pub use adapters::storage::LocalStorage;
pub use core::{etl::EtlEngine, pipeline::ReconPipeline, pipeline::RunSummary};
pub use utils::error::{EtlError, Result};
