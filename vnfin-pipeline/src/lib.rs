//! Pipeline orchestration — configuration, stage sequencing, run report.

pub mod config;
pub mod runner;

pub use config::{ConfigError, PipelineConfig};
pub use runner::{run_pipeline, PipelineError, PipelineReport};
