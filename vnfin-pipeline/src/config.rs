//! Immutable pipeline configuration.
//!
//! Built once at startup (defaults ← TOML file ← CLI flags, in the caller)
//! and passed into the driver by reference; nothing mutates it afterwards.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use vnfin_core::output::DATASET_FILENAME;
use vnfin_core::statement::ReportType;

pub const COMPANY_LIST_FILENAME: &str = "company_list.csv";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// All pipeline knobs. TOML-loadable; every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// First fiscal year to collect.
    pub start_year: i32,
    /// Last fiscal year to collect; `None` means the current year.
    pub end_year: Option<i32>,
    /// Downloader worker-pool size.
    pub thread_count: usize,
    /// Cap on companies processed (smoke-test runs).
    pub company_limit: Option<usize>,
    /// Exchanges to list companies from.
    pub exchanges: Vec<String>,
    /// Report types to collect.
    pub report_types: Vec<ReportType>,
    /// Directory for the final artifact and the company-list cache.
    pub output_dir: PathBuf,
    /// Path to the account-mapping JSON file.
    pub mapping_path: PathBuf,
    /// Re-fetch the company list even when a cached CSV exists.
    pub refresh_companies: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            start_year: 2015,
            end_year: None,
            thread_count: 8,
            company_limit: None,
            exchanges: vec!["HOSE".into(), "HNX".into()],
            report_types: ReportType::ALL.to_vec(),
            output_dir: PathBuf::from("output_data"),
            mapping_path: PathBuf::from("account_mapping.json"),
            refresh_companies: false,
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Parse a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Last fiscal year to request, defaulting to the current year.
    pub fn effective_end_year(&self) -> i32 {
        use chrono::Datelike;
        self.end_year
            .unwrap_or_else(|| chrono::Local::now().year())
    }

    /// Path of the final parquet artifact.
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(DATASET_FILENAME)
    }

    /// Path of the company-list cache CSV.
    pub fn company_list_path(&self) -> PathBuf {
        self.output_dir.join(COMPANY_LIST_FILENAME)
    }
}
