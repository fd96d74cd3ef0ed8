//! Pipeline driver — sequences the four stages and produces a run report.
//!
//! list (or load cached list) → download → transform → write. Per-company
//! failures in download and transform reduce coverage but never abort the
//! run; only a total listing failure or an empty final dataset is fatal, and
//! no artifact is written on a fatal error.

use log::{info, warn};
use std::path::PathBuf;
use thiserror::Error;

use vnfin_core::company::{self, Company};
use vnfin_core::download::{download_statements, DownloadOptions};
use vnfin_core::mapping::{AccountMap, MappingError};
use vnfin_core::output::{self, OutputError};
use vnfin_core::source::{CompanySource, FetchProgress, SourceError, StatementSource};
use vnfin_core::transform::transform_statements;

use crate::config::PipelineConfig;

/// Fatal pipeline failures. Everything else is recorded in the report.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("company listing failed: {0}")]
    ListingFailed(#[source] SourceError),

    #[error("company listing returned no companies")]
    NoCompanies,

    #[error("transform produced an empty dataset")]
    EmptyDataset,

    #[error("account mapping could not be loaded: {0}")]
    Mapping(#[from] MappingError),

    #[error("failed to write output artifact: {0}")]
    Output(#[from] OutputError),
}

/// Per-stage counts for a completed run.
#[derive(Debug)]
pub struct PipelineReport {
    pub companies_listed: usize,
    pub downloaded: usize,
    /// (symbol, error text) for each failed download.
    pub download_failures: Vec<(String, String)>,
    /// Companies that contributed rows to the final dataset.
    pub transformed_companies: usize,
    /// (symbol, error text) for each company skipped during transform.
    pub transform_skips: Vec<(String, String)>,
    /// Distinct raw labels with no canonical form, in sorted order.
    pub unmapped_labels: Vec<String>,
    pub rows_written: usize,
    pub output_path: PathBuf,
}

/// Run the full pipeline with the given sources.
pub fn run_pipeline(
    config: &PipelineConfig,
    companies_source: &dyn CompanySource,
    statements_source: &dyn StatementSource,
    progress: &dyn FetchProgress,
) -> Result<PipelineReport, PipelineError> {
    let mapping = AccountMap::from_file(&config.mapping_path)?;
    info!(
        "loaded account mapping with {} entries from {}",
        mapping.len(),
        config.mapping_path.display()
    );

    let companies = load_or_fetch_companies(config, companies_source)?;
    if companies.is_empty() {
        return Err(PipelineError::NoCompanies);
    }
    info!("listing: {} companies", companies.len());

    let opts = DownloadOptions {
        start_year: config.start_year,
        end_year: config.effective_end_year(),
        thread_count: config.thread_count,
        limit: config.company_limit,
        report_types: config.report_types.clone(),
    };
    let outcome = download_statements(statements_source, &companies, &opts, progress);
    let summary = outcome.summary();
    info!(
        "download: {}/{} succeeded, {} failed",
        summary.succeeded, summary.total, summary.failed
    );

    let transformed = transform_statements(&outcome.statements, &mapping);
    info!(
        "transform: {} rows from {} companies, {} skipped, {} unmapped labels",
        transformed.rows.len(),
        transformed.company_count(),
        transformed.skipped.len(),
        transformed.unmapped_labels.len()
    );

    if transformed.rows.is_empty() {
        return Err(PipelineError::EmptyDataset);
    }

    let output_path = config.output_path();
    let rows_written = output::write_dataset(&transformed.rows, &output_path)?;
    info!("wrote {} rows to {}", rows_written, output_path.display());

    Ok(PipelineReport {
        companies_listed: companies.len(),
        downloaded: summary.succeeded,
        download_failures: outcome
            .failures
            .iter()
            .map(|(symbol, e)| (symbol.clone(), e.to_string()))
            .collect(),
        transformed_companies: transformed.company_count(),
        transform_skips: transformed
            .skipped
            .iter()
            .map(|(symbol, e)| (symbol.clone(), e.to_string()))
            .collect(),
        unmapped_labels: transformed.unmapped_labels.into_iter().collect(),
        rows_written,
        output_path,
    })
}

/// Resolve the company list: cached CSV unless a refresh is requested, with
/// fallback to the cache when a refresh fetch fails.
fn load_or_fetch_companies(
    config: &PipelineConfig,
    source: &dyn CompanySource,
) -> Result<Vec<Company>, PipelineError> {
    let cache_path = config.company_list_path();

    if !config.refresh_companies && cache_path.exists() {
        match company::load_company_csv(&cache_path) {
            Ok(companies) if !companies.is_empty() => {
                info!(
                    "loaded {} companies from {}",
                    companies.len(),
                    cache_path.display()
                );
                return Ok(companies);
            }
            Ok(_) => warn!("company-list cache {} is empty", cache_path.display()),
            Err(e) => warn!(
                "failed to read company-list cache {}: {e}",
                cache_path.display()
            ),
        }
    }

    match source.list_companies(&config.exchanges) {
        Ok(companies) => {
            let cached = std::fs::create_dir_all(&config.output_dir)
                .map_err(|e| e.to_string())
                .and_then(|()| {
                    company::save_company_csv(&companies, &cache_path).map_err(|e| e.to_string())
                });
            if let Err(e) = cached {
                warn!(
                    "failed to cache company list at {}: {e}",
                    cache_path.display()
                );
            }
            Ok(companies)
        }
        Err(e) => {
            // Stale list beats no list when the endpoint is down.
            if cache_path.exists() {
                warn!("listing fetch failed ({e}); falling back to cached company list");
                company::load_company_csv(&cache_path)
                    .map_err(|_| PipelineError::ListingFailed(e))
            } else {
                Err(PipelineError::ListingFailed(e))
            }
        }
    }
}
