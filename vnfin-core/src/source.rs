//! Source traits and structured error types.
//!
//! The `CompanySource` and `StatementSource` traits abstract over the data
//! source so the pipeline can swap implementations and mock for tests. The
//! CafeF HTTP client implements both; everything above these traits is
//! network-free.

use thiserror::Error;

use crate::company::Company;
use crate::statement::{RawStatement, ReportType};

/// Structured error types for source operations.
///
/// Listing failures and per-company download failures share this taxonomy;
/// whether an error is fatal is decided by the caller (a total listing
/// failure aborts the run, a per-company fetch failure does not).
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source unreachable: {0}")]
    Unreachable(String),

    #[error("rate limited by source (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    MalformedResponse(String),

    #[error("no statement data for '{symbol}' in any requested year")]
    NoData { symbol: String },
}

/// Trait for company-listing sources.
pub trait CompanySource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Fetch the ordered list of tradable companies on the given exchanges.
    fn list_companies(&self, exchanges: &[String]) -> Result<Vec<Company>, SourceError>;
}

/// Trait for per-company statement sources.
pub trait StatementSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Fetch all raw statement line items for one company, covering the
    /// requested report types from `start_year` through `end_year` inclusive.
    fn fetch_statement(
        &self,
        company: &Company,
        start_year: i32,
        end_year: i32,
        report_types: &[ReportType],
    ) -> Result<RawStatement, SourceError>;
}

/// Progress callback for multi-company downloads.
///
/// Implementations must be `Sync`: callbacks fire from worker-pool threads.
pub trait FetchProgress: Send + Sync {
    /// Called when a company's fetch is dispatched.
    fn on_start(&self, symbol: &str, index: usize, total: usize);

    /// Called when a company's fetch completes; `Ok` carries the line-item count.
    fn on_complete(&self, symbol: &str, result: Result<usize, &SourceError>);

    /// Called once after the whole batch has been merged.
    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Simple progress reporter that prints to stdout.
pub struct StdoutProgress;

impl FetchProgress for StdoutProgress {
    fn on_start(&self, symbol: &str, index: usize, total: usize) {
        println!("[{}/{}] Fetching {symbol}...", index + 1, total);
    }

    fn on_complete(&self, symbol: &str, result: Result<usize, &SourceError>) {
        match result {
            Ok(items) => println!("  OK: {symbol} ({items} line items)"),
            Err(e) => println!("  FAIL: {symbol}: {e}"),
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        println!("\nDownload complete: {succeeded}/{total} succeeded, {failed} failed");
    }
}

/// Progress reporter that stays quiet (tests, library embedding).
pub struct SilentProgress;

impl FetchProgress for SilentProgress {
    fn on_start(&self, _symbol: &str, _index: usize, _total: usize) {}
    fn on_complete(&self, _symbol: &str, _result: Result<usize, &SourceError>) {}
    fn on_batch_complete(&self, _succeeded: usize, _failed: usize, _total: usize) {}
}
