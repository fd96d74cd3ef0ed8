//! Download orchestrator — coordinates per-company statement fetches on a
//! bounded worker pool.
//!
//! Each worker fetches one company and produces an independent result slot;
//! results are merged only after the whole pool drains (join-then-merge), so
//! there is no incremental shared-state mutation. Per-company failures are
//! recorded and logged, never fatal here — the pipeline driver decides when
//! an empty result set is fatal.

use log::warn;
use rayon::prelude::*;

use crate::company::Company;
use crate::source::{FetchProgress, SourceError, StatementSource};
use crate::statement::{RawStatement, ReportType};

/// Options for a download batch.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// First fiscal year to request.
    pub start_year: i32,
    /// Last fiscal year to request (inclusive).
    pub end_year: i32,
    /// Worker-pool size; `1` runs sequentially on the caller's thread.
    pub thread_count: usize,
    /// Truncate the company list before dispatch (smoke-test runs).
    pub limit: Option<usize>,
    /// Report types to request for each company.
    pub report_types: Vec<ReportType>,
}

/// Result of a download batch: successes and per-company failures.
#[derive(Debug)]
pub struct DownloadOutcome {
    pub statements: Vec<(Company, RawStatement)>,
    pub failures: Vec<(String, SourceError)>,
}

impl DownloadOutcome {
    pub fn summary(&self) -> DownloadSummary {
        DownloadSummary {
            total: self.statements.len() + self.failures.len(),
            succeeded: self.statements.len(),
            failed: self.failures.len(),
        }
    }
}

/// Summary of a download batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Download statements for all companies, at most `thread_count` in flight.
pub fn download_statements(
    source: &dyn StatementSource,
    companies: &[Company],
    opts: &DownloadOptions,
    progress: &dyn FetchProgress,
) -> DownloadOutcome {
    let companies = match opts.limit {
        Some(limit) => &companies[..companies.len().min(limit)],
        None => companies,
    };
    let total = companies.len();

    let fetch_one = |(index, company): (usize, &Company)| {
        progress.on_start(&company.symbol, index, total);
        let result = source.fetch_statement(
            company,
            opts.start_year,
            opts.end_year,
            &opts.report_types,
        );
        progress.on_complete(&company.symbol, result.as_ref().map(|s| s.items.len()));
        (company.clone(), result)
    };

    let results: Vec<(Company, Result<RawStatement, SourceError>)> = if opts.thread_count <= 1 {
        companies.iter().enumerate().map(fetch_one).collect()
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(opts.thread_count)
            .build()
            .expect("failed to build worker pool");
        pool.install(|| companies.par_iter().enumerate().map(fetch_one).collect())
    };

    // All workers have resolved; merge into the shared collection.
    let mut statements = Vec::new();
    let mut failures = Vec::new();
    for (company, result) in results {
        match result {
            Ok(statement) => statements.push((company, statement)),
            Err(e) => {
                warn!("download failed for {}: {e}", company.symbol);
                failures.push((company.symbol, e));
            }
        }
    }

    progress.on_batch_complete(statements.len(), failures.len(), total);

    DownloadOutcome {
        statements,
        failures,
    }
}
