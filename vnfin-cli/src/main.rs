//! vnfin CLI — collect Vietnamese financial statements into one parquet
//! dataset.
//!
//! Single entry point, no required flags: lists companies, downloads
//! statements on a worker pool, standardizes account names, and writes
//! `final_financial_statements.parquet`. Flags override the optional TOML
//! config file, which overrides built-in defaults.

use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;

use vnfin_core::cafef::CafefClient;
use vnfin_core::source::StdoutProgress;
use vnfin_core::statement::ReportType;
use vnfin_pipeline::{run_pipeline, PipelineConfig, PipelineReport};

#[derive(Parser)]
#[command(
    name = "vnfin",
    about = "Collect Vietnamese financial statements into one parquet dataset"
)]
struct Cli {
    /// Cap the number of companies processed (smoke-test runs).
    #[arg(long)]
    limit: Option<usize>,

    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// First fiscal year to collect.
    #[arg(long)]
    start_year: Option<i32>,

    /// Last fiscal year to collect. Defaults to the current year.
    #[arg(long)]
    end_year: Option<i32>,

    /// Downloader worker-pool size.
    #[arg(long)]
    threads: Option<usize>,

    /// Run the downloader sequentially (equivalent to --threads 1).
    #[arg(long, default_value_t = false)]
    single_thread: bool,

    /// Output directory for the artifact and the company-list cache.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Path to the account-mapping JSON file.
    #[arg(long)]
    mapping: Option<PathBuf>,

    /// Report types to collect: bsheet, incsta, cashflow, cashflowdirect.
    /// Repeatable; defaults to all four.
    #[arg(long = "report-type")]
    report_type: Vec<String>,

    /// Re-fetch the company list even when a cached CSV exists.
    #[arg(long, default_value_t = false)]
    refresh_companies: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = build_config(&cli)?;
    let client = CafefClient::new();
    let progress = StdoutProgress;

    match run_pipeline(&config, &client, &client, &progress) {
        Ok(report) => {
            print_summary(&report);
            Ok(())
        }
        Err(e) => {
            eprintln!("pipeline failed: {e}");
            std::process::exit(1);
        }
    }
}

/// Overlay CLI flags onto the config file (or defaults).
fn build_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(limit) = cli.limit {
        config.company_limit = Some(limit);
    }
    if let Some(start_year) = cli.start_year {
        config.start_year = start_year;
    }
    if let Some(end_year) = cli.end_year {
        config.end_year = Some(end_year);
    }
    if let Some(threads) = cli.threads {
        config.thread_count = threads;
    }
    if cli.single_thread {
        config.thread_count = 1;
    }
    if let Some(output_dir) = &cli.output_dir {
        config.output_dir = output_dir.clone();
    }
    if let Some(mapping) = &cli.mapping {
        config.mapping_path = mapping.clone();
    }
    if !cli.report_type.is_empty() {
        config.report_types = parse_report_types(&cli.report_type)?;
    }
    if cli.refresh_companies {
        config.refresh_companies = true;
    }

    Ok(config)
}

fn parse_report_types(slugs: &[String]) -> Result<Vec<ReportType>> {
    slugs
        .iter()
        .map(|slug| match ReportType::from_slug(slug) {
            Some(rt) => Ok(rt),
            None => bail!(
                "unknown report type '{slug}'. Valid: bsheet, incsta, cashflow, cashflowdirect"
            ),
        })
        .collect()
}

fn print_summary(report: &PipelineReport) {
    println!();
    println!("=== Pipeline Summary ===");
    println!("Companies listed:    {}", report.companies_listed);
    println!(
        "Downloads:           {} ok, {} failed",
        report.downloaded,
        report.download_failures.len()
    );
    for (symbol, error) in &report.download_failures {
        println!("  download failed: {symbol}: {error}");
    }
    println!(
        "Transformed:         {} companies, {} skipped",
        report.transformed_companies,
        report.transform_skips.len()
    );
    for (symbol, error) in &report.transform_skips {
        println!("  transform skipped: {symbol}: {error}");
    }
    println!("Unmapped labels:     {}", report.unmapped_labels.len());
    println!("Rows written:        {}", report.rows_written);
    println!("Artifact:            {}", report.output_path.display());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn write_config_toml(content: &str) -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = env::temp_dir().join(format!("vnfin_cli_{}_{id}.toml", std::process::id()));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn no_flags_yield_the_default_config() {
        let cli = Cli::parse_from(["vnfin"]);
        let config = build_config(&cli).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn flags_override_the_config_file() {
        let path = write_config_toml(
            r#"
            start_year = 2018
            thread_count = 4
            company_limit = 3
            output_dir = "toml_out"
            "#,
        );

        let cli = Cli::parse_from([
            "vnfin",
            "--config",
            path.to_str().unwrap(),
            "--start-year",
            "2019",
            "--limit",
            "7",
            "--report-type",
            "bsheet",
        ]);
        let config = build_config(&cli).unwrap();
        let _ = fs::remove_file(&path);

        // Flag beats file.
        assert_eq!(config.start_year, 2019);
        assert_eq!(config.company_limit, Some(7));
        assert_eq!(config.report_types, vec![ReportType::BalanceSheet]);
        // File beats default where no flag was given.
        assert_eq!(config.thread_count, 4);
        assert_eq!(config.output_dir, PathBuf::from("toml_out"));
        // Untouched fields keep their defaults.
        assert_eq!(config.exchanges, vec!["HOSE".to_string(), "HNX".to_string()]);
    }

    #[test]
    fn single_thread_wins_over_threads() {
        let cli = Cli::parse_from(["vnfin", "--threads", "8", "--single-thread"]);
        let config = build_config(&cli).unwrap();
        assert_eq!(config.thread_count, 1);
    }

    #[test]
    fn unknown_report_type_flag_is_rejected() {
        let cli = Cli::parse_from(["vnfin", "--report-type", "quarterly"]);
        assert!(build_config(&cli).is_err());
    }
}
