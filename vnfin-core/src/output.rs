//! Final-dataset parquet output.
//!
//! Writes are atomic (write to .tmp, rename into place) and the artifact is
//! validated on read-back: expected column set present, at least one row.

use polars::prelude::*;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::transform::DatasetRow;

/// Column set of the final artifact, in write order.
pub const DATASET_COLUMNS: [&str; 10] = [
    "company_code",
    "exchange",
    "company_name",
    "industry",
    "report_type",
    "report_date",
    "account",
    "account_raw",
    "mapped",
    "value",
];

/// Default artifact file name under the output directory.
pub const DATASET_FILENAME: &str = "final_financial_statements.parquet";

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("dataframe construction: {0}")]
    Frame(String),

    #[error("parquet I/O error: {0}")]
    Parquet(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("dataset artifact is missing column '{0}'")]
    MissingColumn(String),

    #[error("dataset artifact is empty")]
    Empty,
}

/// Convert dataset rows to a Polars DataFrame in `DATASET_COLUMNS` order.
pub fn rows_to_dataframe(rows: &[DatasetRow]) -> Result<DataFrame, OutputError> {
    let company_codes: Vec<&str> = rows.iter().map(|r| r.company_code.as_str()).collect();
    let exchanges: Vec<&str> = rows.iter().map(|r| r.exchange.as_str()).collect();
    let company_names: Vec<&str> = rows.iter().map(|r| r.company_name.as_str()).collect();
    let industries: Vec<Option<&str>> = rows.iter().map(|r| r.industry.as_deref()).collect();
    let report_types: Vec<&str> = rows.iter().map(|r| r.report_type.as_str()).collect();
    let report_dates: Vec<&str> = rows.iter().map(|r| r.report_date.as_str()).collect();
    let accounts: Vec<&str> = rows.iter().map(|r| r.account.as_str()).collect();
    let accounts_raw: Vec<&str> = rows.iter().map(|r| r.account_raw.as_str()).collect();
    let mapped: Vec<bool> = rows.iter().map(|r| r.mapped).collect();
    let values: Vec<Option<f64>> = rows.iter().map(|r| r.value).collect();

    DataFrame::new(vec![
        Column::new("company_code".into(), company_codes),
        Column::new("exchange".into(), exchanges),
        Column::new("company_name".into(), company_names),
        Column::new("industry".into(), industries),
        Column::new("report_type".into(), report_types),
        Column::new("report_date".into(), report_dates),
        Column::new("account".into(), accounts),
        Column::new("account_raw".into(), accounts_raw),
        Column::new("mapped".into(), mapped),
        Column::new("value".into(), values),
    ])
    .map_err(|e| OutputError::Frame(format!("dataframe creation: {e}")))
}

/// Write the final dataset to `path`, creating parent directories.
///
/// Returns the number of rows written.
pub fn write_dataset(rows: &[DatasetRow], path: &Path) -> Result<usize, OutputError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| OutputError::Io(format!("failed to create output dir: {e}")))?;
        }
    }

    let df = rows_to_dataframe(rows)?;
    let tmp_path = path.with_extension("parquet.tmp");
    write_parquet(&df, &tmp_path)?;

    // Atomic rename
    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        OutputError::Io(format!("atomic rename failed: {e}"))
    })?;

    Ok(df.height())
}

/// Load the final dataset and validate its shape.
pub fn read_dataset(path: &Path) -> Result<DataFrame, OutputError> {
    let file = fs::File::open(path).map_err(|e| OutputError::Io(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| OutputError::Parquet(format!("read: {e}")))?;

    for col_name in &DATASET_COLUMNS {
        if df.column(col_name).is_err() {
            return Err(OutputError::MissingColumn(col_name.to_string()));
        }
    }
    if df.height() == 0 {
        return Err(OutputError::Empty);
    }

    Ok(df)
}

fn write_parquet(df: &DataFrame, path: &Path) -> Result<(), OutputError> {
    let file =
        fs::File::create(path).map_err(|e| OutputError::Parquet(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(&mut df.clone())
        .map_err(|e| OutputError::Parquet(format!("write parquet: {e}")))?;
    Ok(())
}
