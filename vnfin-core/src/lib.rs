//! vnfin core — data layer for the Vietnamese financial-statement pipeline.
//!
//! The pipeline is a straight left-to-right flow:
//! - Company listing (`company`, `source`) — tradable tickers from the source
//! - Statement download (`cafef`, `download`) — per-company raw line items,
//!   fetched on a bounded worker pool
//! - Account mapping (`mapping`) — raw label → canonical label lookup table
//! - Transform (`transform`) — label substitution and reshape into the
//!   consolidated schema
//! - Output (`output`) — the final parquet artifact

pub mod cafef;
pub mod company;
pub mod download;
pub mod mapping;
pub mod output;
pub mod source;
pub mod statement;
pub mod transform;

pub use company::Company;
pub use download::{download_statements, DownloadOptions, DownloadOutcome, DownloadSummary};
pub use mapping::AccountMap;
pub use source::{
    CompanySource, FetchProgress, SilentProgress, SourceError, StatementSource, StdoutProgress,
};
pub use statement::{RawStatement, ReportType};
pub use transform::{transform_statements, DatasetRow, TransformError, TransformOutcome};
