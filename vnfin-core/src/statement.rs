//! Raw statement records and report-type definitions.

use serde::{Deserialize, Serialize};

/// The four financial-statement kinds published by the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportType {
    #[serde(rename = "bsheet")]
    BalanceSheet,
    #[serde(rename = "incsta")]
    IncomeStatement,
    #[serde(rename = "cashflow")]
    CashFlow,
    #[serde(rename = "cashflowdirect")]
    CashFlowDirect,
}

impl ReportType {
    /// All report types, in the source's publication order.
    pub const ALL: [ReportType; 4] = [
        ReportType::BalanceSheet,
        ReportType::IncomeStatement,
        ReportType::CashFlow,
        ReportType::CashFlowDirect,
    ];

    /// Short slug used in source URLs and on the command line.
    pub fn slug(&self) -> &'static str {
        match self {
            ReportType::BalanceSheet => "bsheet",
            ReportType::IncomeStatement => "incsta",
            ReportType::CashFlow => "cashflow",
            ReportType::CashFlowDirect => "cashflowdirect",
        }
    }

    /// Display label used in the final dataset's `report_type` column.
    pub fn label(&self) -> &'static str {
        match self {
            ReportType::BalanceSheet => "Balance Sheet",
            ReportType::IncomeStatement => "Income Statement",
            ReportType::CashFlow => "Cash Flow Statement",
            ReportType::CashFlowDirect => "Direct Cash Flow Statement",
        }
    }

    /// Parse a slug back into a report type.
    pub fn from_slug(slug: &str) -> Option<ReportType> {
        ReportType::ALL.into_iter().find(|rt| rt.slug() == slug)
    }
}

/// One raw line item, exactly as scraped: period and value are the source's
/// strings, the account label is the as-reported (Vietnamese) name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLineItem {
    pub report_type: ReportType,
    pub period: String,
    pub account: String,
    pub value: String,
}

/// One company's raw statement rows, produced by the downloader and consumed
/// once by the transformer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawStatement {
    pub symbol: String,
    pub items: Vec<RawLineItem>,
}
