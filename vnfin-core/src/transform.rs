//! Transformer — raw statements into the consolidated dataset schema.
//!
//! Per company: validate periods and numeric cells, substitute canonical
//! account labels (keeping unmapped labels visible), attach company metadata,
//! and drop duplicate (report type, period, account) rows keep-first. A
//! company whose rows cannot be reshaped is skipped with a recorded warning;
//! the run continues with the remaining companies.

use log::warn;
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;

use crate::company::Company;
use crate::mapping::{AccountMap, LabelLookup};
use crate::statement::{RawStatement, ReportType};

/// Fiscal years outside this window are treated as scrape artifacts.
const MIN_FISCAL_YEAR: i32 = 1990;
const MAX_FISCAL_YEAR: i32 = 2100;

/// Per-company reshape failure. Recorded, not fatal.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("malformed report period '{period}'")]
    BadPeriod { period: String },

    #[error("malformed value '{value}' for account '{account}'")]
    BadValue { value: String, account: String },

    #[error("statement has no line items")]
    EmptyStatement,
}

/// One row of the final dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRow {
    pub company_code: String,
    pub exchange: String,
    pub company_name: String,
    pub industry: Option<String>,
    pub report_type: String,
    pub report_date: String,
    /// Canonical label when mapped, otherwise the raw label unchanged.
    pub account: String,
    /// As-reported label, always preserved.
    pub account_raw: String,
    pub mapped: bool,
    pub value: Option<f64>,
}

/// Result of transforming a download batch.
#[derive(Debug)]
pub struct TransformOutcome {
    pub rows: Vec<DatasetRow>,
    /// Companies skipped because their rows could not be reshaped.
    pub skipped: Vec<(String, TransformError)>,
    /// Distinct raw labels seen that have no canonical form.
    pub unmapped_labels: BTreeSet<String>,
}

impl TransformOutcome {
    /// Number of companies that contributed at least one row.
    pub fn company_count(&self) -> usize {
        let mut seen = HashSet::new();
        for row in &self.rows {
            seen.insert(row.company_code.as_str());
        }
        seen.len()
    }
}

/// A parsed numeric cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellValue {
    /// Empty or "-" cell: the filing has no figure for this line.
    Missing,
    Number(f64),
}

/// Parse a scraped numeric cell. Accepts thousands separators ("1,234") and
/// parenthesized negatives ("(500)"); returns `None` when the cell is
/// genuinely malformed.
pub fn parse_cell(raw: &str) -> Option<CellValue> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return Some(CellValue::Missing);
    }

    let (body, negate) = match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (inner, true),
        None => (trimmed, false),
    };

    let cleaned: String = body.chars().filter(|c| *c != ',').collect();
    let parsed: f64 = cleaned.trim().parse().ok()?;
    Some(CellValue::Number(if negate { -parsed } else { parsed }))
}

/// Validate a scraped period string as a fiscal year.
fn parse_period(raw: &str) -> Option<i32> {
    let year: i32 = raw.trim().parse().ok()?;
    (MIN_FISCAL_YEAR..=MAX_FISCAL_YEAR).contains(&year).then_some(year)
}

/// Transform all downloaded statements into dataset rows.
pub fn transform_statements(
    statements: &[(Company, RawStatement)],
    mapping: &AccountMap,
) -> TransformOutcome {
    let mut rows = Vec::new();
    let mut skipped = Vec::new();
    let mut unmapped_labels = BTreeSet::new();

    for (company, statement) in statements {
        match transform_company(company, statement, mapping) {
            Ok(company_rows) => {
                for row in &company_rows {
                    if !row.mapped {
                        unmapped_labels.insert(row.account_raw.clone());
                    }
                }
                rows.extend(company_rows);
            }
            Err(e) => {
                warn!("skipping {}: {e}", company.symbol);
                skipped.push((company.symbol.clone(), e));
            }
        }
    }

    rows.sort_by(|a, b| {
        (&a.company_code, &a.report_type, &a.report_date, &a.account)
            .cmp(&(&b.company_code, &b.report_type, &b.report_date, &b.account))
    });

    TransformOutcome {
        rows,
        skipped,
        unmapped_labels,
    }
}

/// Reshape one company's raw statement. Any malformed period or value fails
/// the whole company (conservative: no partial salvage).
fn transform_company(
    company: &Company,
    statement: &RawStatement,
    mapping: &AccountMap,
) -> Result<Vec<DatasetRow>, TransformError> {
    if statement.items.is_empty() {
        return Err(TransformError::EmptyStatement);
    }

    let mut rows = Vec::with_capacity(statement.items.len());
    let mut seen: HashSet<(ReportType, i32, String)> = HashSet::new();

    for item in &statement.items {
        let year = parse_period(&item.period).ok_or_else(|| TransformError::BadPeriod {
            period: item.period.clone(),
        })?;

        let value = match parse_cell(&item.value) {
            Some(CellValue::Number(v)) => Some(v),
            Some(CellValue::Missing) => None,
            None => {
                return Err(TransformError::BadValue {
                    value: item.value.clone(),
                    account: item.account.clone(),
                })
            }
        };

        let (account, mapped) = match mapping.resolve(&item.account) {
            LabelLookup::Canonical(canonical) => (canonical.to_string(), true),
            LabelLookup::Unmapped => (item.account.clone(), false),
        };

        // Keep-first on (report type, period, substituted account), so two
        // raw labels sharing a canonical form collapse to one row.
        if !seen.insert((item.report_type, year, account.clone())) {
            continue;
        }

        rows.push(DatasetRow {
            company_code: company.symbol.clone(),
            exchange: company.exchange.clone(),
            company_name: company.name.clone(),
            industry: company.industry.clone(),
            report_type: item.report_type.label().to_string(),
            report_date: year.to_string(),
            account,
            account_raw: item.account.clone(),
            mapped,
            value,
        });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::RawLineItem;

    fn company(symbol: &str) -> Company {
        Company {
            symbol: symbol.into(),
            exchange: "HOSE".into(),
            name: format!("{symbol} Corp"),
            industry: Some("Industrials".into()),
        }
    }

    fn item(rt: ReportType, period: &str, account: &str, value: &str) -> RawLineItem {
        RawLineItem {
            report_type: rt,
            period: period.into(),
            account: account.into(),
            value: value.into(),
        }
    }

    fn statement(symbol: &str, items: Vec<RawLineItem>) -> RawStatement {
        RawStatement {
            symbol: symbol.into(),
            items,
        }
    }

    #[test]
    fn parse_cell_accepts_source_formats() {
        assert_eq!(parse_cell("1,234"), Some(CellValue::Number(1234.0)));
        assert_eq!(parse_cell("(500)"), Some(CellValue::Number(-500.0)));
        assert_eq!(parse_cell(" 42.5 "), Some(CellValue::Number(42.5)));
        assert_eq!(parse_cell(""), Some(CellValue::Missing));
        assert_eq!(parse_cell("-"), Some(CellValue::Missing));
        assert_eq!(parse_cell("abc"), None);
        assert_eq!(parse_cell("(abc)"), None);
    }

    #[test]
    fn mapped_labels_are_substituted() {
        let mapping = AccountMap::from_entries([("Doanh thu thuần", "net_revenue")]);
        let batch = vec![(
            company("FPT"),
            statement(
                "FPT",
                vec![item(ReportType::IncomeStatement, "2020", "Doanh thu thuần", "1,000")],
            ),
        )];

        let outcome = transform_statements(&batch, &mapping);

        assert_eq!(outcome.rows.len(), 1);
        let row = &outcome.rows[0];
        assert_eq!(row.account, "net_revenue");
        assert_eq!(row.account_raw, "Doanh thu thuần");
        assert!(row.mapped);
        assert_eq!(row.value, Some(1000.0));
        assert!(outcome.unmapped_labels.is_empty());
    }

    #[test]
    fn unmapped_labels_pass_through_flagged() {
        let mapping = AccountMap::from_entries([("Doanh thu thuần", "net_revenue")]);
        let batch = vec![(
            company("FPT"),
            statement(
                "FPT",
                vec![item(ReportType::BalanceSheet, "2020", "Chỉ tiêu lạ", "7")],
            ),
        )];

        let outcome = transform_statements(&batch, &mapping);

        let row = &outcome.rows[0];
        assert_eq!(row.account, "Chỉ tiêu lạ");
        assert!(!row.mapped);
        assert!(outcome.unmapped_labels.contains("Chỉ tiêu lạ"));
    }

    #[test]
    fn duplicate_rows_kept_first() {
        let mapping = AccountMap::default();
        let batch = vec![(
            company("FPT"),
            statement(
                "FPT",
                vec![
                    item(ReportType::BalanceSheet, "2020", "Hàng tồn kho", "100"),
                    item(ReportType::BalanceSheet, "2020", "Hàng tồn kho", "999"),
                    item(ReportType::IncomeStatement, "2020", "Hàng tồn kho", "200"),
                ],
            ),
        )];

        let outcome = transform_statements(&batch, &mapping);

        assert_eq!(outcome.rows.len(), 2);
        let bsheet_row = outcome
            .rows
            .iter()
            .find(|r| r.report_type == ReportType::BalanceSheet.label())
            .unwrap();
        assert_eq!(bsheet_row.value, Some(100.0));
    }

    #[test]
    fn raw_labels_sharing_a_canonical_form_dedup_to_one_row() {
        let mapping = AccountMap::from_entries([
            ("Doanh thu thuần", "net_revenue"),
            ("Doanh thu bán hàng và cung cấp dịch vụ", "net_revenue"),
        ]);
        let batch = vec![(
            company("FPT"),
            statement(
                "FPT",
                vec![
                    item(
                        ReportType::IncomeStatement,
                        "2020",
                        "Doanh thu thuần",
                        "1,000",
                    ),
                    item(
                        ReportType::IncomeStatement,
                        "2020",
                        "Doanh thu bán hàng và cung cấp dịch vụ",
                        "999",
                    ),
                ],
            ),
        )];

        let outcome = transform_statements(&batch, &mapping);

        assert_eq!(outcome.rows.len(), 1);
        let row = &outcome.rows[0];
        assert_eq!(row.account, "net_revenue");
        assert_eq!(row.account_raw, "Doanh thu thuần");
        assert_eq!(row.value, Some(1000.0));
    }

    #[test]
    fn malformed_value_skips_whole_company() {
        let mapping = AccountMap::default();
        let batch = vec![
            (
                company("AAA"),
                statement(
                    "AAA",
                    vec![
                        item(ReportType::BalanceSheet, "2020", "Tiền", "50"),
                        item(ReportType::BalanceSheet, "2021", "Tiền", "not-a-number"),
                    ],
                ),
            ),
            (
                company("BBB"),
                statement(
                    "BBB",
                    vec![item(ReportType::BalanceSheet, "2020", "Tiền", "60")],
                ),
            ),
        ];

        let outcome = transform_statements(&batch, &mapping);

        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.rows[0].company_code, "BBB");
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].0, "AAA");
        assert!(matches!(
            outcome.skipped[0].1,
            TransformError::BadValue { .. }
        ));
    }

    #[test]
    fn malformed_period_skips_whole_company() {
        let mapping = AccountMap::default();
        let batch = vec![(
            company("AAA"),
            statement(
                "AAA",
                vec![item(ReportType::BalanceSheet, "20Q4", "Tiền", "50")],
            ),
        )];

        let outcome = transform_statements(&batch, &mapping);

        assert!(outcome.rows.is_empty());
        assert!(matches!(
            outcome.skipped[0].1,
            TransformError::BadPeriod { .. }
        ));
    }

    #[test]
    fn empty_statement_is_recorded() {
        let mapping = AccountMap::default();
        let batch = vec![(company("AAA"), statement("AAA", vec![]))];

        let outcome = transform_statements(&batch, &mapping);

        assert!(matches!(
            outcome.skipped[0].1,
            TransformError::EmptyStatement
        ));
    }

    #[test]
    fn missing_cells_become_null_not_failures() {
        let mapping = AccountMap::default();
        let batch = vec![(
            company("AAA"),
            statement(
                "AAA",
                vec![
                    item(ReportType::BalanceSheet, "2020", "Tiền", "-"),
                    item(ReportType::BalanceSheet, "2021", "Tiền", ""),
                ],
            ),
        )];

        let outcome = transform_statements(&batch, &mapping);

        assert_eq!(outcome.rows.len(), 2);
        assert!(outcome.rows.iter().all(|r| r.value.is_none()));
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn row_count_matches_distinct_period_account_pairs() {
        let mapping = AccountMap::default();
        let mut items = Vec::new();
        for year in 2018..=2021 {
            for account in ["Tiền", "Hàng tồn kho", "Nợ phải trả"] {
                items.push(item(
                    ReportType::BalanceSheet,
                    &year.to_string(),
                    account,
                    "1",
                ));
            }
        }
        let batch = vec![(company("AAA"), statement("AAA", items))];

        let outcome = transform_statements(&batch, &mapping);

        assert_eq!(outcome.rows.len(), 4 * 3);
    }

    #[test]
    fn rows_sorted_by_company_then_report_then_period() {
        let mapping = AccountMap::default();
        let batch = vec![
            (
                company("ZZZ"),
                statement(
                    "ZZZ",
                    vec![item(ReportType::BalanceSheet, "2020", "Tiền", "1")],
                ),
            ),
            (
                company("AAA"),
                statement(
                    "AAA",
                    vec![
                        item(ReportType::BalanceSheet, "2021", "Tiền", "1"),
                        item(ReportType::BalanceSheet, "2020", "Tiền", "1"),
                    ],
                ),
            ),
        ];

        let outcome = transform_statements(&batch, &mapping);

        let keys: Vec<_> = outcome
            .rows
            .iter()
            .map(|r| (r.company_code.as_str(), r.report_date.as_str()))
            .collect();
        assert_eq!(keys, vec![("AAA", "2020"), ("AAA", "2021"), ("ZZZ", "2020")]);
    }
}
