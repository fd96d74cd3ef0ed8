//! CafeF data source.
//!
//! Fetches the company listing and per-company financial statements from
//! CafeF's JSON endpoints. Handles retries with exponential backoff and
//! response parsing. CafeF has no official API and is subject to unannounced
//! format changes; every parse failure surfaces as
//! `SourceError::MalformedResponse` rather than a panic.

use log::debug;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::company::Company;
use crate::source::{CompanySource, SourceError, StatementSource};
use crate::statement::{RawLineItem, RawStatement, ReportType};

const BASE_URL: &str = "https://s.cafef.vn/api";

/// Upper bound on a server-supplied Retry-After wait.
const RETRY_AFTER_CAP_SECS: u64 = 60;

/// Envelope shared by CafeF's JSON endpoints.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    data: Option<T>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ListingEntry {
    symbol: String,
    exchange: String,
    #[serde(rename = "companyName")]
    company_name: String,
    industry: Option<String>,
    /// Instrument kind; the listing mixes stocks with funds and bonds.
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatementEntry {
    account: String,
    #[serde(default)]
    value: String,
}

/// CafeF HTTP client, implementing both source traits.
pub struct CafefClient {
    client: reqwest::blocking::Client,
    max_retries: u32,
    base_delay: Duration,
}

impl CafefClient {
    pub fn new() -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }

    /// Listing endpoint for one exchange.
    fn listing_url(exchange: &str) -> String {
        format!("{BASE_URL}/company/list?exchange={exchange}")
    }

    /// Statement endpoint for one (symbol, report type, year).
    fn statement_url(symbol: &str, report_type: ReportType, year: i32) -> String {
        format!(
            "{BASE_URL}/financial-report/{symbol}?type={}&year={year}",
            report_type.slug()
        )
    }

    /// Execute one GET with retry (exponential backoff, Retry-After honored
    /// on 429), decoding the CafeF response envelope.
    fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T, SourceError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                std::thread::sleep(self.retry_delay(attempt, last_error.as_ref()));
            }

            match self.client.get(url).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(60);
                        last_error = Some(SourceError::RateLimited {
                            retry_after_secs: retry_after,
                        });
                        continue;
                    }

                    if !status.is_success() {
                        last_error =
                            Some(SourceError::Unreachable(format!("HTTP {status} for {what}")));
                        continue;
                    }

                    let envelope: ApiResponse<T> = resp.json().map_err(|e| {
                        SourceError::MalformedResponse(format!(
                            "failed to parse response for {what}: {e}"
                        ))
                    })?;

                    return match envelope.data {
                        Some(data) => Ok(data),
                        None => Err(match envelope.error {
                            Some(err) => SourceError::MalformedResponse(format!(
                                "{what}: {} ({})",
                                err.message, err.code
                            )),
                            None => SourceError::MalformedResponse(format!(
                                "{what}: empty payload with no error"
                            )),
                        }),
                    };
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        last_error = Some(SourceError::Unreachable(e.to_string()));
                        continue;
                    }
                    return Err(SourceError::Unreachable(e.to_string()));
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| SourceError::Unreachable(format!("max retries exceeded for {what}"))))
    }

    /// Wait before the next attempt: a server-supplied Retry-After (capped)
    /// when the previous response was a 429, exponential backoff otherwise.
    fn retry_delay(&self, attempt: u32, last_error: Option<&SourceError>) -> Duration {
        match last_error {
            Some(SourceError::RateLimited { retry_after_secs }) => {
                Duration::from_secs((*retry_after_secs).min(RETRY_AFTER_CAP_SECS))
            }
            _ => self.base_delay * 2u32.pow(attempt - 1),
        }
    }
}

impl Default for CafefClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CompanySource for CafefClient {
    fn name(&self) -> &str {
        "cafef"
    }

    fn list_companies(&self, exchanges: &[String]) -> Result<Vec<Company>, SourceError> {
        let mut companies = Vec::new();
        let mut last_error = None;

        for exchange in exchanges {
            let url = Self::listing_url(exchange);
            match self.get_json::<Vec<ListingEntry>>(&url, &format!("listing {exchange}")) {
                Ok(entries) => companies.extend(filter_listing(entries)),
                Err(e) => {
                    debug!("listing request for {exchange} failed: {e}");
                    last_error = Some(e);
                }
            }
        }

        // A run can survive one exchange being down, but an entirely empty
        // listing is a hard failure.
        if companies.is_empty() {
            return Err(last_error.unwrap_or_else(|| {
                SourceError::MalformedResponse("listing returned no companies".into())
            }));
        }

        companies.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        companies.dedup_by(|a, b| a.symbol == b.symbol);
        Ok(companies)
    }
}

impl StatementSource for CafefClient {
    fn name(&self) -> &str {
        "cafef"
    }

    fn fetch_statement(
        &self,
        company: &Company,
        start_year: i32,
        end_year: i32,
        report_types: &[ReportType],
    ) -> Result<RawStatement, SourceError> {
        let mut items = Vec::new();

        for &report_type in report_types {
            for year in start_year..=end_year {
                let url = Self::statement_url(&company.symbol, report_type, year);
                let what = format!("{} {} {year}", company.symbol, report_type.slug());
                match self.get_json::<Vec<StatementEntry>>(&url, &what) {
                    Ok(entries) => {
                        items.extend(entries.into_iter().map(|e| RawLineItem {
                            report_type,
                            period: year.to_string(),
                            account: e.account,
                            value: e.value,
                        }));
                    }
                    // A missing (report type, year) table just means no
                    // filing for that year; the company fails only when
                    // every request comes back empty.
                    Err(e) => debug!("no table for {what}: {e}"),
                }
            }
        }

        if items.is_empty() {
            return Err(SourceError::NoData {
                symbol: company.symbol.clone(),
            });
        }

        Ok(RawStatement {
            symbol: company.symbol.clone(),
            items,
        })
    }
}

/// Keep plain stock listings, dropping funds/bonds and blank symbols.
fn filter_listing(entries: Vec<ListingEntry>) -> Vec<Company> {
    entries
        .into_iter()
        .filter(|e| !e.symbol.trim().is_empty())
        .filter(|e| match &e.kind {
            Some(kind) => kind.eq_ignore_ascii_case("stock"),
            None => true,
        })
        .map(|e| Company {
            symbol: e.symbol.trim().to_uppercase(),
            exchange: e.exchange,
            name: e.company_name,
            industry: e.industry,
        })
        .collect()
}
