//! Company records and the on-disk company-list cache.
//!
//! The fetched listing is persisted as a CSV next to the output artifact so
//! subsequent runs can skip the listing endpoint (and so a run can fall back
//! to the cached list when the endpoint is down).

use serde::{Deserialize, Serialize};
use std::path::Path;

/// One tradable company, as returned by the listing source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    /// Ticker symbol, upper-cased.
    pub symbol: String,
    /// Exchange code (e.g. HOSE, HNX).
    pub exchange: String,
    /// Registered company name.
    pub name: String,
    /// Industry classification, when the source provides one.
    pub industry: Option<String>,
}

/// Save the company list as CSV.
pub fn save_company_csv(companies: &[Company], path: &Path) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_path(path)?;
    for company in companies {
        wtr.serialize(company)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Load a previously saved company list.
pub fn load_company_csv(path: &Path) -> Result<Vec<Company>, csv::Error> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut companies = Vec::new();
    for record in rdr.deserialize() {
        companies.push(record?);
    }
    Ok(companies)
}
