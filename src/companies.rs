//! Company list loading.
//!
//! The input CSV has a header row followed by `website,industry` rows.

use anyhow::{bail, Context, Result};
use std::path::Path;
use tracing::{debug, warn};
use url::Url;

/// One company to research.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyRow {
    pub name: String,
    pub website: String,
    pub industry: String,
}

impl CompanyRow {
    /// Build a row from a website, deriving the name unless one is given.
    pub fn new(website: &str, industry: &str, name: Option<&str>) -> Result<Self> {
        let website = first_token(website)
            .context("website must not be empty")?
            .to_string();

        let name = match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => company_name_from_url(&website)?,
        };

        Ok(Self {
            name,
            website,
            industry: industry.trim().to_string(),
        })
    }
}

fn first_token(raw: &str) -> Option<&str> {
    raw.split_whitespace().next()
}

/// Derive a short company identifier from its website.
///
/// `https://www.acme.example.com/about` becomes `ACME`.
pub fn company_name_from_url(raw_url: &str) -> Result<String> {
    let token = match first_token(raw_url) {
        Some(token) => token,
        None => bail!("website is empty"),
    };

    let with_scheme = if token.contains("://") {
        token.to_string()
    } else {
        format!("https://{}", token)
    };

    let url = Url::parse(&with_scheme).with_context(|| format!("invalid website '{}'", token))?;
    let host = url
        .host_str()
        .with_context(|| format!("website '{}' has no host", token))?;

    let host = host.strip_prefix("www.").unwrap_or(host);
    let label = host.split('.').next().unwrap_or(host);
    if label.is_empty() {
        bail!("website '{}' has an empty host label", token);
    }

    Ok(label.to_uppercase())
}

/// Read companies from `path`, keeping at most `limit` rows.
///
/// Rows with a missing website or industry cell are skipped with a warning.
pub fn load_companies(path: &Path, limit: Option<usize>) -> Result<Vec<CompanyRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open company list {}", path.display()))?;

    let limit = limit.unwrap_or(usize::MAX);
    let mut rows = Vec::new();

    for (index, record) in reader.records().enumerate() {
        if rows.len() >= limit {
            break;
        }

        // Header is line 1
        let line = index + 2;
        let record =
            record.with_context(|| format!("Malformed CSV record at line {}", line))?;

        let (website, industry) = match (record.get(0), record.get(1)) {
            (Some(website), Some(industry)) if !website.is_empty() && !industry.is_empty() => {
                (website, industry)
            }
            _ => {
                warn!(line, "Skipping row without website and industry");
                continue;
            }
        };

        let row = CompanyRow::new(website, industry, None)
            .with_context(|| format!("Bad website at line {}", line))?;
        debug!(line, company = %row.name, "Loaded company");
        rows.push(row);
    }

    Ok(rows)
}
