//! # Tools Module
//!
//! Everything the research agent can call, plus report persistence.
//!
//! Every public operation here returns a `String`. Failures are rendered as
//! text starting with `"Error"` so the agent can read them and carry on,
//! instead of the whole run blowing up on a flaky website.

mod report;
mod scrape;
mod search;

pub use report::ReportWriter;
pub use scrape::ScrapeWebsiteTool;
pub use search::{CompetitorSearchTool, FinancialSearchTool, NewsSearchTool, SerpApiClient};

use serde::{Deserialize, Serialize};

use crate::error::ToolError;

/// Arguments shared by the three company lookup tools.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompanyQueryArgs {
    /// Name of the company to look up
    pub company_name: String,

    /// Industry the company operates in, used to disambiguate the query
    pub industry: String,
}

/// JSON schema for [`CompanyQueryArgs`], as presented to the LLM.
fn company_query_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "company_name": {
                "type": "string",
                "description": "Name of the company to research"
            },
            "industry": {
                "type": "string",
                "description": "Industry sector the company operates in"
            }
        },
        "required": ["company_name", "industry"]
    })
}

/// Render a tool failure the way the agent sees it.
fn error_text(action: &str, err: &ToolError) -> String {
    format!("Error {}: {}", action, err)
}
