//! SerpApi search tools: news, financial data and competitors.
//!
//! All three share one [`SerpApiClient`]; they differ only in engine, query
//! string, and which parts of the response they keep.

use rig::completion::ToolDefinition;
use rig::tool::Tool;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{company_query_schema, error_text, CompanyQueryArgs};
use crate::error::ToolError;

/// News articles kept per search.
const MAX_NEWS_ITEMS: usize = 5;

/// Organic results kept per general search.
const MAX_ORGANIC_RESULTS: usize = 3;

// =============================================================================
// RESPONSE SHAPES
// =============================================================================
/// One news article, reduced to what the report needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
    pub source: String,
    pub date: String,
    pub snippet: String,
}

/// One organic search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganicResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

/// Output of the financial data search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialInfo {
    pub search_results: Vec<OrganicResult>,
    /// SerpApi's knowledge panel, passed through untouched
    pub knowledge_graph: Value,
    /// SerpApi's highlighted answer, passed through untouched
    pub answer_box: Value,
}

/// Output of the competitor search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorInfo {
    pub search_results: Vec<OrganicResult>,
    /// SerpApi's "related searches" block, passed through untouched
    pub related_searches: Value,
}

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Google News reports `source` either as a plain string or as an object
/// with a `name`.
fn source_name(article: &Value) -> String {
    match article.get("source") {
        Some(Value::String(name)) => name.clone(),
        Some(source @ Value::Object(_)) => str_field(source, "name"),
        _ => String::new(),
    }
}

/// Keep the first few `news_results`.
pub fn news_items(data: &Value) -> Vec<NewsItem> {
    data.get("news_results")
        .and_then(Value::as_array)
        .map(|articles| {
            articles
                .iter()
                .take(MAX_NEWS_ITEMS)
                .map(|article| NewsItem {
                    title: str_field(article, "title"),
                    link: str_field(article, "link"),
                    source: source_name(article),
                    date: str_field(article, "date"),
                    snippet: str_field(article, "snippet"),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Keep the first few `organic_results`.
pub fn organic_results(data: &Value) -> Vec<OrganicResult> {
    data.get("organic_results")
        .and_then(Value::as_array)
        .map(|results| {
            results
                .iter()
                .take(MAX_ORGANIC_RESULTS)
                .map(|result| OrganicResult {
                    title: str_field(result, "title"),
                    link: str_field(result, "link"),
                    snippet: str_field(result, "snippet"),
                })
                .collect()
        })
        .unwrap_or_default()
}

pub fn financial_info(data: &Value) -> FinancialInfo {
    FinancialInfo {
        search_results: organic_results(data),
        knowledge_graph: data
            .get("knowledge_graph")
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default())),
        answer_box: data
            .get("answer_box")
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default())),
    }
}

pub fn competitor_info(data: &Value) -> CompetitorInfo {
    CompetitorInfo {
        search_results: organic_results(data),
        related_searches: data
            .get("related_searches")
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new())),
    }
}

// =============================================================================
// SERPAPI CLIENT
// =============================================================================
/// Thin SerpApi client shared by the search tools.
#[derive(Debug, Clone)]
pub struct SerpApiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl SerpApiClient {
    /// Create a client for `base_url` (normally `https://serpapi.com/search`).
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ToolError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into(),
        })
    }

    /// Recent news about the company, as a JSON array.
    pub async fn search_news(&self, company_name: &str, industry: &str) -> String {
        info!(company = %company_name, "Fetching news");

        self.news_json(company_name, industry)
            .await
            .unwrap_or_else(|e| {
                warn!(company = %company_name, error = %e, "News search failed");
                error_text("searching news", &e)
            })
    }

    /// Financial signals: knowledge panel, answer box and top results.
    pub async fn search_financial_data(&self, company_name: &str, industry: &str) -> String {
        info!(company = %company_name, "Fetching financial data");

        self.financial_json(company_name, industry)
            .await
            .unwrap_or_else(|e| {
                warn!(company = %company_name, error = %e, "Financial search failed");
                error_text("searching financial data", &e)
            })
    }

    /// Competitor landscape: top results plus related searches.
    pub async fn search_competitors(&self, company_name: &str, industry: &str) -> String {
        info!(company = %company_name, "Fetching competitors");

        self.competitors_json(company_name, industry)
            .await
            .unwrap_or_else(|e| {
                warn!(company = %company_name, error = %e, "Competitor search failed");
                error_text("searching competitors", &e)
            })
    }

    async fn news_json(&self, company_name: &str, industry: &str) -> Result<String, ToolError> {
        let company = require_company(company_name)?;
        let query = format!("\"{}\" ({}) company news", company, industry.trim());
        let data = self.query("google_news", &query, 8).await?;
        to_json(&news_items(&data))
    }

    async fn financial_json(&self, company_name: &str, industry: &str) -> Result<String, ToolError> {
        let company = require_company(company_name)?;
        let query = format!(
            "\"{} ({})\" financial data revenue earnings stock price",
            company,
            industry.trim()
        );
        let data = self.query("google", &query, 5).await?;
        to_json(&financial_info(&data))
    }

    async fn competitors_json(&self, company_name: &str, industry: &str) -> Result<String, ToolError> {
        let company = require_company(company_name)?;
        let query = format!(
            "\"{} ({})\" competitors alternatives similar companies industry",
            company,
            industry.trim()
        );
        let data = self.query("google", &query, 5).await?;
        to_json(&competitor_info(&data))
    }

    /// One GET against SerpApi.
    async fn query(&self, engine: &str, query: &str, num: u32) -> Result<Value, ToolError> {
        debug!(engine = %engine, query = %query, "SerpApi request");

        let num = num.to_string();
        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("engine", engine),
                ("q", query),
                ("api_key", self.api_key.as_str()),
                ("num", num.as_str()),
                ("hl", "en"),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let parsed = serde_json::from_str::<Value>(&body);

        // SerpApi explains failures in an `error` field, even on 4xx
        if let Ok(data) = &parsed {
            if let Some(message) = data.get("error").and_then(Value::as_str) {
                return Err(ToolError::Provider(message.to_string()));
            }
        }

        if !status.is_success() {
            return Err(ToolError::Status(status));
        }

        parsed.map_err(|e| ToolError::Parse(e.to_string()))
    }
}

fn require_company(company_name: &str) -> Result<&str, ToolError> {
    let trimmed = company_name.trim();
    if trimmed.is_empty() {
        return Err(ToolError::InvalidInput("company name is empty".to_string()));
    }
    Ok(trimmed)
}

fn to_json<T: Serialize>(value: &T) -> Result<String, ToolError> {
    serde_json::to_string_pretty(value).map_err(|e| ToolError::Parse(e.to_string()))
}

// =============================================================================
// RIG TOOL TRAIT IMPLEMENTATIONS
// =============================================================================
/// Agent-facing news search.
#[derive(Debug, Clone)]
pub struct NewsSearchTool {
    serp: SerpApiClient,
}

impl NewsSearchTool {
    pub fn new(serp: SerpApiClient) -> Self {
        Self { serp }
    }
}

impl Tool for NewsSearchTool {
    const NAME: &'static str = "search_company_news";

    type Args = CompanyQueryArgs;
    type Output = String;
    type Error = ToolError;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Search for recent news articles about the company. Returns a JSON array of articles with title, link, source, date and snippet.".to_string(),
            parameters: company_query_schema(),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        Ok(self.serp.search_news(&args.company_name, &args.industry).await)
    }
}

/// Agent-facing financial data search.
#[derive(Debug, Clone)]
pub struct FinancialSearchTool {
    serp: SerpApiClient,
}

impl FinancialSearchTool {
    pub fn new(serp: SerpApiClient) -> Self {
        Self { serp }
    }
}

impl Tool for FinancialSearchTool {
    const NAME: &'static str = "search_financial_data";

    type Args = CompanyQueryArgs;
    type Output = String;
    type Error = ToolError;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Search for financial information about the company (revenue, earnings, funding, stock price). Returns JSON with search results, knowledge graph and answer box.".to_string(),
            parameters: company_query_schema(),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        Ok(self
            .serp
            .search_financial_data(&args.company_name, &args.industry)
            .await)
    }
}

/// Agent-facing competitor search.
#[derive(Debug, Clone)]
pub struct CompetitorSearchTool {
    serp: SerpApiClient,
}

impl CompetitorSearchTool {
    pub fn new(serp: SerpApiClient) -> Self {
        Self { serp }
    }
}

impl Tool for CompetitorSearchTool {
    const NAME: &'static str = "search_competitors";

    type Args = CompanyQueryArgs;
    type Output = String;
    type Error = ToolError;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Search for competitor information about the company. Returns JSON with search results and related searches.".to_string(),
            parameters: company_query_schema(),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        Ok(self
            .serp
            .search_competitors(&args.company_name, &args.industry)
            .await)
    }
}
