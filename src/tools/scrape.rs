//! Website scraping tool.
//!
//! Fetches a company homepage and boils it down to title, meta description
//! and the first few thousand characters of visible text.

use rig::completion::ToolDefinition;
use rig::tool::Tool;
use scraper::{Html, Node, Selector};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::error_text;
use crate::error::ToolError;

/// A desktop browser identity; many corporate sites block obvious bots.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Elements whose text is boilerplate rather than content.
const STRIPPED_ELEMENTS: [&str; 5] = ["script", "style", "nav", "footer", "header"];

/// Tool that scrapes a company's website.
#[derive(Debug, Clone)]
pub struct ScrapeWebsiteTool {
    client: reqwest::Client,
    max_chars: usize,
}

impl ScrapeWebsiteTool {
    /// Create a scraper with a per-request timeout and a text size cap.
    pub fn new(timeout: Duration, max_chars: usize) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(BROWSER_USER_AGENT)
            .build()?;

        Ok(Self { client, max_chars })
    }

    /// Scrape `url` and return a labelled summary, or an error string.
    pub async fn scrape_website(&self, url: &str) -> String {
        info!(url = %url, "Scraping company website");

        match self.fetch_page(url).await {
            Ok(page) => page.render(self.max_chars),
            Err(e) => {
                warn!(url = %url, error = %e, "Scrape failed");
                error_text("scraping website", &e)
            }
        }
    }

    async fn fetch_page(&self, raw_url: &str) -> Result<PageSummary, ToolError> {
        let url = validate_url(raw_url)?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::Status(status));
        }

        let body = response.text().await?;
        debug!(bytes = body.len(), "Fetched page body");

        Ok(PageSummary::from_html(&body))
    }
}

/// Only absolute http(s) URLs are worth a request.
fn validate_url(raw_url: &str) -> Result<Url, ToolError> {
    let trimmed = raw_url.trim();
    if trimmed.is_empty() {
        return Err(ToolError::InvalidInput("URL is empty".to_string()));
    }

    let url = Url::parse(trimmed)
        .map_err(|e| ToolError::InvalidInput(format!("invalid URL '{}': {}", trimmed, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ToolError::InvalidInput(format!(
            "unsupported URL scheme '{}'",
            other
        ))),
    }
}

/// The parts of a page the agent cares about.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageSummary {
    pub title: String,
    pub description: String,
    pub text: String,
}

impl PageSummary {
    /// Extract title, meta description and visible text from raw HTML.
    pub fn from_html(html: &str) -> Self {
        let document = Html::parse_document(html);

        let title = Selector::parse("title")
            .ok()
            .and_then(|sel| {
                document
                    .select(&sel)
                    .next()
                    .map(|el| el.text().collect::<String>())
            })
            .map(|t| collapse_whitespace(&t))
            .unwrap_or_default();

        let description = Selector::parse(r#"meta[name="description"]"#)
            .ok()
            .and_then(|sel| {
                document
                    .select(&sel)
                    .next()
                    .and_then(|el| el.value().attr("content").map(str::to_string))
            })
            .unwrap_or_default();

        let mut fragments = Vec::new();
        for node in document.root_element().descendants() {
            if let Node::Text(text) = node.value() {
                let inside_boilerplate = node.ancestors().any(|ancestor| {
                    ancestor
                        .value()
                        .as_element()
                        .is_some_and(|el| STRIPPED_ELEMENTS.contains(&el.name()))
                });
                if !inside_boilerplate {
                    fragments.push(&**text);
                }
            }
        }

        Self {
            title,
            description,
            text: collapse_whitespace(&fragments.join(" ")),
        }
    }

    /// Labelled text for the agent, with the body capped at `max_chars`.
    pub fn render(&self, max_chars: usize) -> String {
        let content = if self.text.chars().count() > max_chars {
            let head: String = self.text.chars().take(max_chars).collect();
            format!("{}...", head)
        } else {
            self.text.clone()
        };

        format!(
            "Title: {}\nMeta Description: {}\nContent: {}",
            self.title, self.description, content
        )
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// =============================================================================
// RIG TOOL TRAIT IMPLEMENTATION
// =============================================================================
/// Input arguments for the scrape tool.
#[derive(Debug, Deserialize, Serialize)]
pub struct ScrapeArgs {
    /// The company website URL to scrape
    pub url: String,
}

impl Tool for ScrapeWebsiteTool {
    const NAME: &'static str = "scrape_company_website";

    type Args = ScrapeArgs;
    type Output = String;
    type Error = ToolError;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Scrape the company's main website for basic information. Returns the page title, meta description and main text content.".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "The company website URL to scrape"
                    }
                },
                "required": ["url"]
            }),
        }
    }

    /// Never fails: problems come back as an `"Error ..."` string.
    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        Ok(self.scrape_website(&args.url).await)
    }
}
