//! # Configuration Module
//!
//! Loads settings from the environment (and a `.env` file when present).
//! Command-line flags in `main.rs` override individual fields afterwards.

use anyhow::{Context, Result};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

// =============================================================================
// CONFIGURATION STRUCT
// =============================================================================
/// Main configuration for the company research agent.
#[derive(Clone)]
pub struct Config {
    /// OpenAI API key (`OPENAI_API_KEY`)
    pub openai_api_key: String,

    /// SerpApi key used by every search tool (`SERP_API_KEY`)
    pub serp_api_key: String,

    /// SerpApi endpoint; overridable so tests can point at a mock server
    pub serp_api_base_url: String,

    /// Chat model name (`MODEL_NAME`)
    pub model: String,

    /// Sampling temperature for both the agent and the reviewer
    pub temperature: f64,

    /// Timeout applied to every tool HTTP request
    pub http_timeout: Duration,

    /// Characters of page text kept by the scraper
    pub scrape_max_chars: usize,

    /// Turn budget for the agent's tool-calling loop
    pub agent_max_turns: usize,

    /// Wall-clock budget for one researcher pass
    pub agent_timeout: Duration,

    /// Extra attempts for a failed reviewer call
    pub llm_max_retries: u32,

    /// CSV file with `website,industry` rows
    pub input_path: PathBuf,

    /// Number of CSV rows to research (`COMPANY_COUNT`)
    pub company_count: usize,

    /// Directory that receives the markdown reports
    pub report_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            serp_api_key: String::new(),
            serp_api_base_url: "https://serpapi.com/search".to_string(),
            model: "gpt-4o-mini".to_string(),
            // Low temperature: we want facts, not prose flourishes
            temperature: 0.3,
            http_timeout: Duration::from_secs(15),
            scrape_max_chars: 3000,
            agent_max_turns: 10,
            agent_timeout: Duration::from_secs(300),
            llm_max_retries: 2,
            input_path: PathBuf::from("companies.csv"),
            company_count: 1,
            report_dir: PathBuf::from("."),
        }
    }
}

// Keys stay out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("serp_api_key", &redact(&self.serp_api_key))
            .field("serp_api_base_url", &self.serp_api_base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("http_timeout", &self.http_timeout)
            .field("scrape_max_chars", &self.scrape_max_chars)
            .field("agent_max_turns", &self.agent_max_turns)
            .field("agent_timeout", &self.agent_timeout)
            .field("llm_max_retries", &self.llm_max_retries)
            .field("input_path", &self.input_path)
            .field("company_count", &self.company_count)
            .field("report_dir", &self.report_dir)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

// =============================================================================
// CONFIGURATION LOADING
// =============================================================================
impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is loaded first if it exists.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from any key/value source.
    ///
    /// Unset keys keep their defaults; set keys that fail to parse are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(val) = lookup("OPENAI_API_KEY") {
            config.openai_api_key = val;
        }

        if let Some(val) = lookup("SERP_API_KEY") {
            config.serp_api_key = val;
        }

        if let Some(val) = lookup("SERP_API_BASE_URL") {
            config.serp_api_base_url = val;
        }

        if let Some(val) = lookup("MODEL_NAME") {
            config.model = val;
        }

        if let Some(val) = lookup("TEMPERATURE") {
            config.temperature = val
                .parse()
                .context("TEMPERATURE must be a valid floating-point number (e.g., 0.3)")?;
        }

        if let Some(val) = lookup("HTTP_TIMEOUT_SECS") {
            let secs: u64 = val
                .parse()
                .context("HTTP_TIMEOUT_SECS must be a whole number of seconds")?;
            config.http_timeout = Duration::from_secs(secs);
        }

        if let Some(val) = lookup("SCRAPE_MAX_CHARS") {
            config.scrape_max_chars = val
                .parse()
                .context("SCRAPE_MAX_CHARS must be a valid positive integer")?;
        }

        if let Some(val) = lookup("AGENT_MAX_TURNS") {
            config.agent_max_turns = val
                .parse()
                .context("AGENT_MAX_TURNS must be a valid positive integer")?;
        }

        if let Some(val) = lookup("AGENT_TIMEOUT_SECS") {
            let secs: u64 = val
                .parse()
                .context("AGENT_TIMEOUT_SECS must be a whole number of seconds")?;
            config.agent_timeout = Duration::from_secs(secs);
        }

        if let Some(val) = lookup("LLM_MAX_RETRIES") {
            config.llm_max_retries = val
                .parse()
                .context("LLM_MAX_RETRIES must be a non-negative integer")?;
        }

        if let Some(val) = lookup("COMPANIES_CSV") {
            config.input_path = PathBuf::from(val);
        }

        if let Some(val) = lookup("COMPANY_COUNT") {
            config.company_count = val
                .parse()
                .context("COMPANY_COUNT must be a valid positive integer")?;
        }

        if let Some(val) = lookup("REPORT_DIR") {
            config.report_dir = PathBuf::from(val);
        }

        Ok(config)
    }

    /// Validate the configuration before any network call is made.
    pub fn validate(&self) -> Result<()> {
        if self.openai_api_key.trim().is_empty() {
            anyhow::bail!("OPENAI_API_KEY must be set");
        }

        if self.serp_api_key.trim().is_empty() {
            anyhow::bail!("SERP_API_KEY must be set");
        }

        if self.model.trim().is_empty() {
            anyhow::bail!("MODEL_NAME cannot be empty");
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            anyhow::bail!(
                "Temperature must be between 0.0 and 2.0, got: {}",
                self.temperature
            );
        }

        if self.http_timeout.is_zero() || self.agent_timeout.is_zero() {
            anyhow::bail!("Timeouts must be at least one second");
        }

        if self.scrape_max_chars == 0 {
            anyhow::bail!("SCRAPE_MAX_CHARS must be at least 1");
        }

        if self.agent_max_turns == 0 {
            anyhow::bail!("AGENT_MAX_TURNS must be at least 1");
        }

        Ok(())
    }
}
