//! # Agent Module
//!
//! Adapters between the research workflow and the LLM:
//! - [`ToolAgent`] runs the tool-calling loop that writes a report.
//! - [`LlmReviewer`] grades a report and parses the verdict into an
//!   [`Evaluation`].
//!
//! Both are built from one shared [`Llm`] handle so the run uses a single
//! model and temperature throughout.

use async_trait::async_trait;
use rig::client::{CompletionClient, ProviderClient};
use rig::completion::{Prompt, PromptError};
use rig::providers::openai;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::AgentError;
use crate::prompts::{RESEARCHER_PREAMBLE, REVIEWER_PREAMBLE};
use crate::tools::{
    CompetitorSearchTool, FinancialSearchTool, NewsSearchTool, ScrapeWebsiteTool,
};
use crate::workflow::{Evaluation, ReportAgent, ReportReviewer};

/// First backoff step between reviewer attempts; doubles each retry.
const RETRY_BASE_DELAY_MS: u64 = 1000;

// =============================================================================
// SHARED LLM HANDLE
// =============================================================================
/// OpenAI client plus the sampling settings every call uses.
#[derive(Clone)]
pub struct Llm {
    client: openai::Client,
    model: String,
    temperature: f64,
}

impl Llm {
    pub fn new(api_key: &str, model: impl Into<String>, temperature: f64) -> Self {
        Self {
            client: openai::Client::from_val(api_key.to_string().into()),
            model: model.into(),
            temperature,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.openai_api_key, config.model.clone(), config.temperature)
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

// =============================================================================
// RESEARCH AGENT
// =============================================================================
/// The four research tools, bundled for the agent builder.
#[derive(Debug, Clone)]
pub struct ResearchTools {
    pub scrape: ScrapeWebsiteTool,
    pub news: NewsSearchTool,
    pub financial: FinancialSearchTool,
    pub competitors: CompetitorSearchTool,
}

/// Tool-calling agent that turns a research task into a report.
pub struct ToolAgent {
    llm: Llm,
    tools: ResearchTools,
    max_turns: usize,
    timeout: Duration,
}

impl ToolAgent {
    pub fn new(llm: Llm, tools: ResearchTools, max_turns: usize, timeout: Duration) -> Self {
        Self {
            llm,
            tools,
            max_turns,
            timeout,
        }
    }
}

#[async_trait]
impl ReportAgent for ToolAgent {
    async fn run(&self, task: &str) -> Result<String, AgentError> {
        let agent = self
            .llm
            .client
            .agent(&self.llm.model)
            .preamble(RESEARCHER_PREAMBLE)
            .temperature(self.llm.temperature)
            .tool(self.tools.scrape.clone())
            .tool(self.tools.news.clone())
            .tool(self.tools.financial.clone())
            .tool(self.tools.competitors.clone())
            .build();

        debug!(
            model = %self.llm.model(),
            max_turns = self.max_turns,
            "Research agent configured"
        );

        let outcome = tokio::time::timeout(self.timeout, async {
            agent.prompt(task).multi_turn(self.max_turns).await
        })
        .await;

        match outcome {
            Ok(Ok(report)) => {
                info!(chars = report.len(), "Research agent finished");
                Ok(report)
            }
            Ok(Err(PromptError::MaxDepthError { .. })) => {
                Err(AgentError::TurnBudget(self.max_turns))
            }
            Ok(Err(e)) => Err(AgentError::from_prompt_failure(e.to_string())),
            Err(_) => Err(AgentError::Timeout(self.timeout)),
        }
    }
}

// =============================================================================
// REVIEWER
// =============================================================================
/// Tool-less agent that grades reports as JSON.
pub struct LlmReviewer {
    llm: Llm,
    max_retries: u32,
    timeout: Duration,
}

impl LlmReviewer {
    pub fn new(llm: Llm, max_retries: u32, timeout: Duration) -> Self {
        Self {
            llm,
            max_retries,
            timeout,
        }
    }

    async fn ask(&self, prompt: &str) -> Result<String, AgentError> {
        let agent = self
            .llm
            .client
            .agent(&self.llm.model)
            .preamble(REVIEWER_PREAMBLE)
            .temperature(self.llm.temperature)
            .build();

        match tokio::time::timeout(self.timeout, async { agent.prompt(prompt).await }).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(AgentError::from_prompt_failure(e.to_string())),
            Err(_) => Err(AgentError::Timeout(self.timeout)),
        }
    }
}

#[async_trait]
impl ReportReviewer for LlmReviewer {
    async fn review(&self, prompt: &str) -> Result<Evaluation, AgentError> {
        let base_delay = Duration::from_millis(RETRY_BASE_DELAY_MS);
        let text = with_retry(self.max_retries, base_delay, || self.ask(prompt)).await?;
        extract_structured(&text)
    }
}

/// Run `op`, retrying retryable failures with exponential backoff.
///
/// Makes at most `max_retries + 1` attempts.
pub async fn with_retry<T, F, Fut>(
    max_retries: u32,
    base_delay: Duration,
    mut op: F,
) -> Result<T, AgentError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AgentError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_retries => {
                let delay = base_delay * 2u32.pow(attempt);
                attempt += 1;
                warn!(attempt, delay_ms = delay.as_millis() as u64, error = %e, "LLM call failed, will retry");
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

// =============================================================================
// STRUCTURED OUTPUT
// =============================================================================
/// Parse a JSON object out of a model reply.
///
/// Tries each `{` in turn and returns the first object that deserializes as
/// `T`, so code fences, prose and stray braces around it are ignored.
pub fn extract_structured<T: DeserializeOwned>(text: &str) -> Result<T, AgentError> {
    let mut last_error = None;

    for (start, _) in text.match_indices('{') {
        let mut values = serde_json::Deserializer::from_str(&text[start..]).into_iter::<T>();
        match values.next() {
            Some(Ok(value)) => return Ok(value),
            Some(Err(e)) => last_error = Some(e.to_string()),
            None => {}
        }
    }

    Err(AgentError::Extraction(last_error.unwrap_or_else(|| {
        format!("no JSON object in reply: {}", preview(text))
    })))
}

fn preview(text: &str) -> String {
    text.chars().take(80).collect()
}
