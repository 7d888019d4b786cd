//! # Error Types
//!
//! Three layers, three enums:
//! - [`ToolError`]: failures inside the tool layer. These never leave a tool;
//!   they are rendered into an `"Error ..."` string the agent can read.
//! - [`AgentError`]: failures talking to the LLM (agent loop or reviewer).
//! - [`ResearchError`]: failures that abort a single company run.

use std::time::Duration;
use thiserror::Error;

/// Failure inside a tool call.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("Search provider returned an error: {0}")]
    Provider(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure while driving the LLM.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Agent execution failed: {0}")]
    Prompt(String),

    /// The provider refused the request outright (bad key, malformed request)
    #[error("Agent request rejected: {0}")]
    Rejected(String),

    #[error("Agent timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Agent ran out of turns after {0}")]
    TurnBudget(usize),

    #[error("Could not extract structured output: {0}")]
    Extraction(String),
}

/// Provider messages that mean retrying cannot help.
const PERMANENT_FAILURE_MARKERS: [&str; 7] = [
    "401",
    "403",
    "unauthorized",
    "forbidden",
    "bad request",
    "invalid_api_key",
    "invalid_request_error",
];

impl AgentError {
    /// Classify a failed LLM call by its provider message.
    pub fn from_prompt_failure(message: impl Into<String>) -> Self {
        let message = message.into();
        let lowered = message.to_lowercase();
        if PERMANENT_FAILURE_MARKERS
            .iter()
            .any(|marker| lowered.contains(marker))
        {
            AgentError::Rejected(message)
        } else {
            AgentError::Prompt(message)
        }
    }

    /// Transport-level failures are worth another attempt; a rejected
    /// request, a response we could not parse or a blown budget is not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AgentError::Prompt(_))
    }
}

/// Failure that ends one company's research run.
#[derive(Error, Debug)]
pub enum ResearchError {
    #[error("Researcher step failed: {0}")]
    Researcher(#[source] AgentError),

    #[error("Reviewer step failed: {0}")]
    Reviewer(#[source] AgentError),
}
