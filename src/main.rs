//! # Company Research Agent
//!
//! Researches companies for a sales team: a tool-calling LLM agent scrapes
//! each company's website and searches news, financials and competitors,
//! a reviewer grades the report (asking for at most one rewrite), and the
//! accepted report is saved as markdown.
//!
//! ## Quick Start
//! ```bash
//! cargo run -- --input companies.csv --count 3
//! cargo run -- --website https://acme.example.com --industry software
//! ```

mod agent;
mod companies;
mod config;
mod driver;
mod error;
mod prompts;
mod tools;
mod workflow;

use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::agent::{Llm, LlmReviewer, ResearchTools, ToolAgent};
use crate::companies::{load_companies, CompanyRow};
use crate::config::Config;
use crate::driver::CompanyResearcher;
use crate::tools::{
    CompetitorSearchTool, FinancialSearchTool, NewsSearchTool, ReportWriter, ScrapeWebsiteTool,
    SerpApiClient,
};
use crate::workflow::ResearchWorkflow;

// =============================================================================
// CLI ARGUMENTS
// =============================================================================
#[derive(Parser, Debug)]
#[command(
    name = "company-research-agent",
    version,
    about = "Researches companies with an LLM agent and writes sales-ready reports",
    long_about = r#"
Company Research Agent

For each company it will:
  1. Scrape the company website
  2. Search recent news, financial data and competitors
  3. Write an executive fact sheet and a detailed report
  4. Have a reviewer grade the report, rewriting it once if needed
  5. Save the report as markdown

REQUIRED ENVIRONMENT:
  OPENAI_API_KEY   OpenAI credentials
  SERP_API_KEY     SerpApi credentials

EXAMPLES:
  # First row of companies.csv
  company-research-agent

  # Every row of a custom list
  company-research-agent --input leads.csv --all

  # One company, no CSV
  company-research-agent --website https://acme.example.com --industry software
"#
)]
struct Args {
    /// CSV file with `website,industry` rows
    #[arg(short = 'i', long = "input", value_name = "FILE")]
    input: Option<PathBuf>,

    /// Number of rows to research
    #[arg(short = 'n', long = "count", conflicts_with = "all")]
    count: Option<usize>,

    /// Research every row in the CSV
    #[arg(long = "all", default_value = "false")]
    all: bool,

    /// Chat model to use (overrides MODEL_NAME)
    #[arg(short = 'm', long = "model")]
    model: Option<String>,

    /// Directory for the markdown reports
    #[arg(short = 'o', long = "output-dir", value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Research a single website instead of reading the CSV
    #[arg(long = "website", requires = "industry")]
    website: Option<String>,

    /// Industry of the single company
    #[arg(long = "industry", requires = "website")]
    industry: Option<String>,

    /// Name of the single company (derived from the website if omitted)
    #[arg(long = "name", requires = "website")]
    name: Option<String>,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long = "verbose", default_value = "false")]
    verbose: bool,
}

impl Args {
    fn apply_to(&self, config: &mut Config) {
        if let Some(input) = &self.input {
            config.input_path = input.clone();
        }
        if let Some(count) = self.count {
            config.company_count = count;
        }
        if let Some(model) = &self.model {
            info!(model = %model, "Using model from command line");
            config.model = model.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.report_dir = dir.clone();
        }
    }

    /// Companies to research: the single `--website` or rows from the CSV.
    fn companies(&self, config: &Config) -> Result<Vec<CompanyRow>> {
        if let (Some(website), Some(industry)) = (&self.website, &self.industry) {
            return Ok(vec![CompanyRow::new(
                website,
                industry,
                self.name.as_deref(),
            )?]);
        }

        let limit = if self.all {
            None
        } else {
            if config.company_count == 0 {
                bail!("COMPANY_COUNT must be at least 1 (or pass --all)");
            }
            Some(config.company_count)
        };
        load_companies(&config.input_path, limit)
    }
}

// =============================================================================
// MAIN FUNCTION
// =============================================================================
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose)?;

    info!("Company Research Agent starting up...");

    let mut config = Config::from_env()?;
    args.apply_to(&mut config);
    config.validate()?;

    info!(
        model = %config.model,
        input = %config.input_path.display(),
        reports = %config.report_dir.display(),
        "Configuration loaded"
    );

    let companies = args.companies(&config)?;
    if companies.is_empty() {
        bail!("No companies to research in {}", config.input_path.display());
    }
    info!(count = companies.len(), "Companies queued");

    let researcher = build_researcher(&config)?;
    let results = researcher.run_all(&companies).await;

    let failed = results.iter().filter(|r| r.outcome.is_err()).count();
    if failed > 0 {
        error!(failed, total = results.len(), "Some companies could not be researched");
    }

    Ok(())
}

type Researcher = CompanyResearcher<ToolAgent, LlmReviewer, ReportWriter>;

/// Wire tools, LLM adapters and report storage into one researcher.
fn build_researcher(config: &Config) -> Result<Researcher> {
    let serp = SerpApiClient::new(
        &config.serp_api_key,
        &config.serp_api_base_url,
        config.http_timeout,
    )?;

    let tools = ResearchTools {
        scrape: ScrapeWebsiteTool::new(config.http_timeout, config.scrape_max_chars)?,
        news: NewsSearchTool::new(serp.clone()),
        financial: FinancialSearchTool::new(serp.clone()),
        competitors: CompetitorSearchTool::new(serp),
    };

    let llm = Llm::from_config(config);
    let agent = ToolAgent::new(
        llm.clone(),
        tools,
        config.agent_max_turns,
        config.agent_timeout,
    );
    let reviewer = LlmReviewer::new(llm, config.llm_max_retries, config.agent_timeout);
    let store = ReportWriter::new(&config.report_dir);

    Ok(CompanyResearcher::new(ResearchWorkflow::new(
        agent, reviewer, store,
    )))
}

// =============================================================================
// LOGGING INITIALIZATION
// =============================================================================
/// Install the global tracing subscriber.
///
/// `RUST_LOG`, when set, takes precedence over `--verbose`.
fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false);

    let result = match std::env::var("RUST_LOG") {
        Ok(filter) if !filter.is_empty() => tracing::subscriber::set_global_default(
            builder.with_env_filter(EnvFilter::new(filter)).finish(),
        ),
        _ => tracing::subscriber::set_global_default(builder.finish()),
    };

    result.map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["test"]).unwrap();
        assert!(!args.all);
        assert!(!args.verbose);
        assert!(args.website.is_none());
    }

    #[test]
    fn test_args_with_flags() {
        let args = Args::parse_from([
            "test",
            "--input",
            "leads.csv",
            "--count",
            "3",
            "--model",
            "gpt-4o",
            "--output-dir",
            "reports",
            "--verbose",
        ]);

        let mut config = Config::default();
        args.apply_to(&mut config);

        assert_eq!(config.input_path, PathBuf::from("leads.csv"));
        assert_eq!(config.company_count, 3);
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.report_dir, PathBuf::from("reports"));
        assert!(args.verbose);
    }

    #[test]
    fn test_single_company_mode() {
        let args = Args::parse_from([
            "test",
            "--website",
            "https://www.acme.example.com",
            "--industry",
            "software",
        ]);

        let companies = args.companies(&Config::default()).unwrap();
        assert_eq!(companies.len(), 1);
        assert_eq!(companies[0].name, "ACME");
        assert_eq!(companies[0].industry, "software");
    }

    #[test]
    fn test_zero_count_only_matters_for_capped_csv() {
        let config = Config {
            company_count: 0,
            input_path: PathBuf::from("/definitely/not/here.csv"),
            ..Config::default()
        };

        let single = Args::parse_from([
            "test",
            "--website",
            "https://acme.example.com",
            "--industry",
            "software",
        ]);
        assert_eq!(single.companies(&config).unwrap().len(), 1);

        let capped = Args::parse_from(["test"]);
        let err = capped.companies(&config).unwrap_err();
        assert!(err.to_string().contains("COMPANY_COUNT must be at least 1"));

        // --all skips the count check and goes straight to the CSV
        let all = Args::parse_from(["test", "--all"]);
        let err = all.companies(&config).unwrap_err();
        assert!(err.to_string().contains("Failed to open company list"));
    }

    #[test]
    fn test_website_requires_industry() {
        assert!(Args::try_parse_from(["test", "--website", "https://acme.example.com"]).is_err());
    }

    #[test]
    fn test_all_conflicts_with_count() {
        assert!(Args::try_parse_from(["test", "--all", "--count", "2"]).is_err());
    }
}
