//! # Orchestration Driver
//!
//! Feeds companies through the research workflow one at a time and keeps a
//! tally of how each run ended.

use tracing::{error, info, warn};

use crate::companies::CompanyRow;
use crate::workflow::{
    ReportAgent, ReportReviewer, ReportStore, ResearchState, ResearchWorkflow, RunOutcome,
};

/// Width of the `=` banner printed before each company.
const BANNER_WIDTH: usize = 50;

/// How one company's research ended.
#[derive(Debug)]
pub struct CompanyResult {
    pub company: String,
    pub outcome: Result<RunOutcome, String>,
}

impl CompanyResult {
    /// True when a report was written to disk.
    pub fn saved(&self) -> bool {
        match &self.outcome {
            Ok(run) => run
                .save_status
                .as_deref()
                .is_some_and(|status| !status.starts_with("Error")),
            Err(_) => false,
        }
    }
}

/// Runs the workflow for each company in turn.
pub struct CompanyResearcher<A, V, S> {
    workflow: ResearchWorkflow<A, V, S>,
}

impl<A, V, S> CompanyResearcher<A, V, S>
where
    A: ReportAgent,
    V: ReportReviewer,
    S: ReportStore,
{
    pub fn new(workflow: ResearchWorkflow<A, V, S>) -> Self {
        Self { workflow }
    }

    /// Research one company. Failures are captured, never propagated.
    pub async fn research_company(&self, company: &CompanyRow) -> CompanyResult {
        println!("Starting research for {} ({})", company.name, company.website);
        println!("{}", "=".repeat(BANNER_WIDTH));

        let state = ResearchState::new(&company.name, &company.website, &company.industry);

        let outcome = match self.workflow.run(state).await {
            Ok(run) => {
                for fault in run.state.errors() {
                    warn!(company = %company.name, error = %fault, "Run recorded an error");
                }
                println!("\nResearch completed!");
                Ok(run)
            }
            Err(e) => {
                error!(company = %company.name, error = %e, "Research failed");
                Err(e.to_string())
            }
        };

        CompanyResult {
            company: company.name.clone(),
            outcome,
        }
    }

    /// Research every company sequentially.
    pub async fn run_all(&self, companies: &[CompanyRow]) -> Vec<CompanyResult> {
        let mut results = Vec::with_capacity(companies.len());
        for company in companies {
            results.push(self.research_company(company).await);
        }
        log_summary(&results);
        results
    }
}

fn log_summary(results: &[CompanyResult]) {
    let saved = results.iter().filter(|r| r.saved()).count();
    info!(total = results.len(), saved, "Research batch finished");

    for result in results {
        match &result.outcome {
            Ok(run) => {
                let score = run.state.llm_evaluation.as_ref().map(|e| e.score);
                info!(
                    company = %result.company,
                    score = ?score,
                    rewritten = run.state.rewritten(),
                    errors = ?run.state.errors(),
                    status = run.save_status.as_deref().unwrap_or("not saved"),
                    "Company summary"
                );
            }
            Err(message) => {
                error!(company = %result.company, error = %message, "Company summary");
            }
        }
    }
}
