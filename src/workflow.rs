//! # Research Workflow
//!
//! A three-node state machine:
//!
//! ```text
//!   START ──▶ researcher ──▶ reviewer ──▶ to_rewrite ──┬──▶ END (save report)
//!                 ▲                                    │
//!                 └───────── rewrite (once) ───────────┘
//! ```
//!
//! The researcher asks the tool-using agent for a report, the reviewer grades
//! it, and [`to_rewrite`] decides whether to send it back. A rewrite happens
//! at most once per run, so the researcher and the reviewer each run at most
//! twice.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::{AgentError, ResearchError};
use crate::prompts;

// =============================================================================
// SEAMS
// =============================================================================
/// Produces a report from a task prompt, calling tools as it sees fit.
#[async_trait]
pub trait ReportAgent: Send + Sync {
    async fn run(&self, task: &str) -> Result<String, AgentError>;
}

/// Grades a report into a structured [`Evaluation`].
#[async_trait]
pub trait ReportReviewer: Send + Sync {
    async fn review(&self, prompt: &str) -> Result<Evaluation, AgentError>;
}

/// Persists an accepted report and returns a status line.
pub trait ReportStore: Send + Sync {
    fn save_report(&self, report_content: &str, company_name: &str) -> String;
}

// =============================================================================
// STATE
// =============================================================================
/// The reviewer's verdict on a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Overall quality, 0-100
    pub score: i64,
    /// Whether the reviewer wants another research pass
    pub rewrite: bool,
    /// Rationale behind the score
    pub evaluation: String,
}

impl Evaluation {
    /// Checks the verdict is usable for routing.
    pub fn validate(&self) -> Result<(), String> {
        if !(0..=100).contains(&self.score) {
            return Err(format!(
                "llm_evaluation score {} is outside 0-100",
                self.score
            ));
        }
        Ok(())
    }
}

/// State threaded through one company's run.
///
/// The company fields are fixed at construction. `rewritten` only ever goes
/// from false to true, and `errors` only grows.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResearchState {
    company_name: String,
    company_website: String,
    industry: String,

    /// Latest report from the researcher
    pub final_report: String,

    /// Latest verdict from the reviewer; `None` before the first review or
    /// when the reviewer's answer could not be parsed
    pub llm_evaluation: Option<Evaluation>,

    rewritten: bool,
    errors: Vec<String>,
}

impl ResearchState {
    pub fn new(
        company_name: impl Into<String>,
        company_website: impl Into<String>,
        industry: impl Into<String>,
    ) -> Self {
        Self {
            company_name: company_name.into(),
            company_website: company_website.into(),
            industry: industry.into(),
            ..Default::default()
        }
    }

    pub fn company_name(&self) -> &str {
        &self.company_name
    }

    pub fn company_website(&self) -> &str {
        &self.company_website
    }

    pub fn industry(&self) -> &str {
        &self.industry
    }

    pub fn rewritten(&self) -> bool {
        self.rewritten
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Flip the rewrite latch. Returns false if it was already set.
    fn latch_rewrite(&mut self) -> bool {
        !std::mem::replace(&mut self.rewritten, true)
    }
}

// =============================================================================
// TRANSITIONS
// =============================================================================
/// Nodes of the research graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Node {
    Researcher,
    Reviewer,
    End,
}

/// Outcome of the post-review decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Send the report back for its one rewrite
    Rewrite,
    /// Keep the report: persist it and stop
    Accept,
    /// The evaluation is unusable: record why and stop without saving
    Fault(String),
}

/// Decide what happens after the reviewer has run.
pub fn to_rewrite(state: &ResearchState) -> Route {
    let evaluation = match &state.llm_evaluation {
        Some(evaluation) => evaluation,
        None => return Route::Fault("llm_evaluation is missing".to_string()),
    };

    if let Err(reason) = evaluation.validate() {
        return Route::Fault(reason);
    }

    if evaluation.rewrite && !state.rewritten {
        Route::Rewrite
    } else {
        Route::Accept
    }
}

/// Apply a route to the state and pick the next node.
///
/// Pure: persistence for [`Route::Accept`] is the runner's job.
pub fn apply_route(mut state: ResearchState, route: &Route) -> (Node, ResearchState) {
    match route {
        Route::Rewrite => {
            if state.latch_rewrite() {
                (Node::Researcher, state)
            } else {
                // to_rewrite never asks twice; refuse anyway
                (Node::End, state)
            }
        }
        Route::Accept => (Node::End, state),
        Route::Fault(reason) => {
            state.record_error(reason.clone());
            (Node::End, state)
        }
    }
}

// =============================================================================
// RUNNER
// =============================================================================
/// Everything a finished run leaves behind.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Final state, including accumulated errors
    pub state: ResearchState,
    /// Nodes visited, in order
    pub path: Vec<Node>,
    /// Status line from the report store, if the report was accepted
    pub save_status: Option<String>,
}

impl RunOutcome {
    pub fn visits(&self, node: Node) -> usize {
        self.path.iter().filter(|n| **n == node).count()
    }
}

/// The researcher → reviewer → decide loop.
pub struct ResearchWorkflow<A, V, S> {
    agent: A,
    reviewer: V,
    store: S,
}

impl<A, V, S> ResearchWorkflow<A, V, S>
where
    A: ReportAgent,
    V: ReportReviewer,
    S: ReportStore,
{
    pub fn new(agent: A, reviewer: V, store: S) -> Self {
        Self {
            agent,
            reviewer,
            store,
        }
    }

    /// Run the graph from START to END for one company.
    pub async fn run(&self, initial: ResearchState) -> Result<RunOutcome, ResearchError> {
        let mut state = initial;
        let mut node = Node::Researcher;
        let mut path = Vec::new();
        let mut save_status = None;

        while node != Node::End {
            path.push(node);

            node = match node {
                Node::Researcher => {
                    if self.run_researcher(&mut state).await? {
                        Node::Reviewer
                    } else {
                        Node::End
                    }
                }
                Node::Reviewer => {
                    self.run_reviewer(&mut state).await?;

                    let route = to_rewrite(&state);
                    info!(company = %state.company_name, route = ?route, "Review routed");

                    let (next, updated) = apply_route(state, &route);
                    state = updated;

                    if route == Route::Accept {
                        let status = self
                            .store
                            .save_report(&state.final_report, &state.company_name);
                        if status.starts_with("Error") {
                            warn!(company = %state.company_name, status = %status, "Report not saved");
                        }
                        save_status = Some(status);
                    }
                    next
                }
                Node::End => Node::End,
            };
        }

        Ok(RunOutcome {
            state,
            path,
            save_status,
        })
    }

    /// Returns false when the agent ran out of time or turns, in which case
    /// the run ends without a review or a saved report.
    async fn run_researcher(&self, state: &mut ResearchState) -> Result<bool, ResearchError> {
        info!(
            company = %state.company_name,
            rewrite = state.rewritten,
            "Researcher: generating report"
        );

        let task = prompts::research_task(
            &state.company_name,
            &state.company_website,
            &state.industry,
            state.llm_evaluation.as_ref(),
        );

        match self.agent.run(&task).await {
            Ok(report) => {
                state.final_report = report;
                Ok(true)
            }
            Err(AgentError::Timeout(limit)) => {
                error!(company = %state.company_name, "Researcher timed out");
                state.record_error(format!("researcher timed out after {}s", limit.as_secs()));
                Ok(false)
            }
            Err(AgentError::TurnBudget(turns)) => {
                error!(company = %state.company_name, turns, "Researcher ran out of turns");
                state.record_error(format!("researcher ran out of turns after {}", turns));
                Ok(false)
            }
            Err(e) => Err(ResearchError::Researcher(e)),
        }
    }

    async fn run_reviewer(&self, state: &mut ResearchState) -> Result<(), ResearchError> {
        info!(company = %state.company_name, "Reviewer: grading report");

        let prompt = prompts::review_task(&state.final_report);

        match self.reviewer.review(&prompt).await {
            Ok(evaluation) => {
                info!(
                    company = %state.company_name,
                    score = evaluation.score,
                    rewrite = evaluation.rewrite,
                    "Report graded"
                );
                state.llm_evaluation = Some(evaluation);
                Ok(())
            }
            Err(AgentError::Extraction(reason)) => {
                // Drop the old verdict: it describes the previous report
                warn!(company = %state.company_name, reason = %reason, "Unreadable evaluation");
                state.llm_evaluation = None;
                Ok(())
            }
            Err(e) => Err(ResearchError::Reviewer(e)),
        }
    }
}

// =============================================================================
// UNIT TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Agent that numbers its reports and remembers the prompts it saw.
    #[derive(Default)]
    struct ScriptedAgent {
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
        fail_with: Mutex<Option<AgentError>>,
    }

    #[async_trait]
    impl ReportAgent for ScriptedAgent {
        async fn run(&self, task: &str) -> Result<String, AgentError> {
            self.prompts.lock().unwrap().push(task.to_string());
            if let Some(err) = self.fail_with.lock().unwrap().take() {
                return Err(err);
            }
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("Report draft {}", n))
        }
    }

    /// Reviewer that plays back canned verdicts, repeating the last one.
    struct ScriptedReviewer {
        verdicts: Mutex<VecDeque<Result<Evaluation, AgentError>>>,
        seen: Mutex<Vec<String>>,
    }

    impl ScriptedReviewer {
        fn new(verdicts: Vec<Result<Evaluation, AgentError>>) -> Self {
            Self {
                verdicts: Mutex::new(verdicts.into()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ReportReviewer for ScriptedReviewer {
        async fn review(&self, prompt: &str) -> Result<Evaluation, AgentError> {
            self.seen.lock().unwrap().push(prompt.to_string());
            let mut verdicts = self.verdicts.lock().unwrap();
            if verdicts.len() > 1 {
                verdicts.pop_front().unwrap()
            } else {
                match verdicts.front().unwrap() {
                    Ok(eval) => Ok(eval.clone()),
                    Err(AgentError::Extraction(s)) => Err(AgentError::Extraction(s.clone())),
                    Err(e) => Err(AgentError::Prompt(e.to_string())),
                }
            }
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        saved: Mutex<Vec<(String, String)>>,
    }

    impl ReportStore for RecordingStore {
        fn save_report(&self, report_content: &str, company_name: &str) -> String {
            self.saved
                .lock()
                .unwrap()
                .push((report_content.to_string(), company_name.to_string()));
            format!("Report successfully saved to: company_report_{}.md", company_name)
        }
    }

    fn verdict(score: i64, rewrite: bool) -> Result<Evaluation, AgentError> {
        Ok(Evaluation {
            score,
            rewrite,
            evaluation: format!("scored {}", score),
        })
    }

    fn acme() -> ResearchState {
        ResearchState::new("ACME", "https://acme.example.com", "software")
    }

    fn workflow(
        verdicts: Vec<Result<Evaluation, AgentError>>,
    ) -> ResearchWorkflow<ScriptedAgent, ScriptedReviewer, RecordingStore> {
        ResearchWorkflow::new(
            ScriptedAgent::default(),
            ScriptedReviewer::new(verdicts),
            RecordingStore::default(),
        )
    }

    // ==================== Decision function ====================

    #[test]
    fn test_to_rewrite_routes() {
        let mut state = acme();
        assert!(matches!(to_rewrite(&state), Route::Fault(_)));

        state.llm_evaluation = verdict(30, true).ok();
        assert_eq!(to_rewrite(&state), Route::Rewrite);

        state.llm_evaluation = verdict(90, false).ok();
        assert_eq!(to_rewrite(&state), Route::Accept);
    }

    #[test]
    fn test_latch_blocks_second_rewrite() {
        let mut state = acme();
        state.llm_evaluation = verdict(30, true).ok();

        let (next, state) = apply_route(state, &Route::Rewrite);
        assert_eq!(next, Node::Researcher);
        assert!(state.rewritten());

        // Same verdict again: must not loop
        assert_eq!(to_rewrite(&state), Route::Accept);

        let (next, state) = apply_route(state, &Route::Rewrite);
        assert_eq!(next, Node::End);
        assert!(state.rewritten());
    }

    #[test]
    fn test_malformed_score_is_a_fault() {
        let mut state = acme();
        state.llm_evaluation = verdict(250, false).ok();

        match to_rewrite(&state) {
            Route::Fault(reason) => assert!(reason.contains("250")),
            other => panic!("expected fault, got {:?}", other),
        }
    }

    #[test]
    fn test_faults_accumulate() {
        let mut state = acme();
        for i in 0..3 {
            let (next, updated) = apply_route(state, &Route::Fault(format!("fault {}", i)));
            assert_eq!(next, Node::End);
            state = updated;
        }
        assert_eq!(state.errors(), ["fault 0", "fault 1", "fault 2"]);
    }

    // ==================== Full runs ====================

    #[tokio::test]
    async fn test_accept_on_first_review() {
        let wf = workflow(vec![verdict(72, false)]);

        let outcome = wf.run(acme()).await.unwrap();

        assert_eq!(outcome.path, vec![Node::Researcher, Node::Reviewer]);
        assert_eq!(outcome.state.final_report, "Report draft 1");
        assert_eq!(outcome.state.llm_evaluation.as_ref().unwrap().score, 72);
        assert!(!outcome.state.rewritten());
        assert!(outcome.state.errors().is_empty());

        let saved = wf.store.saved.lock().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0], ("Report draft 1".to_string(), "ACME".to_string()));
        assert!(outcome.save_status.unwrap().starts_with("Report successfully saved"));
    }

    #[tokio::test]
    async fn test_single_rewrite_then_accept_even_if_still_bad() {
        let wf = workflow(vec![verdict(35, true), verdict(40, true)]);

        let outcome = wf.run(acme()).await.unwrap();

        assert_eq!(
            outcome.path,
            vec![Node::Researcher, Node::Reviewer, Node::Researcher, Node::Reviewer]
        );
        assert!(outcome.state.rewritten());
        assert_eq!(outcome.state.final_report, "Report draft 2");

        // Evaluation matches the report it graded
        assert_eq!(outcome.state.llm_evaluation.as_ref().unwrap().score, 40);
        let reviewed = wf.reviewer.seen.lock().unwrap();
        assert!(reviewed[1].contains("Report draft 2"));

        let saved = wf.store.saved.lock().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].0, "Report draft 2");
    }

    #[tokio::test]
    async fn test_rewrite_prompt_carries_feedback() {
        let wf = workflow(vec![verdict(35, true), verdict(80, false)]);

        wf.run(acme()).await.unwrap();

        let prompts = wf.agent.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("Evaluation feedback if any: None"));
        assert!(prompts[1].contains("scored 35"));
    }

    #[tokio::test]
    async fn test_bounded_retry_for_any_verdicts() {
        let scripts = vec![
            vec![verdict(10, true)],
            vec![verdict(10, true), verdict(90, false)],
            vec![verdict(90, false)],
            vec![verdict(90, true), verdict(10, true), verdict(10, true)],
        ];

        for verdicts in scripts {
            let wf = workflow(verdicts);
            let outcome = wf.run(acme()).await.unwrap();

            assert!(outcome.visits(Node::Researcher) <= 2);
            assert!(outcome.visits(Node::Reviewer) <= 2);
            assert_eq!(wf.store.saved.lock().unwrap().len(), 1);
        }
    }

    #[tokio::test]
    async fn test_unreadable_evaluation_ends_without_saving() {
        let wf = workflow(vec![Err(AgentError::Extraction("not json".to_string()))]);

        let outcome = wf.run(acme()).await.unwrap();

        assert_eq!(outcome.path, vec![Node::Researcher, Node::Reviewer]);
        assert!(outcome.state.llm_evaluation.is_none());
        assert_eq!(outcome.state.errors().len(), 1);
        assert!(outcome.save_status.is_none());
        assert!(wf.store.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stale_evaluation_cleared_on_rewrite_pass() {
        let wf = workflow(vec![
            verdict(20, true),
            Err(AgentError::Extraction("garbled".to_string())),
        ]);

        let outcome = wf.run(acme()).await.unwrap();

        assert_eq!(outcome.visits(Node::Reviewer), 2);
        assert!(outcome.state.llm_evaluation.is_none());
        assert_eq!(outcome.state.errors(), ["llm_evaluation is missing"]);
        assert!(wf.store.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_agent_timeout_is_recorded_not_raised() {
        let wf = workflow(vec![verdict(90, false)]);
        *wf.agent.fail_with.lock().unwrap() = Some(AgentError::Timeout(Duration::from_secs(300)));

        let outcome = wf.run(acme()).await.unwrap();

        assert_eq!(outcome.path, vec![Node::Researcher]);
        assert_eq!(outcome.state.errors(), ["researcher timed out after 300s"]);
        assert!(wf.reviewer.seen.lock().unwrap().is_empty());
        assert!(wf.store.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_agent_turn_budget_is_recorded_not_raised() {
        let wf = workflow(vec![verdict(90, false)]);
        *wf.agent.fail_with.lock().unwrap() = Some(AgentError::TurnBudget(10));

        let outcome = wf.run(acme()).await.unwrap();

        assert_eq!(outcome.path, vec![Node::Researcher]);
        assert_eq!(outcome.state.errors(), ["researcher ran out of turns after 10"]);
        assert!(outcome.save_status.is_none());
        assert!(wf.reviewer.seen.lock().unwrap().is_empty());
        assert!(wf.store.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_acme_report_lands_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let wf = ResearchWorkflow::new(
            ScriptedAgent::default(),
            ScriptedReviewer::new(vec![verdict(72, false)]),
            crate::tools::ReportWriter::new(dir.path()),
        );

        let outcome = wf.run(acme()).await.unwrap();

        let status = outcome.save_status.unwrap();
        assert!(status.starts_with("Report successfully saved to: "));

        let files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(files.len(), 1);
        assert!(files[0].starts_with("company_report_ACME_"));

        let contents = std::fs::read_to_string(dir.path().join(&files[0])).unwrap();
        assert!(contents.ends_with("Report draft 1"));
    }

    #[tokio::test]
    async fn test_agent_failure_propagates() {
        let wf = workflow(vec![verdict(90, false)]);
        *wf.agent.fail_with.lock().unwrap() = Some(AgentError::Prompt("401".to_string()));

        let result = wf.run(acme()).await;

        assert!(matches!(result, Err(ResearchError::Researcher(_))));
        assert!(wf.store.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reviewer_transport_failure_propagates() {
        let wf = workflow(vec![Err(AgentError::Prompt("connection reset".to_string()))]);

        let result = wf.run(acme()).await;

        assert!(matches!(result, Err(ResearchError::Reviewer(_))));
    }
}
