//! Routing Graph
//!
//! Drives a run through a coordinator, a fixed set of worker nodes and a
//! terminal sink:
//!
//! ```text
//!                 ┌──────────────┐
//!   request ────▶ │ coordinator  │ ──── answer / no routable key ────▶ sink
//!                 └──────────────┘
//!                   │    ▲
//!      worker key   │    │  unconditional
//!                   ▼    │
//!                 ┌──────────────┐
//!                 │   worker(s)  │
//!                 └──────────────┘
//! ```
//!
//! The coordinator sees the request plus the reasoning log on every turn;
//! workers see only the sub-question the coordinator addressed to them. A
//! run is strictly sequential and every node step makes at most one model
//! call. The step cap bounds the number of model calls per run.

use std::future::Future;
use std::sync::Arc;

use futures::future::{self, Either};

use crate::agent::{StructuredAgent, FALLBACK_ANSWER};
use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::parser::ParsedResult;
use crate::state::{DisplayEntry, NodeId, RunOutcome, RunState, Termination};

/// Coordinator key that ends the run with its payload as the answer
pub const ANSWER_KEY: &str = "answer";

/// Default cap on agent calls per run
pub const DEFAULT_MAX_STEPS: usize = 24;

/// Where the coordinator's result sends the run
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CoordinatorDecision {
    /// Hand `prompt` to the named worker
    AskWorker { worker: String, prompt: String },
    /// Finish with the coordinator's answer
    FinalAnswer(String),
    /// Nothing routable; the rendered result itself becomes the answer
    Degraded(String),
}

/// Pick the next node from a coordinator result.
///
/// Worker keys are checked in the given order and the first present one
/// wins; `answer` is only considered when no worker key is present.
pub fn classify<S: AsRef<str>>(result: &ParsedResult, worker_keys: &[S]) -> CoordinatorDecision {
    for key in worker_keys {
        let key = key.as_ref();
        if let Some(prompt) = result.get(key) {
            return CoordinatorDecision::AskWorker {
                worker: key.to_string(),
                prompt: prompt.to_string(),
            };
        }
    }
    match result.get(ANSWER_KEY) {
        Some(answer) => CoordinatorDecision::FinalAnswer(answer.to_string()),
        None => CoordinatorDecision::Degraded(result.to_string()),
    }
}

struct WorkerNode {
    name: String,
    agent: Arc<StructuredAgent>,
}

/// Compiled coordinator/worker graph, shared read-only across runs
pub struct RoutingGraph {
    coordinator: Arc<StructuredAgent>,
    workers: Vec<WorkerNode>,
    max_steps: usize,
}

impl RoutingGraph {
    pub fn builder() -> GraphBuilder {
        GraphBuilder::default()
    }

    pub fn coordinator(&self) -> &StructuredAgent {
        &self.coordinator
    }

    /// Worker names in routing priority order
    pub fn worker_names(&self) -> Vec<&str> {
        self.workers.iter().map(|w| w.name.as_str()).collect()
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Run `request` to completion. Never fails; model and parse errors
    /// degrade into fallback results inside the run.
    pub async fn invoke(&self, request: &str) -> RunOutcome {
        self.run(RunState::new(request)).await
    }

    /// Like [`invoke`](Self::invoke), but abandons the run as soon as
    /// `cancel` resolves. The in-flight model call is dropped and the run
    /// reported as [`AgentError::Cancelled`].
    pub async fn invoke_until<C>(&self, request: &str, cancel: C) -> Result<RunOutcome>
    where
        C: Future<Output = ()>,
    {
        let state = RunState::new(request);
        let run_id = state.run_id();
        let run = self.run(state);
        futures::pin_mut!(run);
        futures::pin_mut!(cancel);

        match future::select(run, cancel).await {
            Either::Left((outcome, _)) => Ok(outcome),
            Either::Right(((), _)) => {
                tracing::warn!(%run_id, "Run cancelled");
                Err(AgentError::Cancelled)
            }
        }
    }

    /// Walk the graph from the state's current node until the sink
    pub async fn run(&self, mut state: RunState) -> RunOutcome {
        tracing::info!(run_id = %state.run_id(), "Run started");
        while !state.is_finished() {
            self.step(&mut state).await;
        }
        self.finish(state)
    }

    /// Execute the node the state currently points at. A no-op at the sink.
    pub async fn step(&self, state: &mut RunState) {
        match state.current_node.clone() {
            NodeId::Coordinator => self.coordinator_step(state).await,
            NodeId::Worker(name) => self.worker_step(state, &name).await,
            NodeId::Sink => {}
        }
    }

    /// Checked before every agent call, coordinator or worker. A worker
    /// request refused here ends the run instead of returning to the coordinator.
    fn budget_exhausted(&self, state: &mut RunState) -> bool {
        if state.agent_calls() < self.max_steps {
            return false;
        }
        tracing::warn!(
            run_id = %state.run_id(),
            max_steps = self.max_steps,
            node = %state.current_node(),
            "Step limit reached, forcing termination"
        );
        state.route_to_sink(FALLBACK_ANSWER.to_string(), Termination::StepLimit);
        true
    }

    async fn coordinator_step(&self, state: &mut RunState) {
        if self.budget_exhausted(state) {
            return;
        }

        let (result, usage) = self.coordinator.answer(state.request(), state.reasoning_log()).await;
        let rendered = result.to_string();
        state.reasoning_log.push(Message::assistant(&rendered));
        state.display_log.push(DisplayEntry::new(self.coordinator.name(), &rendered));
        state.usage.record(usage);

        let keys: Vec<&str> = self.workers.iter().map(|w| w.name.as_str()).collect();
        let decision = classify(&result, &keys);
        tracing::debug!(
            run_id = %state.run_id(),
            step = state.agent_calls(),
            decision = ?decision,
            "Coordinator decided"
        );

        match decision {
            CoordinatorDecision::AskWorker { worker, prompt } => state.route_to_worker(worker, prompt),
            CoordinatorDecision::FinalAnswer(answer) => state.route_to_sink(answer, Termination::Answered),
            CoordinatorDecision::Degraded(raw) => {
                tracing::warn!(run_id = %state.run_id(), result = %raw, "Coordinator result not routable");
                state.route_to_sink(raw, Termination::Degraded);
            }
        }
    }

    async fn worker_step(&self, state: &mut RunState, name: &str) {
        let Some(worker) = self.workers.iter().find(|w| w.name == name) else {
            tracing::error!(run_id = %state.run_id(), worker = %name, "Unknown worker node");
            let prompt = state.pending_prompt.take().unwrap_or_default();
            state.route_to_sink(prompt, Termination::Degraded);
            return;
        };
        if self.budget_exhausted(state) {
            return;
        }

        let prompt = state.pending_prompt.take().unwrap_or_default();
        let (result, usage) = worker.agent.answer(&prompt, &[]).await;
        let rendered = result.to_string();
        state.reasoning_log.push(Message::user(&rendered));
        state.display_log.push(DisplayEntry::new(&worker.name, &rendered));
        state.usage.record(usage);

        tracing::debug!(
            run_id = %state.run_id(),
            step = state.agent_calls(),
            worker = %worker.name,
            "Worker answered"
        );
        state.current_node = NodeId::Coordinator;
    }

    fn finish(&self, state: RunState) -> RunOutcome {
        let outcome = state.into_outcome();
        tracing::info!(
            run_id = %outcome.run_id,
            steps = outcome.steps,
            termination = ?outcome.termination,
            input_tokens = outcome.usage.input_tokens,
            output_tokens = outcome.usage.output_tokens,
            reasoning_tokens = outcome.usage.reasoning_tokens,
            "Run finished"
        );
        outcome
    }
}

/// Builder for [`RoutingGraph`]
pub struct GraphBuilder {
    coordinator: Option<Arc<StructuredAgent>>,
    workers: Vec<WorkerNode>,
    max_steps: usize,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self {
            coordinator: None,
            workers: Vec::new(),
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

impl GraphBuilder {
    pub fn coordinator(mut self, agent: impl Into<Arc<StructuredAgent>>) -> Self {
        self.coordinator = Some(agent.into());
        self
    }

    /// Add a worker. Registration order is routing priority.
    pub fn worker(mut self, name: impl Into<String>, agent: impl Into<Arc<StructuredAgent>>) -> Self {
        self.workers.push(WorkerNode {
            name: name.into(),
            agent: agent.into(),
        });
        self
    }

    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn build(self) -> Result<RoutingGraph> {
        let coordinator = self.coordinator
            .ok_or_else(|| AgentError::Config("Routing graph needs a coordinator".into()))?;

        for (i, worker) in self.workers.iter().enumerate() {
            if worker.name.is_empty() || worker.name == ANSWER_KEY {
                return Err(AgentError::Config(format!("Invalid worker name '{}'", worker.name)));
            }
            if self.workers[..i].iter().any(|w| w.name == worker.name) {
                return Err(AgentError::Config(format!("Duplicate worker '{}'", worker.name)));
            }
        }

        Ok(RoutingGraph {
            coordinator,
            workers: self.workers,
            max_steps: self.max_steps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::message::Role;
    use crate::mock::ScriptedProvider;
    use crate::parser::parse_literal_mapping;
    use crate::provider::{Completion, TokenUsage};
    use crate::usage::StepUsage;

    const WORKERS: [&str; 3] = ["deductions", "calculator", "percentage"];

    struct Fixture {
        coordinator: Arc<ScriptedProvider>,
        workers: Arc<ScriptedProvider>,
        graph: RoutingGraph,
    }

    fn fixture(max_steps: usize) -> Fixture {
        let coordinator = Arc::new(ScriptedProvider::new());
        let workers = Arc::new(ScriptedProvider::new());
        let mut builder = RoutingGraph::builder()
            .coordinator(
                StructuredAgent::builder("accountant", ANSWER_KEY)
                    .provider(coordinator.clone())
                    .recognize(WORKERS)
                    .build()
                    .unwrap(),
            )
            .max_steps(max_steps);
        for name in WORKERS {
            builder = builder.worker(
                name,
                StructuredAgent::builder(name, name).provider(workers.clone()).build().unwrap(),
            );
        }
        Fixture { coordinator, workers, graph: builder.build().unwrap() }
    }

    fn parsed(text: &str) -> ParsedResult {
        parse_literal_mapping(text).unwrap()
    }

    #[test]
    fn test_classify_worker_priority() {
        let result = parsed("{'percentage': 'p', 'calculator': 'c', 'deductions': 'd', 'answer': 'a'}");
        assert_eq!(
            classify(&result, &WORKERS),
            CoordinatorDecision::AskWorker { worker: "deductions".into(), prompt: "d".into() }
        );

        let result = parsed("{'answer': '12', 'percentage': 'p', 'calculator': '1+1'}");
        assert_eq!(
            classify(&result, &WORKERS),
            CoordinatorDecision::AskWorker { worker: "calculator".into(), prompt: "1+1".into() }
        );
    }

    #[test]
    fn test_classify_answer_and_degraded() {
        assert_eq!(
            classify(&parsed("{'thought': 't', 'answer': '83.33'}"), &WORKERS),
            CoordinatorDecision::FinalAnswer("83.33".into())
        );
        assert_eq!(
            classify(&parsed("{'thought': 'lost'}"), &WORKERS),
            CoordinatorDecision::Degraded("{'thought': 'lost'}".into())
        );
        assert_eq!(classify(&ParsedResult::new(), &WORKERS), CoordinatorDecision::Degraded("{}".into()));
    }

    #[tokio::test]
    async fn test_deductions_round_trip_to_answer() {
        let f = fixture(DEFAULT_MAX_STEPS);
        f.coordinator.push_reply("{'thought': 'need deductions', 'deductions': 'rent=500'}", 100, 20);
        f.workers.push_reply("{'deductions': 'Applicable: rent 500'}", 40, 10);
        f.coordinator.push_reply("{'thought': 'done', 'answer': '83.33'}", 130, 15);

        let outcome = f.graph.invoke("income=1000, deductions: rent=500").await;

        assert_eq!(outcome.answer, "83.33");
        assert_eq!(outcome.termination, Termination::Answered);
        assert_eq!(outcome.steps, 3);
        assert_eq!(outcome.usage.input_tokens, 100);
        assert_eq!(outcome.usage.output_tokens, 15);
        assert_eq!(outcome.usage.reasoning_tokens, 20 + 40 + 10 + 130);

        let agents: Vec<&str> = outcome.display_log.iter().map(|e| e.agent.as_str()).collect();
        assert_eq!(agents, vec!["accountant", "deductions", "accountant"]);

        // worker saw only the sub-question
        let worker_call = &f.workers.calls()[0];
        assert_eq!(worker_call.len(), 2);
        assert_eq!(worker_call[1].content, "rent=500");

        // second coordinator turn carried the history
        let second = &f.coordinator.calls()[1];
        assert_eq!(second[1].content, "income=1000, deductions: rent=500");
        assert_eq!(second[2].role, Role::Assistant);
        assert_eq!(second[2].content, "{'thought': 'need deductions', 'deductions': 'rent=500'}");
        assert_eq!(second[3].role, Role::User);
        assert_eq!(second[3].content, "{'deductions': 'Applicable: rent 500'}");
    }

    #[tokio::test]
    async fn test_immediate_answer_has_no_reasoning_tokens() {
        let f = fixture(DEFAULT_MAX_STEPS);
        f.coordinator.push_reply("{'answer': 'X'}", 55, 8);

        let outcome = f.graph.invoke("hi").await;

        assert_eq!(outcome.answer, "X");
        assert_eq!(outcome.usage_log, vec![StepUsage::new(55, 8)]);
        assert_eq!(outcome.usage.reasoning_tokens, 0);
        assert_eq!(outcome.usage.input_tokens, 55);
        assert_eq!(outcome.usage.output_tokens, 8);
        assert_eq!(f.workers.call_count(), 0);
    }

    #[tokio::test]
    async fn test_worker_failure_keeps_run_alive() {
        let f = fixture(DEFAULT_MAX_STEPS);
        f.coordinator.push_reply("{'calculator': '1000 * 12'}", 10, 10);
        f.workers.push_error(AgentError::ProviderUnavailable("boom".into()));
        f.coordinator.push_reply("{'answer': 'unknown'}", 20, 5);

        let outcome = f.graph.invoke("q").await;

        assert_eq!(outcome.answer, "unknown");
        assert_eq!(outcome.display_log[1].agent, "calculator");
        assert_eq!(outcome.display_log[1].content, r#"{'calculator': "I don't know"}"#);
        assert_eq!(outcome.usage_log[1], StepUsage::ZERO);
        assert_eq!(f.coordinator.call_count(), 2);
    }

    #[tokio::test]
    async fn test_worker_step_appends_once_and_returns() {
        let f = fixture(DEFAULT_MAX_STEPS);
        f.workers.push_reply("{'percentage': '10%'}", 15, 30);
        let mut state = RunState::new("q");
        state.route_to_worker("percentage".into(), "annual 12000".into());

        f.graph.step(&mut state).await;

        assert_eq!(state.current_node(), &NodeId::Coordinator);
        assert_eq!(state.reasoning_log().len(), 1);
        assert_eq!(state.display_log().len(), 1);
        assert_eq!(state.usage_log(), &[StepUsage::new(15, 30)]);
        assert_eq!(state.pending_prompt(), None);
        assert!(state.reasoning_log()[0].content.contains("10%"));
    }

    #[tokio::test]
    async fn test_coordinator_step_sets_exactly_one_target() {
        let f = fixture(DEFAULT_MAX_STEPS);
        f.coordinator.push_reply("{'percentage': '12000'}", 1, 1);
        f.coordinator.push_reply("{'answer': '5'}", 1, 1);
        let mut state = RunState::new("q");

        f.graph.step(&mut state).await;
        assert_eq!(state.current_node(), &NodeId::Worker("percentage".into()));
        assert_eq!((state.pending_prompt(), state.final_answer()), (Some("12000"), None));

        state.current_node = NodeId::Coordinator;
        f.graph.step(&mut state).await;
        assert_eq!(state.current_node(), &NodeId::Sink);
        assert_eq!((state.pending_prompt(), state.final_answer()), (None, Some("5")));
    }

    #[tokio::test]
    async fn test_malformed_coordinator_answers_i_dont_know() {
        let f = fixture(DEFAULT_MAX_STEPS);
        f.coordinator.push_reply("Incorrect", 10, 10);

        let outcome = f.graph.invoke("q").await;

        assert_eq!(outcome.answer, FALLBACK_ANSWER);
        assert_eq!(outcome.termination, Termination::Answered);
        assert_eq!(outcome.usage_log, vec![StepUsage::ZERO]);
    }

    #[tokio::test]
    async fn test_unroutable_result_degrades_to_raw() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push_reply("{'thought': 'hm', 'verdict': 'pay 10'}", 3, 3);
        let graph = RoutingGraph::builder()
            .coordinator(
                StructuredAgent::builder("accountant", ANSWER_KEY)
                    .provider(provider)
                    .recognize(["verdict"])
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();

        let outcome = graph.invoke("q").await;

        assert_eq!(outcome.termination, Termination::Degraded);
        assert_eq!(outcome.answer, "{'thought': 'hm', 'verdict': 'pay 10'}");
    }

    #[tokio::test]
    async fn test_step_limit_forces_termination() {
        let coordinator = Arc::new(ScriptedProvider::from_fn(|_| {
            Ok(Completion::new("{'calculator': '1+1'}", "m", TokenUsage::new(2, 1)))
        }));
        let workers = Arc::new(ScriptedProvider::from_fn(|_| {
            Ok(Completion::new("{'calculator': 2}", "m", TokenUsage::new(1, 1)))
        }));
        let graph = RoutingGraph::builder()
            .coordinator(
                StructuredAgent::builder("accountant", ANSWER_KEY)
                    .provider(coordinator.clone())
                    .recognize(["calculator"])
                    .build()
                    .unwrap(),
            )
            .worker(
                "calculator",
                StructuredAgent::builder("calculator", "calculator").provider(workers.clone()).build().unwrap(),
            )
            .max_steps(5)
            .build()
            .unwrap();

        let outcome = graph.invoke("loop forever").await;

        assert_eq!(outcome.termination, Termination::StepLimit);
        assert_eq!(outcome.answer, FALLBACK_ANSWER);
        assert_eq!(outcome.steps, 5);
        assert_eq!(coordinator.call_count(), 3);
        // the third coordinator turn asked for the calculator, which the cap refused
        assert_eq!(workers.call_count(), 2);
        assert_eq!(outcome.display_log.last().map(|e| e.agent.as_str()), Some("accountant"));
    }

    #[tokio::test]
    async fn test_zero_step_cap_reduces_to_zero_usage() {
        let f = fixture(0);
        let outcome = f.graph.invoke("q").await;
        assert_eq!(outcome.termination, Termination::StepLimit);
        assert_eq!(outcome.usage, crate::usage::UsageBreakdown::default());
        assert_eq!(f.coordinator.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_aborts_run() {
        let provider = Arc::new(ScriptedProvider::new().with_delay(Duration::from_secs(60)));
        provider.push_reply("{'answer': 'too late'}", 1, 1);
        let graph = RoutingGraph::builder()
            .coordinator(StructuredAgent::builder("accountant", ANSWER_KEY).provider(provider.clone()).build().unwrap())
            .build()
            .unwrap();

        let result = graph.invoke_until("q", tokio::time::sleep(Duration::from_secs(1))).await;

        assert!(matches!(result, Err(AgentError::Cancelled)));
        assert_eq!(provider.remaining(), 1);
    }

    #[tokio::test]
    async fn test_invoke_until_passes_through_when_not_cancelled() {
        let f = fixture(DEFAULT_MAX_STEPS);
        f.coordinator.push_reply("{'answer': '1'}", 1, 1);
        let outcome = f.graph.invoke_until("q", future::pending()).await.unwrap();
        assert_eq!(outcome.answer, "1");
    }

    #[tokio::test]
    async fn test_concurrent_runs_do_not_share_state() {
        let coordinator = Arc::new(ScriptedProvider::from_fn(|messages| {
            let request = &messages[1].content;
            let reply = if messages.len() == 2 {
                format!("{{'calculator': '{}'}}", request)
            } else {
                format!("{{'answer': '{}'}}", messages[3].content.len())
            };
            Ok(Completion::new(reply, "m", TokenUsage::new(1, 1)))
        }));
        let workers = Arc::new(ScriptedProvider::from_fn(|messages| {
            Ok(Completion::new(format!("{{'calculator': '{}'}}", messages[1].content), "m", TokenUsage::new(1, 1)))
        }));
        let graph = Arc::new(
            RoutingGraph::builder()
                .coordinator(
                    StructuredAgent::builder("accountant", ANSWER_KEY)
                        .provider(coordinator)
                        .recognize(["calculator"])
                        .build()
                        .unwrap(),
                )
                .worker("calculator", StructuredAgent::builder("calculator", "calculator").provider(workers).build().unwrap())
                .build()
                .unwrap(),
        );

        let (a, b) = tokio::join!(graph.invoke("1"), graph.invoke("22222"));

        assert_eq!(a.answer, "{'calculator': '1'}".len().to_string());
        assert_eq!(b.answer, "{'calculator': '22222'}".len().to_string());
        assert_eq!(a.reasoning_log.len(), 3);
        assert_eq!(b.reasoning_log.len(), 3);
        assert_ne!(a.run_id, b.run_id);
    }

    #[test]
    fn test_builder_rejects_duplicate_workers() {
        let provider = Arc::new(ScriptedProvider::new());
        let agent = || StructuredAgent::builder("w", "w").provider(provider.clone()).build().unwrap();
        let err = RoutingGraph::builder()
            .coordinator(agent())
            .worker("w", agent())
            .worker("w", agent())
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, AgentError::Config(_)));

        assert!(RoutingGraph::builder().worker("w", agent()).build().is_err());
        assert!(RoutingGraph::builder().coordinator(agent()).worker(ANSWER_KEY, agent()).build().is_err());
    }
}
