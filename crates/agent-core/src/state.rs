//! Run State
//!
//! Everything one run of the routing graph knows. A fresh [`RunState`] is
//! created per request and owned by the engine until the sink turns it into
//! a [`RunOutcome`]; nothing is shared between runs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::Message;
use crate::usage::{StepUsage, UsageAccumulator, UsageBreakdown};

/// Node of the routing graph
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum NodeId {
    /// Entry node; decides where to go next
    Coordinator,
    /// Named worker; always hands control back to the coordinator
    Worker(String),
    /// Terminal node
    Sink,
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeId::Coordinator => f.write_str("coordinator"),
            NodeId::Worker(name) => f.write_str(name),
            NodeId::Sink => f.write_str("sink"),
        }
    }
}

/// How a run reached the sink
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The coordinator produced an `answer`
    Answered,
    /// The coordinator's result had no routable key; it became the answer
    Degraded,
    /// The step cap was hit before the coordinator answered
    StepLimit,
}

/// One line of the human-readable trace
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayEntry {
    /// Agent that produced the content
    pub agent: String,
    pub content: String,
}

impl DisplayEntry {
    pub fn new(agent: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            content: content.into(),
        }
    }
}

/// Mutable state of a single run
#[derive(Clone, Debug)]
pub struct RunState {
    run_id: Uuid,
    request: String,
    pub(crate) reasoning_log: Vec<Message>,
    pub(crate) display_log: Vec<DisplayEntry>,
    pub(crate) usage: UsageAccumulator,
    pub(crate) current_node: NodeId,
    pub(crate) pending_prompt: Option<String>,
    pub(crate) final_answer: Option<String>,
    pub(crate) termination: Option<Termination>,
}

impl RunState {
    /// Fresh state positioned at the coordinator
    pub fn new(request: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            request: request.into(),
            reasoning_log: Vec::new(),
            display_log: Vec::new(),
            usage: UsageAccumulator::new(),
            current_node: NodeId::Coordinator,
            pending_prompt: None,
            final_answer: None,
            termination: None,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn request(&self) -> &str {
        &self.request
    }

    /// History fed back to the coordinator on every turn
    pub fn reasoning_log(&self) -> &[Message] {
        &self.reasoning_log
    }

    pub fn display_log(&self) -> &[DisplayEntry] {
        &self.display_log
    }

    pub fn usage_log(&self) -> &[StepUsage] {
        self.usage.steps()
    }

    pub fn current_node(&self) -> &NodeId {
        &self.current_node
    }

    pub fn pending_prompt(&self) -> Option<&str> {
        self.pending_prompt.as_deref()
    }

    pub fn final_answer(&self) -> Option<&str> {
        self.final_answer.as_deref()
    }

    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    /// Number of agent calls made so far
    pub fn agent_calls(&self) -> usize {
        self.usage.len()
    }

    pub fn is_finished(&self) -> bool {
        self.current_node == NodeId::Sink
    }

    pub(crate) fn route_to_worker(&mut self, worker: String, prompt: String) {
        self.pending_prompt = Some(prompt);
        self.final_answer = None;
        self.current_node = NodeId::Worker(worker);
    }

    pub(crate) fn route_to_sink(&mut self, answer: String, termination: Termination) {
        self.pending_prompt = None;
        self.final_answer = Some(answer);
        self.termination = Some(termination);
        self.current_node = NodeId::Sink;
    }

    /// Reduce the usage log and hand the run back to the caller
    pub fn into_outcome(self) -> RunOutcome {
        let usage = self.usage.breakdown();
        RunOutcome {
            run_id: self.run_id,
            request: self.request,
            answer: self.final_answer.unwrap_or_default(),
            termination: self.termination.unwrap_or(Termination::Degraded),
            steps: self.usage.len(),
            usage,
            usage_log: self.usage.steps().to_vec(),
            display_log: self.display_log,
            reasoning_log: self.reasoning_log,
        }
    }
}

/// Result of one `invoke`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub request: String,
    pub answer: String,
    pub termination: Termination,
    /// Agent calls made during the run
    pub steps: usize,
    pub usage: UsageBreakdown,
    pub usage_log: Vec<StepUsage>,
    pub display_log: Vec<DisplayEntry>,
    pub reasoning_log: Vec<Message>,
}
