//! # agent-core
//!
//! Multi-agent routing core: structured LLM agents wired into a
//! coordinator/worker graph with per-run token accounting.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       RoutingGraph                           │
//! │  ┌─────────────┐   ┌──────────────────┐   ┌──────────────┐   │
//! │  │  RunState   │──▶│ StructuredAgent  │──▶│ LlmProvider  │   │
//! │  │ (per run)   │   │ + ResponseParser │   │  (Strategy)  │   │
//! │  └─────────────┘   └──────────────────┘   └──────────────┘   │
//! │         │                                                    │
//! │         ▼                                                    │
//! │  UsageAccumulator ──▶ UsageBreakdown                         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Agents and the provider are built once and shared; each `invoke` gets
//! its own [`RunState`]. The `LlmProvider` trait keeps the graph
//! independent of whichever completion backend is plugged in.

pub mod agent;
pub mod error;
pub mod graph;
pub mod message;
pub mod mock;
pub mod parser;
pub mod provider;
pub mod state;
pub mod table;
pub mod usage;

pub use agent::{ResultHook, StructuredAgent, StructuredAgentBuilder, FALLBACK_ANSWER};
pub use error::{AgentError, Result};
pub use graph::{classify, CoordinatorDecision, GraphBuilder, RoutingGraph, ANSWER_KEY};
pub use message::{Message, Role};
pub use parser::{LiteralValue, ParsedResult, ResponseParser};
pub use provider::{Completion, GenerationOptions, LlmProvider, TokenUsage};
pub use state::{DisplayEntry, NodeId, RunOutcome, RunState, Termination};
pub use table::ReferenceTable;
pub use usage::{StepUsage, UsageAccumulator, UsageBreakdown};
