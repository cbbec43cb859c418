//! Service Kit - Tax Agents
//!
//! One constructor per agent of the tax graph. Every agent shares the same
//! provider and model; only prompts, tables and output keys differ.

mod accountant;
mod calculator;
mod deductions;
mod percentage;

use std::sync::Arc;

use agent_core::{LlmProvider, StructuredAgent, StructuredAgentBuilder};

use crate::config::AdvisorConfig;

pub use accountant::{accountant_agent, ACCOUNTANT, ACCOUNTANT_PROMPT};
pub use calculator::{calculator_agent, ExpressionHook, CALCULATOR, CALCULATOR_PROMPT};
pub use deductions::{deductions_agent, DEDUCTIONS, DEDUCTIONS_PROMPT};
pub use percentage::{percentage_agent, PERCENTAGE, PERCENTAGE_PROMPT};

/// Worker names in the order the accountant's result is checked
pub const WORKERS: [&str; 3] = [DEDUCTIONS, CALCULATOR, PERCENTAGE];

fn worker_builder(
    name: &str,
    prompt: &str,
    provider: Arc<dyn LlmProvider>,
    config: &AdvisorConfig,
) -> StructuredAgentBuilder {
    let builder = StructuredAgent::builder(name, name)
        .provider(provider)
        .system_prompt(prompt)
        .model(config.model.clone())
        .max_tokens(config.worker_max_tokens);

    match config.step_timeout() {
        Some(limit) => builder.timeout(limit),
        None => builder,
    }
}
