//! Token Accounting
//!
//! One [`StepUsage`] is recorded per agent call. At the end of a run the log
//! is reduced into a [`UsageBreakdown`]: the first prompt, the last
//! completion, and everything in between as "reasoning" tokens.

use serde::{Deserialize, Serialize};

use crate::provider::TokenUsage;

/// Tokens consumed by one agent call
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl StepUsage {
    pub const ZERO: Self = Self { input_tokens: 0, output_tokens: 0 };

    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self { input_tokens, output_tokens }
    }

    pub fn total(&self) -> u64 {
        u64::from(self.input_tokens) + u64::from(self.output_tokens)
    }
}

impl From<TokenUsage> for StepUsage {
    fn from(usage: TokenUsage) -> Self {
        Self::new(usage.prompt_tokens, usage.completion_tokens)
    }
}

impl From<(u32, u32)> for StepUsage {
    fn from((input_tokens, output_tokens): (u32, u32)) -> Self {
        Self::new(input_tokens, output_tokens)
    }
}

/// Per-run token totals
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageBreakdown {
    /// Prompt tokens of the very first call
    pub input_tokens: u64,
    /// Completion tokens of the very last call
    pub output_tokens: u64,
    /// Every other token spent in between
    pub reasoning_tokens: u64,
}

impl UsageBreakdown {
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens + self.reasoning_tokens
    }
}

impl std::fmt::Display for UsageBreakdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Usage: input tokens={}, output tokens={}, reasoning tokens={}",
            self.input_tokens, self.output_tokens, self.reasoning_tokens
        )
    }
}

/// Append-only usage log for one run
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageAccumulator {
    steps: Vec<StepUsage>,
}

impl UsageAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, usage: impl Into<StepUsage>) {
        self.steps.push(usage.into());
    }

    pub fn steps(&self) -> &[StepUsage] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Reduce the log. An empty log reduces to zeros; a single entry
    /// yields its own input/output and no reasoning tokens.
    pub fn breakdown(&self) -> UsageBreakdown {
        let (Some(first), Some(last)) = (self.steps.first(), self.steps.last()) else {
            return UsageBreakdown::default();
        };
        let input_tokens = u64::from(first.input_tokens);
        let output_tokens = u64::from(last.output_tokens);
        let total: u64 = self.steps.iter().map(StepUsage::total).sum();
        UsageBreakdown {
            input_tokens,
            output_tokens,
            reasoning_tokens: total - input_tokens - output_tokens,
        }
    }
}
