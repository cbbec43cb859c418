//! Calculator
//!
//! The model only translates the question into an arithmetic expression;
//! [`ExpressionHook`] does the math and replaces the expression with the
//! number. An expression that does not evaluate makes the whole reply a
//! failure, so the agent answers with its fallback.

use std::sync::Arc;

use agent_core::{LiteralValue, LlmProvider, ParsedResult, Result, ResultHook, StructuredAgent};

use super::worker_builder;
use crate::config::AdvisorConfig;
use crate::error::AdvisorError;
use crate::expression;

pub const CALCULATOR: &str = "calculator";

pub const CALCULATOR_PROMPT: &str = r#"Instructions:
- You are a helpful calculator. You execute math.
- Think step by step.
- Use only numbers, + - * / and parentheses in the calculation. No thousands separators, no functions, no powers.
- Answer in the format {"thought": "your line of thought", "calculator": "the arithmetic expression to evaluate"} without additional text."#;

/// Evaluates the `calculator` entry in place
#[derive(Clone, Copy, Debug, Default)]
pub struct ExpressionHook;

impl ResultHook for ExpressionHook {
    fn apply(&self, result: &mut ParsedResult) -> Result<()> {
        let expression = match result.value(CALCULATOR) {
            Some(LiteralValue::Text(text)) => text.clone(),
            Some(LiteralValue::Number(number)) => number.clone(),
            None => {
                return Err(AdvisorError::InvalidExpression(format!("no '{}' entry", CALCULATOR)).into());
            }
        };

        let value = expression::evaluate_to_string(&expression)?;
        tracing::debug!(%expression, %value, "Evaluated calculator expression");
        result.insert_number(CALCULATOR, value);
        Ok(())
    }
}

pub fn calculator_agent(provider: Arc<dyn LlmProvider>, config: &AdvisorConfig) -> Result<StructuredAgent> {
    worker_builder(CALCULATOR, CALCULATOR_PROMPT, provider, config)
        .hook(ExpressionHook)
        .build()
}
