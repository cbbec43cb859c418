//! Percentage
//!
//! Looks up the tax bracket for an annual net taxable amount.

use std::sync::Arc;

use agent_core::{LlmProvider, ReferenceTable, Result, StructuredAgent};

use super::worker_builder;
use crate::config::AdvisorConfig;

pub const PERCENTAGE: &str = "percentage";

pub const PERCENTAGE_PROMPT: &str = r#"Instructions:
- You are a helpful assistant. You receive a total taxable income and look it up in the table to return the bracket's fixed amount, the surplus base and the percentage over the surplus.
- Answer in the format {'percentage': 'the fixed amount, the surplus base and the percentage'} without additional text."#;

pub fn percentage_agent(
    provider: Arc<dyn LlmProvider>,
    config: &AdvisorConfig,
    table: ReferenceTable,
) -> Result<StructuredAgent> {
    worker_builder(PERCENTAGE, PERCENTAGE_PROMPT, provider, config)
        .table(table)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::mock::ScriptedProvider;

    #[tokio::test]
    async fn test_bracket_lookup_without_thought() {
        let table = ReferenceTable::parse("From,Up to,Fixed amount,Percentage over surplus,Surplus base\n0,10000,0,5,0\n", ',').unwrap();
        let provider = Arc::new(ScriptedProvider::new());
        provider.push_reply("{'percentage': 'fixed 0, base 0, 5%'}", 250, 15);
        let agent = percentage_agent(provider, &AdvisorConfig::default(), table).unwrap();

        let (result, usage) = agent.answer("6000", &[]).await;

        assert_eq!(result.get("percentage"), Some("fixed 0, base 0, 5%"));
        assert_eq!(result.thought(), None);
        assert_eq!(usage.input_tokens, 250);
        assert_eq!(agent.generation().max_tokens, 2048);
    }
}
