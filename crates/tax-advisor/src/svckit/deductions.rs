//! Deductions
//!
//! Matches the user's declared expenses against the deduction table and
//! caps each one at its category maximum.

use std::sync::Arc;

use agent_core::{LlmProvider, ReferenceTable, Result, StructuredAgent};

use super::worker_builder;
use crate::config::AdvisorConfig;

pub const DEDUCTIONS: &str = "deductions";

pub const DEDUCTIONS_PROMPT: &str = r#"Instructions:
- You are a helpful deductions assistant. You help an accountant decide which expenses reduce a person's taxable income.
- You are given a table with the deductible categories and the maximum deductible amount of each.
- The table has a general deduction that always applies and special deductions (all the others).
- When a user expense falls into a deductible category, return the amount declared by the user up to the maximum allowed for that category.
- Answer in the format {'thought': 'your line of thought', 'deductions': 'the deduction amounts with their categories'} without additional text. Respect the quotes."#;

pub fn deductions_agent(
    provider: Arc<dyn LlmProvider>,
    config: &AdvisorConfig,
    table: ReferenceTable,
) -> Result<StructuredAgent> {
    worker_builder(DEDUCTIONS, DEDUCTIONS_PROMPT, provider, config)
        .table(table)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::mock::ScriptedProvider;

    #[tokio::test]
    async fn test_table_is_part_of_the_prompt() {
        let table = ReferenceTable::parse("Category,Maximum annual amount\nGeneral,6000\nRent,4200\n", ',').unwrap();
        let provider = Arc::new(ScriptedProvider::new());
        provider.push_reply("{'thought': 'rent is capped', 'deductions': 'General 6000, Rent 4200'}", 300, 20);
        let agent = deductions_agent(provider.clone(), &AdvisorConfig::default(), table).unwrap();

        let (result, _) = agent.answer("rent 5000 a year", &[]).await;

        assert_eq!(result.get("deductions"), Some("General 6000, Rent 4200"));
        let sent = &provider.calls()[0];
        assert!(sent[0].content.starts_with("Instructions:"));
        assert!(sent[0].content.ends_with(
            "Context:\n[{'Category': 'General', 'Maximum annual amount': '6000'}, {'Category': 'Rent', 'Maximum annual amount': '4200'}]"
        ));
        assert_eq!(sent[1].content, "rent 5000 a year");
        assert_eq!(sent.len(), 2);
    }
}
