//! Tax Advisor
//!
//! Wires the accountant and its workers into a [`RoutingGraph`]. Tables are
//! read once at construction; agents and provider are shared by every run.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use agent_core::{LlmProvider, ReferenceTable, RoutingGraph, RunOutcome};

use crate::config::{AdvisorConfig, BUNDLED_DEDUCTIONS, BUNDLED_RATES};
use crate::error::Result;
use crate::svckit::{
    accountant_agent, calculator_agent, deductions_agent, percentage_agent, CALCULATOR, DEDUCTIONS,
    PERCENTAGE,
};

/// Opening line shown to a new user
pub const GREETING: &str = "Hello, I'm your tax calculator bot. Give me your monthly income, your deductions \
and the current month, and I will calculate the tax amount to pay next month.";

pub struct TaxAdvisor {
    graph: RoutingGraph,
    config: AdvisorConfig,
}

impl std::fmt::Debug for TaxAdvisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaxAdvisor")
            .field("agents", &self.agent_names())
            .field("config", &self.config)
            .finish()
    }
}

impl TaxAdvisor {
    /// Load both tables, from the configured paths or the bundled copies,
    /// and build the graph
    pub fn new(provider: Arc<dyn LlmProvider>, config: AdvisorConfig) -> Result<Self> {
        let delimiter = config.table_delimiter;
        let deductions = table(config.deductions_table.as_deref(), BUNDLED_DEDUCTIONS, delimiter)?;
        let rates = table(config.rates_table.as_deref(), BUNDLED_RATES, delimiter)?;
        tracing::info!(
            deductions = deductions.len(),
            brackets = rates.len(),
            model = %config.model,
            "Loaded reference tables"
        );
        Self::with_tables(provider, config, deductions, rates)
    }

    /// Build the graph around tables already in memory
    pub fn with_tables(
        provider: Arc<dyn LlmProvider>,
        config: AdvisorConfig,
        deductions: ReferenceTable,
        rates: ReferenceTable,
    ) -> Result<Self> {
        let graph = RoutingGraph::builder()
            .coordinator(accountant_agent(provider.clone(), &config)?)
            .worker(DEDUCTIONS, deductions_agent(provider.clone(), &config, deductions)?)
            .worker(CALCULATOR, calculator_agent(provider.clone(), &config)?)
            .worker(PERCENTAGE, percentage_agent(provider, &config, rates)?)
            .max_steps(config.max_steps)
            .build()?;

        Ok(Self { graph, config })
    }

    pub fn graph(&self) -> &RoutingGraph {
        &self.graph
    }

    pub fn config(&self) -> &AdvisorConfig {
        &self.config
    }

    /// Coordinator first, then workers in routing priority
    pub fn agent_names(&self) -> Vec<&str> {
        let mut names = vec![self.graph.coordinator().name()];
        names.extend(self.graph.worker_names());
        names
    }

    /// Answer one tax question. Never fails; see [`RunOutcome::termination`].
    pub async fn invoke(&self, request: &str) -> RunOutcome {
        self.graph.invoke(request).await
    }

    /// Like [`invoke`](Self::invoke), abandoning the run when `cancel`
    /// resolves first
    pub async fn invoke_until<C>(&self, request: &str, cancel: C) -> agent_core::Result<RunOutcome>
    where
        C: Future<Output = ()>,
    {
        self.graph.invoke_until(request, cancel).await
    }
}

fn table(path: Option<&Path>, bundled: &str, delimiter: char) -> Result<ReferenceTable> {
    let table = match path {
        Some(path) => ReferenceTable::load(path, delimiter)?,
        None => ReferenceTable::parse(bundled, ',')?,
    };
    Ok(table)
}
