//! Application State

use std::sync::Arc;
use std::time::Duration;

use agent_core::LlmProvider;
use tax_advisor::TaxAdvisor;

/// Upper bound on one `/api/invoke` run
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 600;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Completion backend shared by every agent
    pub provider: Arc<dyn LlmProvider>,

    /// Accountant graph, built once at startup
    pub advisor: Arc<TaxAdvisor>,

    /// Runs still going after this are abandoned
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(provider: Arc<dyn LlmProvider>, advisor: TaxAdvisor) -> Self {
        let request_timeout = std::env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        Self {
            provider,
            advisor: Arc::new(advisor),
            request_timeout: Duration::from_secs(request_timeout),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
