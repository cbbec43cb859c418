//! # agent-runtime
//!
//! Completion providers for the agent routing core.
//!
//! ## Providers
//!
//! - **Groq** (default): OpenAI-compatible chat completions over HTTPS.
//!   Point `GROQ_BASE_URL` at any other OpenAI-compatible server to use it
//!   instead.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::GroqProvider;
//!
//! let provider: Arc<dyn LlmProvider> = Arc::new(GroqProvider::from_env()?);
//! let agent = StructuredAgent::builder("accountant", "answer")
//!     .provider(provider.clone())
//!     .build()?;
//! ```

#[cfg(feature = "groq")]
pub mod groq;

#[cfg(feature = "groq")]
pub use groq::{GroqProvider, ProviderConfig};

// Re-export core types for convenience
pub use agent_core::{
    AgentError, LlmProvider, Message, Result, Role, RoutingGraph, StructuredAgent,
};
