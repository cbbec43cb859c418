//! Structured Agents
//!
//! A [`StructuredAgent`] is one prompt plus one model call: it sends its
//! system prompt, the question and any prior history to the provider and
//! parses the reply into a [`ParsedResult`]. Every failure along the way
//! (transport, timeout, parse, post-processing) is swallowed and replaced by
//! a fallback result keyed by the agent's primary key, so callers always get
//! something routable back.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::parser::{ParsedResult, ResponseParser};
use crate::provider::{GenerationOptions, LlmProvider};
use crate::table::ReferenceTable;
use crate::usage::StepUsage;

/// Payload of every fallback result
pub const FALLBACK_ANSWER: &str = "I don't know";

/// Post-processing applied to a successfully parsed result.
///
/// An error here sends the agent down its fallback path just like a parse
/// failure does.
pub trait ResultHook: Send + Sync {
    fn apply(&self, result: &mut ParsedResult) -> Result<()>;
}

/// Prompt-plus-model wrapper with a fixed output contract
pub struct StructuredAgent {
    name: String,
    primary_key: String,
    system_prompt: String,
    parser: ResponseParser,
    provider: Arc<dyn LlmProvider>,
    generation: GenerationOptions,
    timeout: Option<Duration>,
    hook: Option<Arc<dyn ResultHook>>,
}

impl std::fmt::Debug for StructuredAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructuredAgent")
            .field("name", &self.name)
            .field("primary_key", &self.primary_key)
            .field("provider", &self.provider.name())
            .field("model", &self.generation.model)
            .finish_non_exhaustive()
    }
}

impl StructuredAgent {
    pub fn builder(name: impl Into<String>, primary_key: impl Into<String>) -> StructuredAgentBuilder {
        StructuredAgentBuilder::new(name, primary_key)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Full system prompt, reference table included
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn generation(&self) -> &GenerationOptions {
        &self.generation
    }

    /// The result returned whenever anything goes wrong
    pub fn fallback(&self) -> ParsedResult {
        ParsedResult::single(&self.primary_key, FALLBACK_ANSWER)
    }

    /// System prompt, then the question, then `history` verbatim
    pub fn build_messages(&self, question: &str, history: &[Message]) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(&self.system_prompt));
        messages.push(Message::user(question));
        messages.extend(history.iter().cloned());
        messages
    }

    /// Ask the agent. Never fails: errors yield the fallback result and
    /// zero usage.
    pub async fn answer(&self, question: &str, history: &[Message]) -> (ParsedResult, StepUsage) {
        match self.try_answer(question, history).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(agent = %self.name, error = %e, "Agent call failed, using fallback");
                (self.fallback(), StepUsage::ZERO)
            }
        }
    }

    /// Ask the agent, surfacing the failure instead of falling back
    pub async fn try_answer(&self, question: &str, history: &[Message]) -> Result<(ParsedResult, StepUsage)> {
        let messages = self.build_messages(question, history);
        let call = self.provider.complete(&messages, &self.generation);

        let completion = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| AgentError::Timeout(limit.as_secs()))??,
            None => call.await?,
        };

        let usage = completion.usage.map(StepUsage::from).unwrap_or_default();
        let mut result = self.parser.parse(&completion.content)?;
        if let Some(hook) = &self.hook {
            hook.apply(&mut result)?;
        }

        tracing::debug!(
            agent = %self.name,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "Agent answered"
        );
        Ok((result, usage))
    }
}

/// Builder for [`StructuredAgent`]
pub struct StructuredAgentBuilder {
    name: String,
    primary_key: String,
    extra_keys: Vec<String>,
    system_prompt: String,
    table: Option<ReferenceTable>,
    provider: Option<Arc<dyn LlmProvider>>,
    generation: GenerationOptions,
    timeout: Option<Duration>,
    hook: Option<Arc<dyn ResultHook>>,
}

impl StructuredAgentBuilder {
    pub fn new(name: impl Into<String>, primary_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: primary_key.into(),
            extra_keys: Vec::new(),
            system_prompt: String::new(),
            table: None,
            provider: None,
            generation: GenerationOptions::default(),
            timeout: None,
            hook: None,
        }
    }

    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Reference table appended to the system prompt under `Context:`
    pub fn table(mut self, table: ReferenceTable) -> Self {
        self.table = Some(table);
        self
    }

    /// Additional keys that make a reply acceptable besides the primary one
    pub fn recognize<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_keys.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn generation(mut self, generation: GenerationOptions) -> Self {
        self.generation = generation;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.generation.model = model.into();
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.generation.max_tokens = max_tokens;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn hook(mut self, hook: impl ResultHook + 'static) -> Self {
        self.hook = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> Result<StructuredAgent> {
        let provider = self.provider
            .ok_or_else(|| AgentError::Config(format!("Agent '{}' needs a provider", self.name)))?;
        if self.primary_key.is_empty() {
            return Err(AgentError::Config(format!("Agent '{}' needs a primary key", self.name)));
        }

        let system_prompt = match &self.table {
            Some(table) => format!("{}\n\nContext:\n{}", self.system_prompt.trim_end(), table.render()),
            None => self.system_prompt,
        };

        let mut keys = vec![self.primary_key.clone()];
        keys.extend(self.extra_keys.into_iter().filter(|k| *k != self.primary_key));

        Ok(StructuredAgent {
            name: self.name,
            primary_key: self.primary_key,
            system_prompt,
            parser: ResponseParser::new(keys),
            provider,
            generation: self.generation,
            timeout: self.timeout,
            hook: self.hook,
        })
    }
}
