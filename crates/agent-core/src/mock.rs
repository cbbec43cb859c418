//! Scripted Provider
//!
//! In-memory [`LlmProvider`] for tests and demos. Replies come either from a
//! FIFO script or from a closure over the incoming messages; every message
//! list received is recorded for later inspection.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::provider::{Completion, GenerationOptions, LlmProvider, TokenUsage};

type Responder = Box<dyn Fn(&[Message]) -> Result<Completion> + Send + Sync>;

/// Provider that replays canned completions
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<Completion>>>,
    responder: Option<Responder>,
    calls: Mutex<Vec<Vec<Message>>>,
    delay: Option<Duration>,
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            responder: None,
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Answer every call with `responder`; the FIFO script is ignored.
    pub fn from_fn<F>(responder: F) -> Self
    where
        F: Fn(&[Message]) -> Result<Completion> + Send + Sync + 'static,
    {
        Self {
            responder: Some(Box::new(responder)),
            ..Self::new()
        }
    }

    /// Sleep before answering each call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push_reply(&self, content: impl Into<String>, prompt_tokens: u32, completion_tokens: u32) {
        let completion = Completion::new(content, "scripted", TokenUsage::new(prompt_tokens, completion_tokens));
        lock(&self.script).push_back(Ok(completion));
    }

    pub fn push_reply_without_usage(&self, content: impl Into<String>) {
        let completion = Completion {
            usage: None,
            ..Completion::new(content, "scripted", TokenUsage::default())
        };
        lock(&self.script).push_back(Ok(completion));
    }

    pub fn push_error(&self, error: AgentError) {
        lock(&self.script).push_back(Err(error));
    }

    /// Message lists received so far, in call order
    pub fn calls(&self) -> Vec<Vec<Message>> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Scripted replies not consumed yet
    pub fn remaining(&self) -> usize {
        lock(&self.script).len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "Scripted"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn complete(&self, messages: &[Message], _options: &GenerationOptions) -> Result<Completion> {
        lock(&self.calls).push(messages.to_vec());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(responder) = &self.responder {
            return responder(messages);
        }

        lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| Err(AgentError::Provider("script exhausted".into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_is_fifo_then_exhausted() {
        let provider = ScriptedProvider::new();
        provider.push_reply("one", 1, 2);
        provider.push_error(AgentError::RateLimited("busy".into()));

        let opts = GenerationOptions::default();
        let first = provider.complete(&[Message::user("a")], &opts).await.unwrap();
        assert_eq!(first.content, "one");
        assert_eq!(first.usage, Some(TokenUsage::new(1, 2)));
        assert!(matches!(provider.complete(&[], &opts).await, Err(AgentError::RateLimited(_))));
        assert!(matches!(provider.complete(&[], &opts).await, Err(AgentError::Provider(_))));
        assert_eq!(provider.call_count(), 3);
        assert_eq!(provider.calls()[0][0].content, "a");
    }

    #[tokio::test]
    async fn test_responder_sees_messages() {
        let provider = ScriptedProvider::from_fn(|messages| {
            Ok(Completion::new(format!("{} messages", messages.len()), "fn", TokenUsage::new(0, 0)))
        });
        let reply = provider
            .complete(&[Message::system("s"), Message::user("u")], &GenerationOptions::default())
            .await
            .unwrap();
        assert_eq!(reply.content, "2 messages");
    }
}
