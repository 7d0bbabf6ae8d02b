//! Mock LLM for tests.
//!
//! Either replays a fixed script of responses in order (the last one repeats
//! once the script is exhausted) or answers through a closure that sees the
//! rendered messages. Every call is recorded for later assertions.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::llm::{LlmClient, LlmResponse, ToolSpec};
use crate::message::Message;

type Responder = Box<dyn Fn(&[Message], &[ToolSpec]) -> Result<LlmResponse, AgentError> + Send + Sync>;

enum Behaviour {
    Script {
        queue: Mutex<VecDeque<LlmResponse>>,
        last: Mutex<Option<LlmResponse>>,
    },
    Respond(Responder),
}

/// A call seen by [`MockLlm`].
#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolSpec>,
}

/// Scripted LLM for tests.
pub struct MockLlm {
    behaviour: Behaviour,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockLlm {
    /// Always answers `content` with no tool calls.
    pub fn with_no_tool_calls(content: impl Into<String>) -> Self {
        Self::scripted(vec![LlmResponse::text(content)])
    }

    /// Replays `responses` in order; the final response repeats afterwards.
    pub fn scripted(responses: Vec<LlmResponse>) -> Self {
        Self {
            behaviour: Behaviour::Script {
                queue: Mutex::new(responses.into()),
                last: Mutex::new(None),
            },
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Replays plain-text answers in order.
    pub fn texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::scripted(texts.into_iter().map(LlmResponse::text).collect())
    }

    /// Answers through `f`, which sees the messages and tools of each call.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&[Message], &[ToolSpec]) -> Result<LlmResponse, AgentError> + Send + Sync + 'static,
    {
        Self {
            behaviour: Behaviour::Respond(Box::new(f)),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with `AgentError::Generation(message)`.
    pub fn failing(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::from_fn(move |_, _| Err(AgentError::Generation(message.clone())))
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    fn next_scripted(
        queue: &Mutex<VecDeque<LlmResponse>>,
        last: &Mutex<Option<LlmResponse>>,
    ) -> Result<LlmResponse, AgentError> {
        let next = queue
            .lock()
            .map_err(|_| AgentError::Generation("mock lock poisoned".into()))?
            .pop_front();
        let mut last = last
            .lock()
            .map_err(|_| AgentError::Generation("mock lock poisoned".into()))?;
        match next {
            Some(resp) => {
                *last = Some(resp.clone());
                Ok(resp)
            }
            None => last
                .clone()
                .ok_or_else(|| AgentError::Generation("mock script is empty".into())),
        }
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn invoke_with_tools(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<LlmResponse, AgentError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                messages: messages.to_vec(),
                tools: tools.to_vec(),
            });
        }
        match &self.behaviour {
            Behaviour::Script { queue, last } => Self::next_scripted(queue, last),
            Behaviour::Respond(f) => f(messages, tools),
        }
    }
}
