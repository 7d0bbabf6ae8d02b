//! OpenAI Chat Completions client implementing `LlmClient` (ChatOpenAI).
//!
//! Requires `OPENAI_API_KEY` (or explicit config). Tools are passed per call;
//! when any are offered the API may return `tool_calls` in the response.

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::error::AgentError;
use crate::llm::{LlmClient, LlmResponse, LlmUsage, ToolCall, ToolSpec};
use crate::message::Message;

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionMessageToolCalls, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage, ChatCompletionTool,
        ChatCompletionToolChoiceOption, ChatCompletionTools, CreateChatCompletionRequestArgs,
        FunctionObject, ToolChoiceOptions,
    },
    Client,
};

use super::ToolChoiceMode;

/// Whether an API error object describes a retryable condition.
///
/// Server errors reach us with neither type nor code. Rate limits carry
/// `rate_limit_exceeded` unless the quota itself is spent.
fn api_error_is_transient(kind: Option<&str>, code: Option<&str>) -> bool {
    if kind == Some("insufficient_quota") || code == Some("insufficient_quota") {
        return false;
    }
    match (kind, code) {
        (None, None) => true,
        (Some("server_error"), _) | (_, Some("server_error")) => true,
        (_, Some("rate_limit_exceeded")) | (Some("requests"), _) | (Some("tokens"), _) => true,
        _ => false,
    }
}

/// Maps a client error onto a transient or rejected generation error.
fn generation_error(e: OpenAIError) -> AgentError {
    let transient = match &e {
        OpenAIError::Reqwest(_) => true,
        OpenAIError::ApiError(api) => {
            api_error_is_transient(api.r#type.as_deref(), api.code.as_deref())
        }
        _ => false,
    };
    let message = format!("OpenAI API error: {}", e);
    if transient {
        AgentError::Generation(message)
    } else {
        AgentError::GenerationRejected(message)
    }
}

/// OpenAI Chat Completions client.
///
/// Uses `OPENAI_API_KEY` from the environment by default, or a config passed to
/// [`ChatOpenAI::with_config`].
pub struct ChatOpenAI {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: Option<f32>,
    tool_choice: ToolChoiceMode,
}

impl ChatOpenAI {
    /// Build client with default config (API key from `OPENAI_API_KEY` env).
    pub fn new(model: impl Into<String>) -> Self {
        Self::from_client(Client::new(), model)
    }

    /// Build client with custom config (e.g. custom API key or base URL).
    pub fn with_config(config: OpenAIConfig, model: impl Into<String>) -> Self {
        Self::from_client(Client::with_config(config), model)
    }

    fn from_client(client: Client<OpenAIConfig>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            temperature: None,
            tool_choice: ToolChoiceMode::Auto,
        }
    }

    /// Set temperature (0–2). Lower values are more deterministic.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set tool choice mode used whenever tools are offered.
    pub fn with_tool_choice(mut self, mode: ToolChoiceMode) -> Self {
        self.tool_choice = mode;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Convert our `Message` list to OpenAI request messages.
    fn messages_to_request(messages: &[Message]) -> Vec<ChatCompletionRequestMessage> {
        messages
            .iter()
            .map(|m| match m {
                Message::System(s) => ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessage::from(s.as_str()),
                ),
                Message::User(s) => ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessage::from(s.as_str()),
                ),
                Message::Assistant(s) => {
                    ChatCompletionRequestMessage::Assistant((s.as_str()).into())
                }
            })
            .collect()
    }

    fn tools_to_request(tools: &[ToolSpec]) -> Vec<ChatCompletionTools> {
        tools
            .iter()
            .map(|t| {
                ChatCompletionTools::Function(ChatCompletionTool {
                    function: FunctionObject {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: Some(t.input_schema.clone()),
                        ..Default::default()
                    },
                })
            })
            .collect()
    }
}

#[async_trait]
impl LlmClient for ChatOpenAI {
    async fn invoke_with_tools(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<LlmResponse, AgentError> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(self.model.clone());
        args.messages(Self::messages_to_request(messages));

        if !tools.is_empty() {
            args.tools(Self::tools_to_request(tools));
            let opt = match self.tool_choice {
                ToolChoiceMode::Auto => ToolChoiceOptions::Auto,
                ToolChoiceMode::None => ToolChoiceOptions::None,
                ToolChoiceMode::Required => ToolChoiceOptions::Required,
            };
            args.tool_choice(ChatCompletionToolChoiceOption::Mode(opt));
        }

        if let Some(t) = self.temperature {
            args.temperature(t);
        }

        let request = args.build().map_err(|e| {
            AgentError::GenerationRejected(format!("OpenAI request build failed: {}", e))
        })?;

        debug!(
            model = %self.model,
            message_count = messages.len(),
            tools_count = tools.len(),
            temperature = ?self.temperature,
            "OpenAI chat create"
        );
        trace!(request = ?request, "OpenAI request body");

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(generation_error)?;

        let usage = response.usage.map(|u| LlmUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Generation("OpenAI returned no choices".to_string()))?;

        let msg = choice.message;
        let content = msg.content.unwrap_or_default();
        let tool_calls: Vec<ToolCall> = msg
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .filter_map(|tc| {
                if let ChatCompletionMessageToolCalls::Function(f) = tc {
                    Some(ToolCall {
                        name: f.function.name,
                        arguments: f.function.arguments,
                        id: Some(f.id),
                    })
                } else {
                    None
                }
            })
            .collect();

        if let Some(u) = &usage {
            debug!(
                prompt_tokens = u.prompt_tokens,
                completion_tokens = u.completion_tokens,
                tool_calls = tool_calls.len(),
                "OpenAI chat response"
            );
        }

        Ok(LlmResponse {
            content,
            tool_calls,
            usage,
        })
    }
}
