//! Text generation with an optional single web-search tool round.
//!
//! The [`Generator`] renders a [`PromptTemplate`], calls the LLM under the
//! configured [`CallPolicy`], and, when the model asks for `web_search` and
//! the capability is allowed, runs the searches, feeds the results back as a
//! user message and asks once more without tools.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::json;

use crate::error::AgentError;
use crate::graph::CallPolicy;
use crate::llm::{LlmClient, LlmResponse, ToolSpec};
use crate::message::Message;
use crate::prompts::{PromptTemplate, PromptVars};
use crate::search::{format_hits, SearchHit, WebSearch};

/// Name of the search tool as the model sees it.
pub const WEB_SEARCH_TOOL: &str = "web_search";

/// A capability a generation call may use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    WebSearch,
}

/// Capabilities allowed for one call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolSet(Vec<Capability>);

impl ToolSet {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn web_search() -> Self {
        Self(vec![Capability::WebSearch])
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }
}

/// Model output plus the web results it was shown.
#[derive(Clone, Debug, Default)]
pub struct Generation {
    pub text: String,
    pub web_results: Vec<SearchHit>,
}

pub struct Generator {
    llm: Arc<dyn LlmClient>,
    search: Option<Arc<dyn WebSearch>>,
    policy: CallPolicy,
    search_max_results: usize,
}

impl Generator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            search: None,
            policy: CallPolicy::default(),
            search_max_results: 5,
        }
    }

    /// Enables the `web_search` tool for calls that allow it.
    pub fn with_search(mut self, search: Arc<dyn WebSearch>, max_results: usize) -> Self {
        self.search = Some(search);
        self.search_max_results = max_results.max(1);
        self
    }

    pub fn with_policy(mut self, policy: CallPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &CallPolicy {
        &self.policy
    }

    pub fn has_search(&self) -> bool {
        self.search.is_some()
    }

    fn web_search_spec() -> ToolSpec {
        ToolSpec {
            name: WEB_SEARCH_TOOL.to_string(),
            description: Some(
                "Search the web for up-to-date information when the provided context is insufficient."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Search query." }
                },
                "required": ["query"]
            }),
        }
    }

    fn query_from_arguments(arguments: &str) -> Option<String> {
        serde_json::from_str::<serde_json::Value>(arguments)
            .ok()?
            .get("query")?
            .as_str()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(String::from)
    }

    async fn invoke(
        &self,
        operation: &str,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<LlmResponse, AgentError> {
        let llm = &self.llm;
        self.policy
            .call(operation, move || llm.invoke_with_tools(messages, tools))
            .await
    }

    /// Runs one generation for `template`.
    ///
    /// Returns [`AgentError::EmptyGeneration`] when the final answer is blank.
    pub async fn complete(
        &self,
        template: &PromptTemplate,
        vars: &PromptVars,
        log: &[Message],
        allowed: &ToolSet,
    ) -> Result<Generation, AgentError> {
        let messages = template.render(vars, log);
        let search = self
            .search
            .as_ref()
            .filter(|_| allowed.contains(Capability::WebSearch));
        let tools: Vec<ToolSpec> = search.iter().map(|_| Self::web_search_spec()).collect();

        let first = self.invoke(template.name, &messages, &tools).await?;

        let queries: Vec<String> = match search {
            Some(_) => first
                .tool_calls
                .iter()
                .filter_map(|call| {
                    if call.name != WEB_SEARCH_TOOL {
                        tracing::warn!(tool = %call.name, "ignoring call to unknown tool");
                        return None;
                    }
                    let query = Self::query_from_arguments(&call.arguments);
                    if query.is_none() {
                        tracing::warn!(arguments = %call.arguments, "web_search call without a query");
                    }
                    query
                })
                .collect(),
            None => Vec::new(),
        };

        let (Some(search), false) = (search, queries.is_empty()) else {
            return Self::finish(template, first.content, Vec::new());
        };

        let mut hits: Vec<SearchHit> = Vec::new();
        let mut seen_urls = HashSet::new();
        for query in &queries {
            tracing::info!(node = template.name, query = %query, "web search");
            let q = query.as_str();
            let n = self.search_max_results;
            let found = self
                .policy
                .call(WEB_SEARCH_TOOL, move || async move {
                    search.search(q, n).await.map_err(AgentError::from)
                })
                .await?;
            hits.extend(found.into_iter().filter(|h| seen_urls.insert(h.url.clone())));
        }

        let mut followup = messages;
        if !first.content.trim().is_empty() {
            followup.push(Message::assistant(first.content));
        }
        followup.push(Message::user(format!(
            "Web search results:\n\n{}\nAnswer the question using these results and the context above.",
            format_hits(&hits)
        )));

        let second = self.invoke(template.name, &followup, &[]).await?;
        Self::finish(template, second.content, hits)
    }

    fn finish(
        template: &PromptTemplate,
        text: String,
        web_results: Vec<SearchHit>,
    ) -> Result<Generation, AgentError> {
        if text.trim().is_empty() {
            return Err(AgentError::EmptyGeneration {
                node: template.name.to_string(),
            });
        }
        Ok(Generation { text, web_results })
    }
}
