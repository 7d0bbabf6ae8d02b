//! Exa web search over its HTTP search API.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{SearchError, SearchHit, WebSearch};

const EXA_SEARCH_URL: &str = "https://api.exa.ai/search";
const NUM_RESULTS_MAX: usize = 100;
const TEXT_MAX_CHARS: usize = 6000;
const SNIPPET_MAX_CHARS: usize = 1500;

fn exa_search_url() -> String {
    std::env::var("EXA_SEARCH_URL").unwrap_or_else(|_| EXA_SEARCH_URL.to_string())
}

#[derive(Debug, Deserialize)]
struct ExaResponse {
    #[serde(default)]
    results: Vec<ExaResult>,
}

#[derive(Debug, Deserialize)]
struct ExaResult {
    title: Option<String>,
    #[serde(default)]
    url: String,
    text: Option<String>,
    #[serde(default)]
    highlights: Vec<String>,
    summary: Option<String>,
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

impl ExaResult {
    /// Highlights when present, else summary, else the page text.
    fn snippet(&self) -> String {
        let highlights: Vec<&str> = self
            .highlights
            .iter()
            .map(|h| h.trim())
            .filter(|h| !h.is_empty())
            .collect();
        if !highlights.is_empty() {
            return truncate_chars(&highlights.join(" "), SNIPPET_MAX_CHARS);
        }
        let fallback = self
            .summary
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| self.text.as_deref().map(str::trim))
            .unwrap_or("");
        truncate_chars(fallback, SNIPPET_MAX_CHARS)
    }

    fn into_hit(self) -> SearchHit {
        let snippet = self.snippet();
        SearchHit {
            title: self
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| "(no title)".to_string()),
            url: self.url,
            snippet,
        }
    }
}

/// Exa search client.
pub struct ExaSearch {
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

impl ExaSearch {
    /// Uses `EXA_SEARCH_URL` when set, else the public endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_endpoint(api_key, exa_search_url())
    }

    pub fn with_endpoint(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }

    fn build_body(query: &str, max_results: usize) -> serde_json::Value {
        json!({
            "query": query,
            "numResults": max_results.clamp(1, NUM_RESULTS_MAX),
            "type": "auto",
            "contents": {
                "text": { "maxCharacters": TEXT_MAX_CHARS },
                "highlights": { "maxCharacters": 2000 }
            }
        })
    }
}

#[async_trait]
impl WebSearch for ExaSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        if self.api_key.trim().is_empty() {
            return Err(SearchError::MissingApiKey);
        }
        tracing::debug!(query, max_results, endpoint = %self.endpoint, "Exa search");
        let res = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&Self::build_body(query, max_results))
            .send()
            .await
            .map_err(|e| SearchError::Transport(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(SearchError::Api {
                status: status.as_u16(),
                body,
            });
        }
        let out: ExaResponse = res
            .json()
            .await
            .map_err(|e| SearchError::Transport(e.to_string()))?;

        Ok(out
            .results
            .into_iter()
            .take(max_results)
            .map(ExaResult::into_hit)
            .collect())
    }
}
