//! Web search capability offered to the model as the `web_search` tool.

mod exa;

pub use exa::ExaSearch;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Web search errors.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("search API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("missing search API key")]
    MissingApiKey,
}

impl SearchError {
    /// Network failures, rate limits and server errors may clear on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            SearchError::Transport(_) => true,
            SearchError::Api { status, .. } => *status == 429 || *status >= 500,
            SearchError::MissingApiKey => false,
        }
    }
}

/// One search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

impl SearchHit {
    /// Citation string used for bookmarks: `<title> (<url>)`.
    pub fn citation(&self) -> String {
        format!("{} ({})", self.title, self.url)
    }
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Up to `max_results` hits for `query`.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError>;
}

/// Renders hits as a numbered block for the model.
pub fn format_hits(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "No results.".to_string();
    }
    let mut s = String::new();
    for (i, hit) in hits.iter().enumerate() {
        s.push_str(&format!("[{}] {}\n  URL: {}\n", i + 1, hit.title, hit.url));
        if !hit.snippet.is_empty() {
            s.push_str(&format!("  {}\n", hit.snippet.replace('\n', " ")));
        }
        s.push('\n');
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_hits_numbers_results() {
        let hits = vec![
            SearchHit {
                title: "Rust".into(),
                url: "https://rust-lang.org".into(),
                snippet: "A language\nempowering everyone".into(),
            },
            SearchHit {
                title: "Docs".into(),
                url: "https://docs.rs".into(),
                snippet: String::new(),
            },
        ];
        let s = format_hits(&hits);
        assert!(s.starts_with("[1] Rust\n  URL: https://rust-lang.org\n  A language empowering everyone\n"));
        assert!(s.contains("[2] Docs\n  URL: https://docs.rs\n\n"));
        assert_eq!(format_hits(&[]), "No results.");
    }

    #[test]
    fn search_error_transience() {
        assert!(SearchError::Api { status: 503, body: String::new() }.is_transient());
        assert!(SearchError::Api { status: 429, body: String::new() }.is_transient());
        assert!(!SearchError::Api { status: 401, body: String::new() }.is_transient());
        assert!(!SearchError::MissingApiKey.is_transient());
    }

    #[test]
    fn hit_citation() {
        let hit = SearchHit {
            title: "T".into(),
            url: "https://x.y".into(),
            snippet: String::new(),
        };
        assert_eq!(hit.citation(), "T (https://x.y)");
    }
}
