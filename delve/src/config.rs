//! Run configuration read from the process environment.
//!
//! The CLI loads `.env` and the XDG config file into the environment first
//! (see the `config` crate); this module only reads variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::graph::{CallPolicy, RetryPolicy};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Tunables for one research run and its collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct ResearchConfig {
    pub max_iterations: u32,
    pub retrieval_k: usize,
    pub search_max_results: usize,
    pub call_timeout: Duration,
    pub max_retries: usize,
    pub model: String,
    pub temperature: f32,
    pub embedding_model: String,
    pub corpus_path: PathBuf,
    /// Web search is disabled when unset.
    pub exa_api_key: Option<String>,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            retrieval_k: 5,
            search_max_results: 5,
            call_timeout: Duration::from_secs(120),
            max_retries: 2,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.1,
            embedding_model: "text-embedding-3-small".to_string(),
            corpus_path: PathBuf::from("vector_store/delve.db"),
            exa_api_key: None,
        }
    }
}

fn parse<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })
}

impl ResearchConfig {
    /// Reads every `DELVE_*`, `OPENAI_*` and `EXA_API_KEY` setting from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with an arbitrary variable source.
    /// Unset and blank values keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(v) = get("DELVE_MAX_ITERATIONS") {
            config.max_iterations = parse("DELVE_MAX_ITERATIONS", &v)?;
            if config.max_iterations == 0 {
                return Err(ConfigError::Invalid {
                    key: "DELVE_MAX_ITERATIONS",
                    value: v,
                });
            }
        }
        if let Some(v) = get("DELVE_RETRIEVAL_K") {
            config.retrieval_k = parse("DELVE_RETRIEVAL_K", &v)?;
        }
        if let Some(v) = get("DELVE_SEARCH_MAX_RESULTS") {
            config.search_max_results = parse("DELVE_SEARCH_MAX_RESULTS", &v)?;
        }
        if let Some(v) = get("DELVE_CALL_TIMEOUT_SECS") {
            let secs: u64 = parse("DELVE_CALL_TIMEOUT_SECS", &v)?;
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    key: "DELVE_CALL_TIMEOUT_SECS",
                    value: v,
                });
            }
            config.call_timeout = Duration::from_secs(secs);
        }
        if let Some(v) = get("DELVE_MAX_RETRIES") {
            config.max_retries = parse("DELVE_MAX_RETRIES", &v)?;
        }
        if let Some(v) = get("OPENAI_MODEL") {
            config.model = v.trim().to_string();
        }
        if let Some(v) = get("DELVE_TEMPERATURE") {
            let t: f32 = parse("DELVE_TEMPERATURE", &v)?;
            if !(0.0..=2.0).contains(&t) {
                return Err(ConfigError::Invalid {
                    key: "DELVE_TEMPERATURE",
                    value: v,
                });
            }
            config.temperature = t;
        }
        if let Some(v) = get("OPENAI_EMBEDDING_MODEL") {
            config.embedding_model = v.trim().to_string();
        }
        if let Some(v) = get("DELVE_CORPUS_PATH") {
            config.corpus_path = PathBuf::from(v.trim());
        }
        config.exa_api_key = get("EXA_API_KEY").map(|v| v.trim().to_string());

        Ok(config)
    }

    /// Deadline and retry budget applied to every collaborator call.
    pub fn call_policy(&self) -> CallPolicy {
        CallPolicy::new(
            RetryPolicy::research_default(self.max_retries),
            self.call_timeout,
        )
    }
}

/// Per-run settings. The run id only correlates log lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub run_id: Uuid,
}

impl RunConfig {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let c = ResearchConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(c, ResearchConfig::default());
        assert_eq!(c.call_policy().timeout, Duration::from_secs(120));
        assert_eq!(c.call_policy().retry.max_retries, 2);
    }

    #[test]
    fn values_override_defaults() {
        let c = ResearchConfig::from_lookup(lookup(&[
            ("DELVE_MAX_ITERATIONS", "5"),
            ("DELVE_RETRIEVAL_K", " 8 "),
            ("DELVE_CALL_TIMEOUT_SECS", "30"),
            ("OPENAI_MODEL", "gpt-4o"),
            ("DELVE_TEMPERATURE", "0"),
            ("EXA_API_KEY", "exa-key"),
            ("DELVE_SEARCH_MAX_RESULTS", ""),
        ]))
        .unwrap();
        assert_eq!(c.max_iterations, 5);
        assert_eq!(c.retrieval_k, 8);
        assert_eq!(c.call_timeout, Duration::from_secs(30));
        assert_eq!(c.model, "gpt-4o");
        assert_eq!(c.temperature, 0.0);
        assert_eq!(c.exa_api_key.as_deref(), Some("exa-key"));
        assert_eq!(c.search_max_results, 5);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = ResearchConfig::from_lookup(lookup(&[("DELVE_MAX_ITERATIONS", "many")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "DELVE_MAX_ITERATIONS",
                value: "many".into()
            }
        );
        assert!(ResearchConfig::from_lookup(lookup(&[("DELVE_MAX_ITERATIONS", "0")])).is_err());
        assert!(ResearchConfig::from_lookup(lookup(&[("DELVE_TEMPERATURE", "3.5")])).is_err());
        assert!(ResearchConfig::from_lookup(lookup(&[("DELVE_CALL_TIMEOUT_SECS", "0")])).is_err());
    }

    #[test]
    fn run_ids_are_unique() {
        assert_ne!(RunConfig::new().run_id, RunConfig::new().run_id);
    }
}
