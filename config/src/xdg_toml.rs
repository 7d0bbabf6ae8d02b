//! `$XDG_CONFIG_HOME/<app>/config.toml`: a raw `[env]` table plus a typed
//! `[research]` table whose fields map onto the `DELVE_*` / `OPENAI_*` variables.
//!
//! ```toml
//! [research]
//! max_iterations = 4
//! model = "gpt-4o"
//!
//! [env]
//! EXA_API_KEY = "..."
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::LoadError;

/// `XDG_CONFIG_HOME` when set and non-empty, else the platform config dir.
pub(crate) fn config_home() -> Result<PathBuf, LoadError> {
    match std::env::var_os("XDG_CONFIG_HOME") {
        Some(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
        _ => dirs::config_dir()
            .ok_or_else(|| LoadError::XdgPath("no config directory for this platform".into())),
    }
}

pub(crate) fn config_path(app_name: &str) -> Result<PathBuf, LoadError> {
    Ok(config_home()?.join(app_name).join("config.toml"))
}

#[derive(Deserialize, Default)]
struct ResearchSection {
    max_iterations: Option<u32>,
    retrieval_k: Option<usize>,
    search_max_results: Option<usize>,
    call_timeout_secs: Option<u64>,
    max_retries: Option<usize>,
    temperature: Option<f32>,
    model: Option<String>,
    embedding_model: Option<String>,
    corpus_path: Option<String>,
}

impl ResearchSection {
    fn into_env(self) -> Vec<(&'static str, String)> {
        let fields = [
            ("DELVE_MAX_ITERATIONS", self.max_iterations.map(|v| v.to_string())),
            ("DELVE_RETRIEVAL_K", self.retrieval_k.map(|v| v.to_string())),
            (
                "DELVE_SEARCH_MAX_RESULTS",
                self.search_max_results.map(|v| v.to_string()),
            ),
            (
                "DELVE_CALL_TIMEOUT_SECS",
                self.call_timeout_secs.map(|v| v.to_string()),
            ),
            ("DELVE_MAX_RETRIES", self.max_retries.map(|v| v.to_string())),
            ("DELVE_TEMPERATURE", self.temperature.map(|v| v.to_string())),
            ("OPENAI_MODEL", self.model),
            ("OPENAI_EMBEDDING_MODEL", self.embedding_model),
            ("DELVE_CORPUS_PATH", self.corpus_path),
        ];
        fields
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| (k, v)))
            .collect()
    }
}

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    research: ResearchSection,
    #[serde(default)]
    env: HashMap<String, String>,
}

/// Variables contributed by the config file. `[env]` entries win over `[research]`
/// fields naming the same variable. A missing file yields an empty map.
pub fn load_env_map(app_name: &str) -> Result<HashMap<String, String>, LoadError> {
    let path = config_path(app_name)?;
    if !path.is_file() {
        return Ok(HashMap::new());
    }
    let content = std::fs::read_to_string(&path).map_err(LoadError::XdgRead)?;
    let file: ConfigFile = toml::from_str(&content)?;

    let mut out: HashMap<String, String> = file
        .research
        .into_env()
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    out.extend(file.env);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn research_table_maps_to_variables() {
        let file: ConfigFile = toml::from_str(
            r#"
[research]
max_iterations = 4
temperature = 0.5
model = "gpt-4o"
"#,
        )
        .unwrap();
        let mut env = file.research.into_env();
        env.sort();
        assert_eq!(
            env,
            vec![
                ("DELVE_MAX_ITERATIONS", "4".to_string()),
                ("DELVE_TEMPERATURE", "0.5".to_string()),
                ("OPENAI_MODEL", "gpt-4o".to_string()),
            ]
        );
    }

    #[test]
    fn unknown_sections_are_ignored() {
        let file: ConfigFile = toml::from_str("[other]\nkey = \"ignored\"\n").unwrap();
        assert!(file.env.is_empty());
        assert!(file.research.into_env().is_empty());
    }

    #[test]
    fn wrong_type_is_a_parse_error() {
        let parsed: Result<ConfigFile, _> = toml::from_str("[research]\nmax_iterations = \"many\"\n");
        assert!(parsed.is_err());
    }
}
