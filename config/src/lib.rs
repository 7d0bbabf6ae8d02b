//! Loads delve settings from the XDG `config.toml` and a project `.env` into the
//! process environment, with priority **existing env > .env > XDG**.
//!
//! The research crate only reads variables; this crate is where files come in.

mod env_file;
mod xdg_toml;

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Name used for the XDG directory: `$XDG_CONFIG_HOME/delve/config.toml`.
pub const APP_NAME: &str = "delve";

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("xdg config path: {0}")]
    XdgPath(String),
    #[error("read xdg config: {0}")]
    XdgRead(std::io::Error),
    #[error("parse xdg toml: {0}")]
    XdgParse(#[from] toml::de::Error),
    #[error("read .env: {0}")]
    Dotenv(#[from] dotenv::Error),
}

/// Which variables were set, by source. Variables already in the environment are not listed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub from_dotenv: Vec<String>,
    pub from_xdg: Vec<String>,
}

/// Path of the config file for `app_name`, whether or not it exists.
pub fn config_file_path(app_name: &str) -> Result<PathBuf, LoadError> {
    xdg_toml::config_path(app_name)
}

/// Sets every variable found in `.env` or the XDG config that is not already set.
///
/// * `app_name`: XDG directory name, normally [`APP_NAME`].
/// * `override_dir`: directory holding `.env` instead of the current directory.
pub fn load_and_apply(app_name: &str, override_dir: Option<&Path>) -> Result<LoadReport, LoadError> {
    let xdg_map = xdg_toml::load_env_map(app_name)?;
    let dotenv_map = env_file::load_env_map(override_dir)?;
    let resolved = resolve(&dotenv_map, &xdg_map, |key| std::env::var_os(key).is_some());

    let mut report = LoadReport::default();
    for (key, value, from_dotenv) in resolved {
        std::env::set_var(&key, value);
        if from_dotenv {
            report.from_dotenv.push(key);
        } else {
            report.from_xdg.push(key);
        }
    }
    Ok(report)
}

/// Picks `.env` over XDG for each key not already set; sorted by key.
fn resolve<F>(
    dotenv_map: &HashMap<String, String>,
    xdg_map: &HashMap<String, String>,
    is_set: F,
) -> Vec<(String, String, bool)>
where
    F: Fn(&str) -> bool,
{
    let keys: BTreeSet<&String> = dotenv_map.keys().chain(xdg_map.keys()).collect();
    keys.into_iter()
        .filter(|key| !is_set(key))
        .filter_map(|key| match dotenv_map.get(key) {
            Some(v) => Some((key.clone(), v.clone(), true)),
            None => xdg_map.get(key).map(|v| (key.clone(), v.clone(), false)),
        })
        .collect()
}
