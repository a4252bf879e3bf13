use anyhow::Context;
use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::{DeskError, Result};
use crate::wire::ModelVariant;

pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
pub const PORT_ENV: &str = "PORT";

const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: ModelVariant,
    pub api_base: String,
    pub api_version: String,
    /// Only ever read from the environment.
    #[serde(skip)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub max_output_tokens: u32,
    /// Ceiling for short helper calls (URL extraction, structured drafts).
    pub light_output_tokens: u32,
    pub port: u16,
    pub posts_root: PathBuf,
    pub artifacts_root: PathBuf,
    pub save_artifacts: bool,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: ModelVariant::Opus,
            api_base: "https://api.anthropic.com".into(),
            api_version: "2023-06-01".into(),
            api_key: None,
            timeout_secs: 300,
            max_output_tokens: 4000,
            light_output_tokens: 2000,
            port: 3000,
            posts_root: "posts".into(),
            artifacts_root: ".draftdesk".into(),
            save_artifacts: false,
            user_agent: DESKTOP_USER_AGENT.into(),
        }
    }
}

impl Config {
    /// Defaults, then the TOML file if given, then the process environment.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = match path {
            Some(p) => {
                let raw = fs::read_to_string(p)?;
                Self::from_toml(&raw).with_context(|| format!("parsing {}", p.display()))?
            }
            None => Self::default(),
        };
        cfg.apply_env(|key| std::env::var(key).ok())?;
        Ok(cfg)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| DeskError::Config(e.to_string()))
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key.trim().to_string());
        }
        if let Some(port) = lookup(PORT_ENV) {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| DeskError::Config(format!("{PORT_ENV} is not a port number: {port:?}")))?;
        }
        Ok(())
    }

    pub fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| DeskError::Config(format!("{API_KEY_ENV} is not set")))
    }

    pub fn index_path(&self) -> PathBuf {
        self.posts_root.join("index.html")
    }
}
