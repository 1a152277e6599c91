use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::relay::matcher::PATTERN_PREFIX;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub relay: RelayConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Chat receiving notifications; 0 means not configured yet
    #[serde(default)]
    pub target_chat_id: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RelayConfig {
    /// Observed channels, as `@handle` or numeric chat id
    #[serde(default)]
    pub channels: Vec<String>,
    /// Literal keywords, or `re:<pattern>`; built-in defaults when absent
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            channels: Vec::new(),
            keywords: None,
            state_path: default_state_path(),
        }
    }
}

fn default_state_path() -> PathBuf {
    PathBuf::from("gifts_state.json")
}

fn default_keywords() -> Vec<String> {
    [
        r"\bgifts?\b",
        r"\bpremium\s+gifts?\b",
        r"\bstars?\b",
        r"\bregal[oi]\b",
        r"\bnuov[oi]\s+regali?\b",
        r"\bstelle\b",
    ]
    .iter()
    .map(|p| format!("{}{}", PATTERN_PREFIX, p))
    .collect()
}

/// Split a comma-separated list, dropping blank items
fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    /// Destination chat, if one is configured
    pub fn destination(&self) -> Option<i64> {
        match self.telegram.target_chat_id {
            0 => None,
            id => Some(id),
        }
    }

    /// Configured keywords, or the built-in set
    pub fn keywords(&self) -> Vec<String> {
        self.relay.keywords.clone().unwrap_or_else(default_keywords)
    }

    /// Load from an optional TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::read_file(path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse the TOML file at `path`; a missing file gives the defaults.
    pub fn read_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Override settings from `BOT_TOKEN`, `TARGET_CHAT_ID`, `CHANNELS`,
    /// `KEYWORDS` and `STATE_PATH`.
    pub fn apply_env<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = var("BOT_TOKEN") {
            self.telegram.bot_token = token.trim().to_string();
        }
        if let Some(id) = var("TARGET_CHAT_ID") {
            let id = id.trim();
            self.telegram.target_chat_id = if id.is_empty() {
                0
            } else {
                id.parse()
                    .with_context(|| format!("TARGET_CHAT_ID is not a chat id: {}", id))?
            };
        }
        if let Some(channels) = var("CHANNELS") {
            self.relay.channels = split_list(&channels);
        }
        if let Some(keywords) = var("KEYWORDS") {
            self.relay.keywords = Some(split_list(&keywords));
        }
        if let Some(path) = var("STATE_PATH") {
            self.relay.state_path = PathBuf::from(path.trim());
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            bail!("Bot token is not set (BOT_TOKEN or [telegram] bot_token)");
        }
        if self.relay.channels.iter().all(|c| c.trim().is_empty()) {
            bail!("No channels configured (CHANNELS or [relay] channels)");
        }
        if let Some(keywords) = &self.relay.keywords {
            if keywords.iter().all(|k| k.trim().is_empty()) {
                bail!("Keyword list is configured but empty (KEYWORDS or [relay] keywords)");
            }
        }
        Ok(())
    }
}
