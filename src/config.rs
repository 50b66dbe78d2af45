use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::extractor::{KeywordMatcher, DEFAULT_KEYWORDS};
use crate::query::MAX_NEWS;

pub const DEFAULT_FEED_URL: &str = "https://e00-elmundo.uecdn.es/elmundo/rss/portada.xml";
pub const DEFAULT_DATABASE_URL: &str = "sqlite:headlines.db?mode=rwc";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_feed_url")]
    pub feed_url: String,
    /// Maximum feed items read per ingestion run
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    /// Maximum records shown on the listing page
    #[serde(default = "default_max_news")]
    pub max_news: i64,
    /// Feed request timeout in seconds
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_feed_url() -> String {
    DEFAULT_FEED_URL.to_string()
}

fn default_max_items() -> usize {
    10
}

fn default_max_news() -> i64 {
    MAX_NEWS
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}

fn default_keywords() -> Vec<String> {
    DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect()
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid keyword pattern '{pattern}': {source}")]
    InvalidKeyword {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("{0} must be greater than zero")]
    ZeroLimit(&'static str),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_url: default_feed_url(),
            max_items: default_max_items(),
            max_news: default_max_news(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            database_url: default_database_url(),
            keywords: default_keywords(),
            bind_addr: default_bind_addr(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_items == 0 {
            return Err(ConfigError::ZeroLimit("max_items"));
        }
        if self.max_news <= 0 {
            return Err(ConfigError::ZeroLimit("max_news"));
        }
        KeywordMatcher::new(&self.keywords)?;
        Ok(())
    }
}
