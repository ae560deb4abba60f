#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::crawler::ScraperConfig;
use crate::embeddings::chunking::ChunkingConfig;
use crate::retrieval::RetrievalConfig;

/// Largest input the OpenAI embedding models accept, in tokens
pub const MAX_EMBEDDING_INPUT_TOKENS: usize = 8191;

const CONFIG_FILE_NAME: &str = "config.toml";
const ARTICLES_FILE_NAME: &str = "article.csv";
const EMBEDDINGS_FILE_NAME: &str = "embeddings.csv";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OpenAiConfig {
    pub base_url: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub embedding_model: String,
    pub completion_model: String,
    pub batch_size: usize,
    pub timeout_seconds: u64,
    pub retry_attempts: u32,
}

impl Default for OpenAiConfig {
    #[inline]
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            embedding_model: "text-embedding-ada-002".to_string(),
            completion_model: "gpt-3.5-turbo-instruct".to_string(),
            batch_size: 100,
            timeout_seconds: 60,
            retry_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the scraped articles and the embedding store
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    #[inline]
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("processed"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid API key variable: {0} (cannot be empty)")]
    InvalidApiKeyEnv(String),
    #[error("Invalid batch size: {0} (must be between 1 and 2048)")]
    InvalidBatchSize(usize),
    #[error("Invalid timeout: {0} (must be between 1 and 600 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid retry attempts: {0} (must be between 1 and 10)")]
    InvalidRetryAttempts(u32),
    #[error("Invalid chunk token limit: {0} (must be between 1 and {MAX_EMBEDDING_INPUT_TOKENS})")]
    InvalidChunkTokenLimit(usize),
    #[error("Invalid max context tokens: {0} (must be greater than 0)")]
    InvalidMaxContextTokens(usize),
    #[error("Invalid max answer tokens: {0} (must be greater than 0)")]
    InvalidMaxAnswerTokens(usize),
    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),
}

impl Config {
    /// Load `config.toml` from `config_dir`, falling back to defaults when it does not exist
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    /// Default configuration directory for this user
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("news-qa"))
            .ok_or(ConfigError::DirectoryError)
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.openai.validate()?;
        self.validate_chunking_config()?;
        self.validate_retrieval_config()?;
        self.validate_scraper_config()?;
        Ok(())
    }

    fn validate_chunking_config(&self) -> Result<(), ConfigError> {
        let limit = self.chunking.chunk_token_limit;
        if !(1..=MAX_EMBEDDING_INPUT_TOKENS).contains(&limit) {
            return Err(ConfigError::InvalidChunkTokenLimit(limit));
        }
        Ok(())
    }

    fn validate_retrieval_config(&self) -> Result<(), ConfigError> {
        if self.retrieval.max_context_tokens == 0 {
            return Err(ConfigError::InvalidMaxContextTokens(
                self.retrieval.max_context_tokens,
            ));
        }
        if self.retrieval.max_answer_tokens == 0 {
            return Err(ConfigError::InvalidMaxAnswerTokens(
                self.retrieval.max_answer_tokens,
            ));
        }
        Ok(())
    }

    fn validate_scraper_config(&self) -> Result<(), ConfigError> {
        let scraper = &self.scraper;

        let news_url = Url::parse(&scraper.news_url)
            .map_err(|_| ConfigError::InvalidUrl(scraper.news_url.clone()))?;
        if news_url.scheme() != "http" && news_url.scheme() != "https" {
            return Err(ConfigError::InvalidProtocol(news_url.scheme().to_string()));
        }

        for selector in [&scraper.headline_selector, &scraper.story_selector] {
            if Selector::parse(selector).is_err() {
                return Err(ConfigError::InvalidSelector(selector.clone()));
            }
        }

        if !(1..=600).contains(&scraper.timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(scraper.timeout_seconds));
        }

        Ok(())
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.base_dir.join(CONFIG_FILE_NAME)
    }

    /// Scraped articles, rewritten on every ingestion run
    #[inline]
    pub fn articles_path(&self) -> PathBuf {
        self.storage.data_dir.join(ARTICLES_FILE_NAME)
    }

    /// The embedding store
    #[inline]
    pub fn embeddings_path(&self) -> PathBuf {
        self.storage.data_dir.join(EMBEDDINGS_FILE_NAME)
    }
}

impl OpenAiConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api_url()?;

        if self.api_key_env.trim().is_empty() {
            return Err(ConfigError::InvalidApiKeyEnv(self.api_key_env.clone()));
        }

        for model in [&self.embedding_model, &self.completion_model] {
            if model.trim().is_empty() {
                return Err(ConfigError::InvalidModel(model.clone()));
            }
        }

        if self.batch_size == 0 || self.batch_size > 2048 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        if !(1..=600).contains(&self.timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }

        if !(1..=10).contains(&self.retry_attempts) {
            return Err(ConfigError::InvalidRetryAttempts(self.retry_attempts));
        }

        Ok(())
    }

    /// Parsed API base URL, restricted to http and https.
    ///
    /// The path always ends in `/` so endpoint paths join under any proxy prefix.
    #[inline]
    pub fn api_url(&self) -> Result<Url, ConfigError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|_| ConfigError::InvalidUrl(self.base_url.clone()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidProtocol(url.scheme().to_string()));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }
}
