use thiserror::Error;

pub type Result<T> = std::result::Result<T, QaError>;

#[derive(Error, Debug)]
pub enum QaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Scrape failure: {0}")]
    Scrape(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<config::ConfigError> for QaError {
    #[inline]
    fn from(error: config::ConfigError) -> Self {
        Self::Config(error.to_string())
    }
}

pub mod commands;
pub mod config;
pub mod crawler;
pub mod embeddings;
pub mod pipeline;
pub mod retrieval;
pub mod store;
pub mod tokenizer;
