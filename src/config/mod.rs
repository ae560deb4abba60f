// Configuration management module
// TOML settings plus a read-only view of the effective configuration

pub mod settings;

use console::style;

pub use settings::{Config, ConfigError, OpenAiConfig, StorageConfig};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}

/// Print the effective configuration to stderr
#[inline]
pub fn show_config(config: &Config) {
    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("OpenAI Settings:").bold().yellow());
    eprintln!("  Base URL: {}", style(&config.openai.base_url).cyan());
    eprintln!("  API Key Variable: {}", style(&config.openai.api_key_env).cyan());
    eprintln!(
        "  Embedding Model: {}",
        style(&config.openai.embedding_model).cyan()
    );
    eprintln!(
        "  Completion Model: {}",
        style(&config.openai.completion_model).cyan()
    );
    eprintln!("  Batch Size: {}", style(config.openai.batch_size).cyan());

    eprintln!();
    eprintln!("{}", style("Pipeline Settings:").bold().yellow());
    eprintln!(
        "  Chunk Token Limit: {}",
        style(config.chunking.chunk_token_limit).cyan()
    );
    eprintln!(
        "  Max Context Tokens: {}",
        style(config.retrieval.max_context_tokens).cyan()
    );
    eprintln!(
        "  Max Answer Tokens: {}",
        style(config.retrieval.max_answer_tokens).cyan()
    );
    eprintln!("  News URL: {}", style(&config.scraper.news_url).cyan());
    eprintln!(
        "  Embedding Store: {}",
        style(config.embeddings_path().display()).cyan()
    );

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );
}
