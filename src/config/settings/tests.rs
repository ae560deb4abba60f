use super::*;
use tempfile::TempDir;

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.openai.base_url, "https://api.openai.com");
    assert_eq!(config.openai.api_key_env, "OPENAI_API_KEY");
    assert_eq!(config.openai.embedding_model, "text-embedding-ada-002");
    assert_eq!(config.chunking.chunk_token_limit, 1000);
    assert_eq!(config.retrieval.max_context_tokens, 2500);
    assert_eq!(config.retrieval.max_answer_tokens, 150);
    assert_eq!(config.scraper.headline_selector, "h2.title a");
    assert_eq!(config.scraper.story_selector, "div.storytext");
    assert!(config.validate().is_ok());
}

#[test]
fn config_validation() {
    let config = Config::default();

    let mut invalid_config = config.clone();
    invalid_config.openai.base_url = "ftp://api.openai.com".to_string();
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidProtocol(_))
    ));

    let mut invalid_config = config.clone();
    invalid_config.openai.embedding_model = String::new();
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidModel(_))
    ));

    let mut invalid_config = config.clone();
    invalid_config.openai.batch_size = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.openai.batch_size = 2049;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.chunking.chunk_token_limit = 0;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidChunkTokenLimit(0))
    ));

    let mut invalid_config = config.clone();
    invalid_config.chunking.chunk_token_limit = MAX_EMBEDDING_INPUT_TOKENS + 1;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.retrieval.max_context_tokens = 0;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidMaxContextTokens(0))
    ));

    let mut invalid_config = config.clone();
    invalid_config.retrieval.max_answer_tokens = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.scraper.story_selector = "div[".to_string();
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidSelector(_))
    ));

    let mut invalid_config = config;
    invalid_config.scraper.timeout_seconds = 0;
    assert!(invalid_config.validate().is_err());
}

#[test]
fn api_url_generation() {
    let url = OpenAiConfig::default()
        .api_url()
        .expect("should generate api_url successfully");
    assert_eq!(url.as_str(), "https://api.openai.com/");
}

#[test]
fn api_url_keeps_path_prefix() {
    for base_url in ["https://proxy.internal/openai", "https://proxy.internal/openai/"] {
        let config = OpenAiConfig {
            base_url: base_url.to_string(),
            ..OpenAiConfig::default()
        };
        let url = config.api_url().expect("should parse base url");

        assert_eq!(url.as_str(), "https://proxy.internal/openai/");
        assert_eq!(
            url.join("v1/embeddings").expect("should join").as_str(),
            "https://proxy.internal/openai/v1/embeddings"
        );
    }
}

#[test]
fn toml_serialization() {
    let config = Config::default();
    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    let parsed_config: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
    assert_eq!(config, parsed_config);
}

#[test]
fn partial_toml_uses_defaults() {
    let parsed: Config = toml::from_str(
        r#"
        [chunking]
        chunk_token_limit = 500

        [openai]
        completion_model = "local-model"
        "#,
    )
    .expect("should parse toml correctly");

    assert_eq!(parsed.chunking.chunk_token_limit, 500);
    assert_eq!(parsed.openai.completion_model, "local-model");
    assert_eq!(parsed.openai.embedding_model, "text-embedding-ada-002");
    assert_eq!(parsed.retrieval, RetrievalConfig::default());
}

#[test]
fn missing_file_loads_defaults() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");

    let config = Config::load(temp_dir.path()).expect("should load defaults");

    assert_eq!(config.base_dir, temp_dir.path());
    assert_eq!(config.openai, OpenAiConfig::default());
}

#[test]
fn load_reads_config_file() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let data_dir = temp_dir.path().join("data");
    fs::write(
        temp_dir.path().join("config.toml"),
        format!(
            "[retrieval]\nmax_context_tokens = 1200\n\n[storage]\ndata_dir = {:?}\n",
            data_dir.display().to_string()
        ),
    )
    .expect("should write config");

    let loaded = Config::load(temp_dir.path()).expect("should load config");

    assert_eq!(loaded.retrieval.max_context_tokens, 1200);
    assert_eq!(loaded.retrieval.max_answer_tokens, 150);
    assert_eq!(loaded.base_dir, temp_dir.path());
    assert_eq!(loaded.embeddings_path(), data_dir.join("embeddings.csv"));
}

#[test]
fn invalid_file_fails_to_load() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    fs::write(
        temp_dir.path().join("config.toml"),
        "[retrieval]\nmax_context_tokens = 0\n",
    )
    .expect("should write config");

    assert!(Config::load(temp_dir.path()).is_err());
}

#[test]
fn data_paths() {
    let config = Config::default();
    assert_eq!(config.articles_path(), Path::new("processed/article.csv"));
    assert_eq!(config.embeddings_path(), Path::new("processed/embeddings.csv"));
}
