use super::*;

fn test_config() -> OpenAiConfig {
    OpenAiConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        embedding_model: "test-embedding".to_string(),
        completion_model: "test-completion".to_string(),
        batch_size: 8,
        ..OpenAiConfig::default()
    }
}

#[test]
fn client_configuration() {
    let client =
        OpenAiClient::with_api_key(&test_config(), "sk-test").expect("Failed to create client");

    assert_eq!(client.embedding_model, "test-embedding");
    assert_eq!(client.completion_model, "test-completion");
    assert_eq!(client.batch_size, 8);
    assert_eq!(client.base_url.host_str(), Some("127.0.0.1"));
    assert_eq!(client.base_url.port(), Some(9));
    assert_eq!(client.retry_attempts, OpenAiConfig::default().retry_attempts);
}

#[test]
fn client_builder_methods() {
    let client = OpenAiClient::with_api_key(&test_config(), "sk-test")
        .expect("Failed to create client")
        .with_timeout(Duration::from_secs(5))
        .with_retry_attempts(0)
        .with_retry_delay(Duration::ZERO);

    assert_eq!(client.retry_attempts, 1);
    assert_eq!(client.retry_delay, Duration::ZERO);
}

#[test]
fn missing_api_key_variable_is_config_error() {
    let config = OpenAiConfig {
        api_key_env: "NEWS_QA_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
        ..test_config()
    };

    let result = OpenAiClient::new(&config);
    assert!(matches!(result, Err(QaError::Config(message)) if message.contains("NEWS_QA_TEST_KEY_THAT_IS_NEVER_SET")));
}

#[test]
fn blank_api_key_is_rejected() {
    assert!(matches!(
        OpenAiClient::with_api_key(&test_config(), "  "),
        Err(QaError::Config(_))
    ));
}

#[test]
fn debug_output_hides_api_key() {
    let client =
        OpenAiClient::with_api_key(&test_config(), "sk-secret").expect("Failed to create client");
    let debug = format!("{:?}", client);

    assert!(debug.contains("test-embedding"));
    assert!(!debug.contains("sk-secret"));
}

#[test]
fn empty_input_skips_request() {
    let client =
        OpenAiClient::with_api_key(&test_config(), "sk-test").expect("Failed to create client");

    let embeddings = client.embed(&[]).expect("empty input should succeed");
    assert!(embeddings.is_empty());
}

#[test]
fn response_limit_grows_with_batch() {
    // ada-002 vectors serialize to roughly 20 KB each
    let largest_batch = 2048;
    let expected_body = largest_batch * 1536 * 14;

    assert!(embedding_response_limit(largest_batch as usize) > expected_body);
    assert!(embedding_response_limit(1) < embedding_response_limit(2));
    assert_eq!(embedding_response_limit(usize::MAX), u64::MAX);
}

#[test]
fn endpoints_join_under_base_path() {
    let config = OpenAiConfig {
        base_url: "http://127.0.0.1:9/openai".to_string(),
        ..test_config()
    };
    let client = OpenAiClient::with_api_key(&config, "sk-test").expect("Failed to create client");

    let url = client.base_url.join("v1/completions").expect("should join");
    assert_eq!(url.as_str(), "http://127.0.0.1:9/openai/v1/completions");
}
