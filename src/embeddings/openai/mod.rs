#[cfg(test)]
mod tests;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::OpenAiConfig;
use crate::{QaError, Result};

const EXPONENTIAL_BACKOFF_BASE: u32 = 2;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Response body allowance per embedded input, enough for a 3072-dimension vector as JSON
const EMBEDDING_RESPONSE_BYTES_PER_INPUT: u64 = 64 * 1024;
/// Response body allowance for anything that is not a per-input payload
const BASE_RESPONSE_BYTES: u64 = 10 * 1024 * 1024;

/// Maps texts to fixed-length vectors, one per input, in input order
pub trait EmbeddingProvider {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Maps a prompt to generated answer text
pub trait CompletionProvider {
    fn complete(&self, prompt: &str, max_tokens: usize) -> Result<String>;
}

#[derive(Clone)]
pub struct OpenAiClient {
    base_url: Url,
    api_key: String,
    embedding_model: String,
    completion_model: String,
    batch_size: usize,
    agent: ureq::Agent,
    retry_attempts: u32,
    retry_delay: Duration,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: usize,
    temperature: f32,
    presence_penalty: f32,
    frequency_penalty: f32,
    best_of: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    text: String,
}

impl OpenAiClient {
    /// Create a client, reading the API key from the configured environment variable
    #[inline]
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            QaError::Config(format!(
                "Environment variable {} is not set",
                config.api_key_env
            ))
        })?;
        Self::with_api_key(config, api_key)
    }

    #[inline]
    pub fn with_api_key(config: &OpenAiConfig, api_key: impl Into<String>) -> Result<Self> {
        let base_url = config.api_url()?;
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(QaError::Config("OpenAI API key is empty".to_string()));
        }

        Ok(Self {
            base_url,
            api_key,
            embedding_model: config.embedding_model.clone(),
            completion_model: config.completion_model.clone(),
            batch_size: config.batch_size.max(1),
            agent: build_agent(Duration::from_secs(config.timeout_seconds)),
            retry_attempts: config.retry_attempts.max(1),
            retry_delay: DEFAULT_RETRY_DELAY,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts.max(1);
        self
    }

    /// Base delay before the first retry, doubled for each later attempt
    #[inline]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: texts,
        };
        let url = self
            .base_url
            .join("v1/embeddings")
            .context("Failed to build embeddings URL")?;
        let request_json =
            serde_json::to_string(&request).context("Failed to serialize embedding request")?;

        let body_limit = embedding_response_limit(texts.len());
        let response_text = self
            .post_with_retry(&url, &request_json, body_limit)
            .context("Failed to generate embeddings")?;

        let mut response: EmbeddingResponse = serde_json::from_str(&response_text)
            .context("Failed to parse embedding response")?;

        if response.data.len() != texts.len() {
            anyhow::bail!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                response.data.len()
            );
        }

        response.data.sort_by_key(|data| data.index);
        if response
            .data
            .iter()
            .enumerate()
            .any(|(position, data)| data.index != position)
        {
            anyhow::bail!("Embedding response indices do not cover the request");
        }

        Ok(response
            .data
            .into_iter()
            .map(|data| data.embedding)
            .collect())
    }

    fn post_with_retry(&self, url: &Url, body: &str, body_limit: u64) -> anyhow::Result<String> {
        let authorization = format!("Bearer {}", self.api_key);
        self.make_request_with_retry(|| {
            self.agent
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .header("Authorization", authorization.as_str())
                .send(body)
                .and_then(|mut resp| {
                    resp.body_mut()
                        .with_config()
                        .limit(body_limit)
                        .read_to_string()
                })
        })
    }

    fn make_request_with_retry<F>(&self, mut request_fn: F) -> anyhow::Result<String>
    where
        F: FnMut() -> std::result::Result<String, ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            debug!("HTTP request attempt {}/{}", attempt, self.retry_attempts);

            match request_fn() {
                Ok(response_text) => {
                    debug!("Request succeeded on attempt {}", attempt);
                    return Ok(response_text);
                }
                Err(error) => {
                    let should_retry = match &error {
                        ureq::Error::StatusCode(status) if *status >= 500 || *status == 429 => {
                            warn!(
                                "Retryable status {}, attempt {}/{}",
                                status, attempt, self.retry_attempts
                            );
                            true
                        }
                        ureq::Error::StatusCode(status) => {
                            warn!("Client error (status {}), not retrying", status);
                            return Err(anyhow::anyhow!("Client error: HTTP {}", status));
                        }
                        ureq::Error::ConnectionFailed
                        | ureq::Error::HostNotFound
                        | ureq::Error::Timeout(_)
                        | ureq::Error::Io(_) => {
                            warn!(
                                "Transport error: {}, attempt {}/{}",
                                error, attempt, self.retry_attempts
                            );
                            true
                        }
                        _ => false,
                    };

                    if !should_retry {
                        warn!("Non-retryable error: {}", error);
                        return Err(anyhow::anyhow!("Non-retryable error: {}", error));
                    }

                    last_error = Some(anyhow::anyhow!("Request error: {}", error));

                    if attempt < self.retry_attempts {
                        let delay = self.retry_delay * EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1);
                        debug!("Waiting {:?} before retry", delay);
                        std::thread::sleep(delay);
                    }
                }
            }
        }

        error!("All retry attempts failed for request to {}", self.base_url);

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Request failed after retries")))
    }
}

/// Largest embedding response body accepted for a batch of `inputs` texts
fn embedding_response_limit(inputs: usize) -> u64 {
    let inputs = u64::try_from(inputs).unwrap_or(u64::MAX);
    BASE_RESPONSE_BYTES.saturating_add(inputs.saturating_mul(EMBEDDING_RESPONSE_BYTES_PER_INPUT))
}

impl EmbeddingProvider for OpenAiClient {
    #[inline]
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut embeddings = Vec::with_capacity(texts.len());
        for (batch_index, batch) in texts.chunks(self.batch_size).enumerate() {
            let offset = batch_index * self.batch_size;
            let batch_embeddings = self.embed_batch(batch).map_err(|e| {
                QaError::Provider(format!(
                    "Embedding texts {}..{} with {}: {:#}",
                    offset,
                    offset + batch.len(),
                    self.embedding_model,
                    e
                ))
            })?;
            embeddings.extend(batch_embeddings);
        }

        info!(
            "Generated {} embeddings with {}",
            embeddings.len(),
            self.embedding_model
        );
        Ok(embeddings)
    }
}

impl CompletionProvider for OpenAiClient {
    #[inline]
    fn complete(&self, prompt: &str, max_tokens: usize) -> Result<String> {
        let request = CompletionRequest {
            model: &self.completion_model,
            prompt,
            max_tokens,
            temperature: 0.0,
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
            best_of: 1,
        };

        let completion = || -> anyhow::Result<String> {
            let url = self
                .base_url
                .join("v1/completions")
                .context("Failed to build completions URL")?;
            let request_json = serde_json::to_string(&request)
                .context("Failed to serialize completion request")?;

            let response_text = self
                .post_with_retry(&url, &request_json, BASE_RESPONSE_BYTES)
                .context("Failed to generate completion")?;
            let response: CompletionResponse = serde_json::from_str(&response_text)
                .context("Failed to parse completion response")?;

            response
                .choices
                .into_iter()
                .next()
                .map(|choice| choice.text)
                .context("Completion response contained no choices")
        };

        debug!(
            "Requesting completion from {} ({} prompt chars)",
            self.completion_model,
            prompt.len()
        );

        completion().map_err(|e| {
            QaError::Provider(format!(
                "Completing prompt with {}: {:#}",
                self.completion_model, e
            ))
        })
    }
}

impl fmt::Debug for OpenAiClient {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .field("embedding_model", &self.embedding_model)
            .field("completion_model", &self.completion_model)
            .field("batch_size", &self.batch_size)
            .field("retry_attempts", &self.retry_attempts)
            .finish_non_exhaustive()
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}
