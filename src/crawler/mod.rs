
use anyhow::{Context, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::thread::sleep;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use ureq::Agent;
use url::Url;

use crate::{QaError, Result};

/// A scraped news article
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub url: String,
    pub content: String,
}

/// Configuration for the news scraper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Section page listing the headlines to follow
    pub news_url: String,
    /// CSS selector for the headline links on the section page
    pub headline_selector: String,
    /// CSS selector for the story body on an article page
    pub story_selector: String,
    /// User agent string to use for requests
    pub user_agent: String,
    /// Timeout for HTTP requests in seconds
    pub timeout_seconds: u64,
    /// Rate limit delay between requests in milliseconds
    pub rate_limit_ms: u64,
    /// Maximum number of retry attempts for retryable errors
    pub max_retries: u32,
    /// Delay between retry attempts in seconds
    pub retry_delay_seconds: u64,
    /// Stop after this many articles, 0 for no limit
    pub max_articles: usize,
}

impl Default for ScraperConfig {
    #[inline]
    fn default() -> Self {
        Self {
            news_url: "https://www.npr.org/sections/news/".to_string(),
            headline_selector: "h2.title a".to_string(),
            story_selector: "div.storytext".to_string(),
            user_agent: "news-qa/0.0.1 (News Reader)".to_string(),
            timeout_seconds: 30,
            rate_limit_ms: 250,
            max_retries: 3,
            retry_delay_seconds: 2,
            max_articles: 0,
        }
    }
}

/// Anything that can produce the raw articles for an ingestion run
pub trait DocumentSource {
    fn fetch_documents(&mut self) -> Result<Vec<Document>>;
}

/// Flatten text so it can live in a single comma-delimited column.
///
/// Tabs, newlines and commas become spaces, runs of whitespace collapse to a
/// single space, and the result is trimmed.
#[inline]
pub fn prune_text(text: &str) -> String {
    text.replace(',', " ").split_whitespace().join(" ")
}

/// HTTP client wrapper with rate limiting and retry logic
#[derive(Debug)]
pub struct HttpClient {
    agent: Agent,
    config: ScraperConfig,
    last_request_time: Option<Instant>,
}

impl HttpClient {
    #[inline]
    pub fn new(config: ScraperConfig) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .user_agent(&config.user_agent)
            .build()
            .into();

        Self {
            agent,
            config,
            last_request_time: None,
        }
    }

    /// Perform an HTTP GET request with rate limiting and retry logic
    #[inline]
    pub fn get(&mut self, url: &str) -> anyhow::Result<String> {
        self.apply_rate_limit();

        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                debug!("Retrying request to {} (attempt {})", url, attempt + 1);
                sleep(Duration::from_secs(self.config.retry_delay_seconds));
            }

            match self.try_get(url) {
                Ok(response) => {
                    debug!("Successfully fetched {} (attempt {})", url, attempt + 1);
                    return Ok(response);
                }
                Err(e) if is_retryable_error(&e) && attempt < self.config.max_retries => {
                    warn!("Retryable error for {}: {}", url, e);
                    last_error = Some(e);
                }
                Err(e) => {
                    error!("Non-retryable error for {}: {}", url, e);
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("All retry attempts failed")))
    }

    fn apply_rate_limit(&mut self) {
        if let Some(last_time) = self.last_request_time {
            let elapsed = last_time.elapsed();
            let rate_limit_duration = Duration::from_millis(self.config.rate_limit_ms);

            if elapsed < rate_limit_duration {
                let sleep_duration = rate_limit_duration - elapsed;
                debug!("Rate limiting: sleeping for {:?}", sleep_duration);
                sleep(sleep_duration);
            }
        }

        self.last_request_time = Some(Instant::now());
    }

    fn try_get(&self, url: &str) -> anyhow::Result<String> {
        debug!("Making HTTP GET request to: {}", url);

        match self.agent.get(url).call() {
            Ok(mut response) => response
                .body_mut()
                .read_to_string()
                .with_context(|| format!("Failed to read response body from {}", url)),
            Err(ureq::Error::StatusCode(status)) => {
                debug!("HTTP request failed with status {}: {}", status, url);
                Err(anyhow!("HTTP error {}", status))
            }
            Err(e) => Err(anyhow::Error::from(e))
                .with_context(|| format!("Failed to make HTTP request to {}", url)),
        }
    }
}

/// Check if an error is retryable (network timeouts, 429 and 5xx errors)
fn is_retryable_error(error: &anyhow::Error) -> bool {
    let error_str = format!("{:#}", error).to_lowercase();

    error_str.contains("timeout")
        || error_str.contains("timed out")
        || error_str.contains("connection")
        || error_str.contains("network")
        || error_str.contains("http error 5")
        || error_str.contains("http error 429")
}

/// A headline link found on the section page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Headline {
    pub title: String,
    pub url: Url,
}

/// Scrapes a news section page and the articles it links to
#[derive(Debug)]
pub struct NewsScraper {
    http_client: HttpClient,
    news_url: Url,
    headline_selector: Selector,
    story_selector: Selector,
    max_articles: usize,
}

impl NewsScraper {
    #[inline]
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let news_url = Url::parse(&config.news_url)
            .map_err(|e| QaError::Config(format!("Invalid news URL {}: {}", config.news_url, e)))?;
        let headline_selector = parse_selector(&config.headline_selector)?;
        let story_selector = parse_selector(&config.story_selector)?;

        Ok(Self {
            http_client: HttpClient::new(config.clone()),
            news_url,
            headline_selector,
            story_selector,
            max_articles: config.max_articles,
        })
    }

    /// Fetch the section page and every article it links to
    #[inline]
    pub fn scrape(&mut self) -> Result<Vec<Document>> {
        info!("Fetching headlines from {}", self.news_url);

        let listing = self
            .http_client
            .get(self.news_url.as_str())
            .map_err(|e| QaError::Scrape(format!("{}: {:#}", self.news_url, e)))?;

        let mut headlines = extract_headlines(&listing, &self.news_url, &self.headline_selector);
        if headlines.is_empty() {
            return Err(QaError::Scrape(format!(
                "{}: no headlines matched the headline selector",
                self.news_url
            )));
        }
        if self.max_articles > 0 {
            headlines.truncate(self.max_articles);
        }

        info!("Found {} headlines", headlines.len());

        let bar = ProgressBar::new(headlines.len() as u64).with_style(
            ProgressStyle::with_template("{spinner} [{pos}/{len}] Scraping {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        let mut documents = Vec::with_capacity(headlines.len());
        for headline in headlines {
            bar.set_message(headline.title.clone());

            let html = self
                .http_client
                .get(headline.url.as_str())
                .map_err(|e| QaError::Scrape(format!("{}: {:#}", headline.url, e)))?;
            let story = extract_story(&html, &self.story_selector).ok_or_else(|| {
                QaError::Scrape(format!(
                    "{}: no story text matched the story selector",
                    headline.url
                ))
            })?;

            documents.push(Document {
                title: prune_text(&headline.title),
                url: headline.url.to_string(),
                content: prune_text(&story),
            });
            bar.inc(1);
        }
        bar.finish_and_clear();

        info!("Scraped {} articles", documents.len());
        Ok(documents)
    }
}

impl DocumentSource for NewsScraper {
    #[inline]
    fn fetch_documents(&mut self) -> Result<Vec<Document>> {
        self.scrape()
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| QaError::Config(format!("Invalid CSS selector '{}': {:?}", selector, e)))
}

/// Extract headline titles and absolute article URLs from a section page
#[inline]
pub fn extract_headlines(html: &str, page_url: &Url, selector: &Selector) -> Vec<Headline> {
    let document = Html::parse_document(html);

    document
        .select(selector)
        .filter_map(|element| {
            let href = element.value().attr("href")?;
            let url = match page_url.join(href) {
                Ok(url) => url,
                Err(e) => {
                    debug!("Failed to resolve headline link '{}': {}", href, e);
                    return None;
                }
            };
            let title = element.text().collect::<String>().trim().to_string();
            Some(Headline { title, url })
        })
        .collect()
}

/// Text content of the first story element, trimmed
#[inline]
pub fn extract_story(html: &str, selector: &Selector) -> Option<String> {
    let document = Html::parse_document(html);
    let story = document.select(selector).next()?;
    Some(story.text().collect::<String>().trim().to_string())
}
