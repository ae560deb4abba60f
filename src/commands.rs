use anyhow::Context;
use console::style;
use dialoguer::Input;
use std::io::{BufRead, IsTerminal};
use tracing::info;

use crate::Result;
use crate::config::Config;
use crate::crawler::NewsScraper;
use crate::embeddings::OpenAiClient;
use crate::pipeline::{self, Answer, IngestReport};
use crate::tokenizer::Cl100kTokenizer;

const QUESTION_PROMPT: &str = "Please enter your question about NPR news today";

/// Scrape today's news and rebuild the embedding store
#[inline]
pub fn ingest_news(config: &Config) -> Result<IngestReport> {
    info!("Starting ingestion from {}", config.scraper.news_url);

    let mut scraper = NewsScraper::new(&config.scraper)?;
    let tokenizer = Cl100kTokenizer::new()?;
    let client = OpenAiClient::new(&config.openai)?;

    let report = pipeline::ingest(config, &mut scraper, &tokenizer, &client)?;

    eprintln!(
        "{}",
        style(format!(
            "✓ Embedded {} chunks from {} articles",
            report.chunks_embedded, report.documents_chunked
        ))
        .green()
    );
    eprintln!(
        "Embedding store: {}",
        style(report.embeddings_path.display()).cyan()
    );

    Ok(report)
}

/// Ask one question on the console and print the answer to stdout
#[inline]
pub fn ask_question(config: &Config) -> Result<Answer> {
    let question = read_question()?;

    let tokenizer = Cl100kTokenizer::new()?;
    let client = OpenAiClient::new(&config.openai)?;

    let answer = pipeline::ask(config, &question, &tokenizer, &client, &client)?;
    println!("{}", answer.text.trim());

    Ok(answer)
}

fn read_question() -> Result<String> {
    if std::io::stdin().is_terminal() {
        let question: String = Input::new()
            .with_prompt(QUESTION_PROMPT)
            .interact_text()
            .context("Failed to read question")?;
        return Ok(question);
    }

    eprintln!("{}", QUESTION_PROMPT);
    let mut question = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut question)
        .context("Failed to read question from stdin")?;
    Ok(question)
}
