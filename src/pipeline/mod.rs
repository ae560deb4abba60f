// Pipeline module
// Ingestion (scrape, chunk, embed, persist) and query (embed, rank, assemble, complete) runs


use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::Config;
use crate::crawler::DocumentSource;
use crate::embeddings::chunking::chunk_documents;
use crate::embeddings::openai::{CompletionProvider, EmbeddingProvider};
use crate::retrieval::{build_prompt, rank, select_context};
use crate::store::{self, EmbeddingRecord, EmbeddingStore};
use crate::tokenizer::Tokenizer;
use crate::{QaError, Result};

/// Summary of an ingestion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub documents_scraped: usize,
    pub documents_chunked: usize,
    pub chunks_embedded: usize,
    pub embeddings_path: PathBuf,
}

/// Result of a query run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    /// Text generated by the completion model
    pub text: String,
    /// Context the answer was generated from
    pub context: String,
    /// Records in the store when the question was ranked
    pub records_considered: usize,
    /// Nearest records that fit in the context
    pub records_used: usize,
}

/// Scrape, chunk, embed and persist a fresh embedding store.
///
/// The store is only replaced once every chunk has been embedded.
#[inline]
pub fn ingest<S, T, E>(
    config: &Config,
    source: &mut S,
    tokenizer: &T,
    embedder: &E,
) -> Result<IngestReport>
where
    S: DocumentSource + ?Sized,
    T: Tokenizer + ?Sized,
    E: EmbeddingProvider + ?Sized,
{
    let scraped = source.fetch_documents()?;
    let articles_path = config.articles_path();
    store::write_documents(&articles_path, &scraped)?;

    let documents = store::read_documents(&articles_path)?;
    if documents.is_empty() {
        return Err(QaError::EmptyInput(format!(
            "no articles with content in {}",
            articles_path.display()
        )));
    }

    let limit = config.chunking.chunk_token_limit;
    let chunks = chunk_documents(&documents, limit, tokenizer);
    if chunks.is_empty() {
        return Err(QaError::EmptyInput(format!(
            "{} articles produced no chunks within {} tokens",
            documents.len(),
            limit
        )));
    }
    info!(
        "Split {} articles into {} chunks",
        documents.len(),
        chunks.len()
    );

    let texts: Vec<String> = chunks.iter().map(|chunk| chunk.content.clone()).collect();
    let embeddings = embedder.embed(&texts)?;
    if embeddings.len() != chunks.len() {
        return Err(QaError::Provider(format!(
            "received {} embeddings for {} chunks",
            embeddings.len(),
            chunks.len()
        )));
    }

    let records: Vec<EmbeddingRecord> = chunks
        .into_iter()
        .zip(embeddings)
        .map(|(chunk, embedding)| EmbeddingRecord {
            title: chunk.title,
            content: chunk.content,
            embedding,
        })
        .collect();

    let embedding_store = EmbeddingStore::new(config.embeddings_path());
    embedding_store.save(&records)?;

    Ok(IngestReport {
        documents_scraped: scraped.len(),
        documents_chunked: documents.len(),
        chunks_embedded: records.len(),
        embeddings_path: embedding_store.path().to_path_buf(),
    })
}

/// Answer `question` from the nearest stored chunks
#[inline]
pub fn ask<T, E, C>(
    config: &Config,
    question: &str,
    tokenizer: &T,
    embedder: &E,
    completer: &C,
) -> Result<Answer>
where
    T: Tokenizer + ?Sized,
    E: EmbeddingProvider + ?Sized,
    C: CompletionProvider + ?Sized,
{
    let question = question.trim();
    if question.is_empty() {
        return Err(QaError::EmptyInput("question is blank".to_string()));
    }

    let records = EmbeddingStore::new(config.embeddings_path()).load()?;

    let query_embedding = embedder
        .embed(&[question.to_string()])?
        .into_iter()
        .next()
        .ok_or_else(|| QaError::Provider("no embedding returned for the question".to_string()))?;

    let stored_dimension = records.first().map_or(0, |record| record.embedding.len());
    if query_embedding.len() != stored_dimension {
        warn!(
            "Question embedding has {} dimensions but the store has {}",
            query_embedding.len(),
            stored_dimension
        );
    }

    let ranked = rank(&query_embedding, &records, tokenizer);
    let window = select_context(&ranked, config.retrieval.max_context_tokens);
    if window.records_used == 0 {
        warn!("No stored chunk fits within the context budget");
    }

    info!(
        "Answering with {} of {} chunks ({} tokens of context)",
        window.records_used,
        records.len(),
        window.tokens_used
    );

    let prompt = build_prompt(&window.text, question);
    let text = completer.complete(&prompt, config.retrieval.max_answer_tokens)?;

    Ok(Answer {
        text,
        context: window.text,
        records_considered: records.len(),
        records_used: window.records_used,
    })
}
