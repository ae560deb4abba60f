
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::crawler::Document;
use crate::tokenizer::Tokenizer;

/// Literal boundary between sentences
pub const SENTENCE_SEPARATOR: &str = ". ";

/// A token-bounded slice of one document, ready for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub title: String,
    pub url: String,
    pub content: String,
    /// Token length of `content`
    pub token_count: usize,
}

/// Configuration for content chunking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Documents longer than this many tokens are split into chunks no larger than it
    pub chunk_token_limit: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_token_limit: 1000,
        }
    }
}

/// Split text into chunks of whole sentences, each at most `limit` tokens.
///
/// Sentences are measured with a leading space and packed greedily in order.
/// Each kept sentence also reserves one token for the separator it is rejoined
/// with. A sentence that alone exceeds `limit` is dropped.
#[inline]
pub fn chunk_text<T: Tokenizer + ?Sized>(text: &str, limit: usize, tokenizer: &T) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut tokens_so_far = 0;

    for sentence in text.split(SENTENCE_SEPARATOR) {
        let token_length = tokenizer.count(&format!(" {}", sentence));

        if tokens_so_far + token_length > limit && !current.is_empty() {
            chunks.push(join_sentences(&current));
            current.clear();
            tokens_so_far = 0;
        }

        if token_length > limit {
            debug!(
                "Dropping sentence of {} tokens (limit {})",
                token_length, limit
            );
            continue;
        }

        current.push(sentence);
        tokens_so_far += token_length + 1;
    }

    if !current.is_empty() {
        chunks.push(join_sentences(&current));
    }

    chunks
}

fn join_sentences(sentences: &[&str]) -> String {
    let mut joined = sentences.join(SENTENCE_SEPARATOR);
    joined.push('.');
    joined
}

/// Chunk one document, keeping it whole when it already fits within `limit`
#[inline]
pub fn chunk_document<T: Tokenizer + ?Sized>(
    document: &Document,
    limit: usize,
    tokenizer: &T,
) -> Vec<Chunk> {
    if document.content.trim().is_empty() {
        return Vec::new();
    }

    let token_count = tokenizer.count(&document.content);
    if token_count <= limit {
        return vec![Chunk {
            title: document.title.clone(),
            url: document.url.clone(),
            content: document.content.clone(),
            token_count,
        }];
    }

    chunk_text(&document.content, limit, tokenizer)
        .into_iter()
        .map(|content| Chunk {
            title: document.title.clone(),
            url: document.url.clone(),
            token_count: tokenizer.count(&content),
            content,
        })
        .collect()
}

/// Chunk every document in order
#[inline]
pub fn chunk_documents<T: Tokenizer + ?Sized>(
    documents: &[Document],
    limit: usize,
    tokenizer: &T,
) -> Vec<Chunk> {
    let chunks: Vec<Chunk> = documents
        .iter()
        .flat_map(|document| chunk_document(document, limit, tokenizer))
        .collect();

    debug!(
        "Chunked {} documents into {} chunks (avg {} tokens)",
        documents.len(),
        chunks.len(),
        chunks.iter().map(|c| c.token_count).sum::<usize>() / chunks.len().max(1)
    );

    chunks
}
