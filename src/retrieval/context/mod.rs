
use tracing::debug;

use super::ranking::RankedRecord;

/// The records chosen for a prompt and the text built from them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextWindow {
    /// Selected contents in ranked order, each prefixed with a newline
    pub text: String,
    /// Number of leading ranked records included
    pub records_used: usize,
    /// Summed token counts of the included records
    pub tokens_used: usize,
}

/// Greedily take the nearest records while the running token count stays under `max_tokens`.
///
/// Each record's tokens are added before the check, so the record that brings
/// the total to `max_tokens` or beyond is left out and selection stops there.
#[inline]
pub fn select_context(ranked: &[RankedRecord], max_tokens: usize) -> ContextWindow {
    let mut window = ContextWindow::default();
    let mut current_tokens: usize = 0;

    for record in ranked {
        if current_tokens >= max_tokens {
            break;
        }

        current_tokens = current_tokens.saturating_add(record.token_count);
        if current_tokens < max_tokens {
            window.text.push('\n');
            window.text.push_str(&record.content);
            window.records_used += 1;
            window.tokens_used = current_tokens;
        }
    }

    debug!(
        "Selected {} of {} records for context ({} tokens, budget {})",
        window.records_used,
        ranked.len(),
        window.tokens_used,
        max_tokens
    );

    window
}

/// Concatenated context text for `ranked` under `max_tokens`
#[inline]
pub fn assemble_context(ranked: &[RankedRecord], max_tokens: usize) -> String {
    select_context(ranked, max_tokens).text
}

/// Prompt asking the completion model to answer from the assembled context
#[inline]
pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "Answer the question based on the context below. The context came from news articles. \
         Answer should details around names, locations, timelines. And if the question can't be \
         answered based on the context, say \"I don't know\"\n\nContext: {context}\n\n---\n\n\
         Question: {question}\nAnswer:"
    )
}
