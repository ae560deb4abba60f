// Retrieval module
// Ranks stored chunks against a question and packs the best into a prompt context

pub mod context;
pub mod ranking;

use serde::{Deserialize, Serialize};

pub use context::{ContextWindow, assemble_context, build_prompt, select_context};
pub use ranking::{RankedRecord, cosine_distance, cosine_similarity, rank};

/// Token budgets for the query run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Ceiling on the summed token counts of the chunks placed in the context
    pub max_context_tokens: usize,
    /// Maximum tokens the completion model may generate
    pub max_answer_tokens: usize,
}

impl Default for RetrievalConfig {
    #[inline]
    fn default() -> Self {
        Self {
            max_context_tokens: 2500,
            max_answer_tokens: 150,
        }
    }
}
