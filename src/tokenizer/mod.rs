
use std::fmt;

use tiktoken_rs::CoreBPE;
use tracing::debug;

use crate::{QaError, Result};

/// Maps text to the token ids that drive every budget decision in the pipeline
pub trait Tokenizer {
    /// Encode text into an ordered sequence of token ids
    fn encode(&self, text: &str) -> Vec<u32>;

    /// Number of tokens `text` encodes to
    #[inline]
    fn count(&self, text: &str) -> usize {
        self.encode(text).len()
    }
}

/// `cl100k_base` byte-pair encoding, the vocabulary shared by the OpenAI embedding models
pub struct Cl100kTokenizer {
    bpe: CoreBPE,
}

impl Cl100kTokenizer {
    #[inline]
    pub fn new() -> Result<Self> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| QaError::Config(format!("Failed to load cl100k_base encoding: {e}")))?;
        debug!("Loaded cl100k_base tokenizer");
        Ok(Self { bpe })
    }
}

impl Tokenizer for Cl100kTokenizer {
    // Special tokens are encoded as ordinary text.
    #[inline]
    fn encode(&self, text: &str) -> Vec<u32> {
        self.bpe.encode_ordinary(text)
    }
}

impl fmt::Debug for Cl100kTokenizer {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cl100kTokenizer").finish_non_exhaustive()
    }
}
