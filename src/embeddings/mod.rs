// Embeddings module
// Token-bounded chunking and the OpenAI embedding and completion client

pub mod chunking;
pub mod openai;

pub use chunking::{Chunk, ChunkingConfig, chunk_document, chunk_documents, chunk_text};
pub use openai::{CompletionProvider, EmbeddingProvider, OpenAiClient};
