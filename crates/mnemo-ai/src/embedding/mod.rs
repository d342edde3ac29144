//! Embedding providers for the retrieval index.

mod openai;
mod provider;

pub use openai::OpenAIEmbedding;
pub use provider::{EmbeddingConfig, EmbeddingProvider};
