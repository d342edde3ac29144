//! Long-term retrieval over past exchanges.
//!
//! Every completed turn is indexed as one unit (`user: <q>, assistant: <a>`).
//! The `search_vector_db` tool queries the index and condenses the hits with
//! the retrieval model.

mod lexical;
mod service;
mod vector;

use async_trait::async_trait;

use crate::error::Result;

pub use lexical::InMemoryRetrievalStore;
pub use service::{NO_RELEVANT_INFORMATION, RAG_SYSTEM_PROMPT, RetrievalService, unit_id, unit_text};
pub use vector::{RetrievalBackend, VectorRetrievalStore, connect_retrieval};

/// Index of retrieval units.
#[async_trait]
pub trait RetrievalStore: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// `false` for the no-op store used when no backend is reachable.
    fn is_enabled(&self) -> bool {
        true
    }

    async fn index(&self, text: &str, id: &str) -> Result<()>;

    /// Up to `k` indexed texts, most similar first.
    async fn query(&self, text: &str, k: usize) -> Result<Vec<String>>;
}

/// Stand-in used when the retrieval backend is unavailable: indexes nothing,
/// finds nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRetrievalStore;

#[async_trait]
impl RetrievalStore for NullRetrievalStore {
    fn name(&self) -> &str {
        "null"
    }

    fn is_enabled(&self) -> bool {
        false
    }

    async fn index(&self, _text: &str, _id: &str) -> Result<()> {
        Ok(())
    }

    async fn query(&self, _text: &str, _k: usize) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}
