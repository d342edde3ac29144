use std::sync::Arc;

use async_trait::async_trait;
use mnemo_storage::{RetrievalDocumentStorage, Storage, VectorConfig, VectorStorage};

use super::{InMemoryRetrievalStore, NullRetrievalStore, RetrievalStore};
use crate::embedding::{EmbeddingProvider, OpenAIEmbedding};
use crate::error::{AiError, Result};

/// Embedding-backed retrieval persisted next to the conversation log.
pub struct VectorRetrievalStore {
    embedder: Arc<dyn EmbeddingProvider>,
    vectors: VectorStorage,
    documents: RetrievalDocumentStorage,
}

impl VectorRetrievalStore {
    pub fn open(storage: &Storage, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        let config = VectorConfig::default().with_dimension(embedder.dimension());
        let vectors = storage.vectors(config).map_err(AiError::store)?;
        Ok(Self {
            embedder,
            vectors,
            documents: storage.documents.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.vectors.count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RetrievalStore for VectorRetrievalStore {
    fn name(&self) -> &str {
        self.embedder.model_name()
    }

    async fn index(&self, text: &str, id: &str) -> Result<()> {
        let vector = self.embedder.embed(text).await.map_err(AiError::retrieval)?;
        // Text first, so a vector never points at a missing document.
        self.documents
            .put_raw(id, text.as_bytes())
            .map_err(AiError::store)?;
        self.vectors.add(id, &vector).map_err(AiError::retrieval)?;
        Ok(())
    }

    async fn query(&self, text: &str, k: usize) -> Result<Vec<String>> {
        if self.vectors.count() == 0 {
            return Ok(Vec::new());
        }
        let vector = self.embedder.embed(text).await.map_err(AiError::retrieval)?;
        let hits = self.vectors.search(&vector, k).map_err(AiError::retrieval)?;

        let mut texts = Vec::with_capacity(hits.len());
        for (id, _distance) in hits {
            match self.documents.get_raw(&id).map_err(AiError::store)? {
                Some(bytes) => texts.push(String::from_utf8_lossy(&bytes).into_owned()),
                None => tracing::warn!(unit_id = %id, "Indexed vector has no stored text"),
            }
        }
        Ok(texts)
    }
}

/// Which retrieval backend a session should use.
#[derive(Debug, Clone)]
pub enum RetrievalBackend {
    /// OpenAI embeddings plus the on-disk HNSW index.
    Vector {
        api_key: Option<String>,
        embedding_model: String,
        base_url: Option<String>,
    },
    InMemory,
    Disabled,
}

/// Build the configured retrieval store, falling back to the no-op store when
/// the backend cannot be reached.
pub fn connect_retrieval(backend: &RetrievalBackend, storage: &Storage) -> Arc<dyn RetrievalStore> {
    match backend {
        RetrievalBackend::Disabled => Arc::new(NullRetrievalStore),
        RetrievalBackend::InMemory => Arc::new(InMemoryRetrievalStore::new()),
        RetrievalBackend::Vector {
            api_key,
            embedding_model,
            base_url,
        } => {
            let Some(api_key) = api_key.as_deref().filter(|key| !key.trim().is_empty()) else {
                tracing::warn!("No embedding API key configured; long-term retrieval disabled");
                return Arc::new(NullRetrievalStore);
            };

            let mut embedder = OpenAIEmbedding::new(api_key, Some(embedding_model.clone()));
            if let Some(url) = base_url {
                embedder = embedder.with_base_url(url.clone());
            }

            match VectorRetrievalStore::open(storage, Arc::new(embedder)) {
                Ok(store) => {
                    tracing::info!(units = store.len(), "Retrieval index ready");
                    Arc::new(store)
                }
                Err(error) => {
                    tracing::warn!(%error, "Retrieval index unavailable; continuing without it");
                    Arc::new(NullRetrievalStore)
                }
            }
        }
    }
}
