//! Mnemo Storage - Low-level storage layer
//!
//! This crate provides the durable persistence layer for Mnemo, using redb as
//! the embedded database. It exposes byte-level APIs; typed records and their
//! serialization live in `mnemo-ai`.
//!
//! # Tables
//!
//! - `user_profile` - The single mutable user profile row
//! - `messages` - Append-only question/answer log, keyed by session
//! - `summaries` - Append-only abstractive summary log, keyed by session
//! - `retrieval_documents` - Text of every indexed retrieval unit
//! - `retrieval_vectors` - Embeddings backing the HNSW index
//!
//! Every table is opened (created if missing) when the storage is constructed,
//! so opening an existing database is idempotent.

pub mod keys;
pub mod session_log;
pub mod simple_storage;
pub mod vector;

use anyhow::Result;
use redb::Database;
use std::path::Path;
use std::sync::Arc;

pub use session_log::{LogEntry, SessionLogStorage};
pub use simple_storage::SimpleStorage;
pub use vector::{VectorConfig, VectorStorage};

crate::define_simple_storage! {
    /// Single-row user profile storage.
    pub struct ProfileStorage { table: "user_profile" }
}

impl ProfileStorage {
    /// Key of the one profile row in the deployment.
    pub const DEFAULT_KEY: &'static str = "default";
}

mod documents {
    crate::define_simple_storage! {
        /// Text blobs of indexed retrieval units, keyed by unit id.
        pub struct RetrievalDocumentStorage { table: "retrieval_documents" }
    }
}

pub use documents::RetrievalDocumentStorage;

/// Central storage manager that initializes all storage subsystems
pub struct Storage {
    db: Arc<Database>,
    pub profile: ProfileStorage,
    pub messages: SessionLogStorage,
    pub summaries: SessionLogStorage,
    pub documents: RetrievalDocumentStorage,
}

impl Storage {
    /// Create a new storage instance at the given path.
    ///
    /// This will create the database file if it doesn't exist and initialize
    /// all required tables.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let db = Arc::new(Database::create(path.as_ref())?);

        let profile = ProfileStorage::new(db.clone())?;
        let messages = SessionLogStorage::new(db.clone(), "messages")?;
        let summaries = SessionLogStorage::new(db.clone(), "summaries")?;
        let documents = RetrievalDocumentStorage::new(db.clone())?;

        Ok(Self {
            db,
            profile,
            messages,
            summaries,
            documents,
        })
    }

    /// Open the vector index that shares this database.
    pub fn vectors(&self, config: VectorConfig) -> Result<VectorStorage> {
        VectorStorage::new(self.db.clone(), config)
    }

    /// Get a reference to the underlying database
    pub fn get_db(&self) -> Arc<Database> {
        self.db.clone()
    }
}
