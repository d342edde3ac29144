//! Embedding vectors for retrieval units.
//!
//! Vectors are persisted to redb and mirrored in an in-memory HNSW index
//! that is rebuilt whenever the storage is opened. Retrieval units are
//! append-only, so a unit id is indexed at most once.

use anyhow::Result;
use hnsw_rs::prelude::*;
use parking_lot::RwLock;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::collections::HashMap;
use std::sync::Arc;

type UnitIndex = Hnsw<'static, f32, DistCosine>;

const VECTOR_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("retrieval_vectors");

/// HNSW parameters for the retrieval index.
#[derive(Debug, Clone)]
pub struct VectorConfig {
    /// Embedding dimension (1536 for text-embedding-3-small)
    pub dimension: usize,
    pub max_connections: usize,
    pub ef_construction: usize,
    pub max_elements: usize,
    /// Search width used by [`VectorStorage::search`]
    pub ef_search: usize,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            dimension: 1536,
            max_connections: 16,
            ef_construction: 200,
            max_elements: 100_000,
            ef_search: 64,
        }
    }
}

impl VectorConfig {
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }
}

#[derive(Default)]
struct IdMaps {
    by_unit: HashMap<String, usize>,
    by_slot: HashMap<usize, String>,
}

/// Vector index over retrieval unit ids.
pub struct VectorStorage {
    db: Arc<Database>,
    config: VectorConfig,
    index: RwLock<UnitIndex>,
    ids: RwLock<IdMaps>,
}

impl VectorStorage {
    /// Open the vector table and load every persisted vector into the index.
    pub fn new(db: Arc<Database>, config: VectorConfig) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(VECTOR_TABLE)?;
        write_txn.commit()?;

        let index = RwLock::new(Self::empty_index(&config));
        let storage = Self {
            db,
            config,
            index,
            ids: RwLock::new(IdMaps::default()),
        };

        storage.rebuild_index()?;
        Ok(storage)
    }

    pub fn dimension(&self) -> usize {
        self.config.dimension
    }

    /// Index `vector` under `unit_id`.
    ///
    /// Returns `false` when the unit was already indexed; the stored vector is
    /// left as is.
    pub fn add(&self, unit_id: &str, vector: &[f32]) -> Result<bool> {
        self.check_dimension("Vector", vector)?;

        if self.has_vector(unit_id) {
            return Ok(false);
        }

        self.persist(unit_id, vector)?;

        let mut ids = self.ids.write();
        let slot = ids.by_slot.len();
        self.index.write().insert((vector, slot));
        ids.by_unit.insert(unit_id.to_string(), slot);
        ids.by_slot.insert(slot, unit_id.to_string());

        Ok(true)
    }

    /// Nearest units to `query` as `(unit_id, cosine distance)`, closest first.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<(String, f32)>> {
        self.check_dimension("Query", query)?;
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let ids = self.ids.read();
        if ids.by_slot.is_empty() {
            return Ok(Vec::new());
        }

        let index = self.index.read();
        let ef = self.config.ef_search.max(top_k);
        let mut results: Vec<(String, f32)> = index
            .search(query, top_k, ef)
            .into_iter()
            .filter_map(|item| {
                let unit_id = ids.by_slot.get(&item.d_id)?;
                Some((unit_id.clone(), item.distance))
            })
            .collect();
        results.sort_by(|a, b| a.1.total_cmp(&b.1));
        Ok(results)
    }

    pub fn has_vector(&self, unit_id: &str) -> bool {
        self.ids.read().by_unit.contains_key(unit_id)
    }

    pub fn count(&self) -> usize {
        self.ids.read().by_unit.len()
    }

    fn check_dimension(&self, what: &str, vector: &[f32]) -> Result<()> {
        if vector.len() != self.config.dimension {
            anyhow::bail!(
                "{} dimension mismatch: expected {}, got {}",
                what,
                self.config.dimension,
                vector.len()
            );
        }
        Ok(())
    }

    fn empty_index(config: &VectorConfig) -> UnitIndex {
        Hnsw::new(
            config.max_connections,
            config.max_elements,
            16,
            config.ef_construction,
            DistCosine,
        )
    }

    fn persist(&self, unit_id: &str, vector: &[f32]) -> Result<()> {
        let bytes = bincode::serde::encode_to_vec(vector, bincode::config::standard())?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(VECTOR_TABLE)?;
            table.insert(unit_id, bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn rebuild_index(&self) -> Result<()> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(VECTOR_TABLE)?;
        let mut stored: Vec<(String, Vec<f32>)> = Vec::new();
        for item in table.iter()? {
            let (key, value) = item?;
            let (vector, _): (Vec<f32>, usize) =
                bincode::serde::decode_from_slice(value.value(), bincode::config::standard())?;
            if vector.len() != self.config.dimension {
                tracing::warn!(
                    unit_id = key.value(),
                    "Skipping stored vector with dimension {}",
                    vector.len()
                );
                continue;
            }
            stored.push((key.value().to_string(), vector));
        }
        drop(read_txn);

        let mut ids = self.ids.write();
        let mut index = self.index.write();
        *index = Self::empty_index(&self.config);
        *ids = IdMaps::default();

        for (slot, (unit_id, vector)) in stored.into_iter().enumerate() {
            index.insert((vector.as_slice(), slot));
            ids.by_unit.insert(unit_id.clone(), slot);
            ids.by_slot.insert(slot, unit_id);
        }

        tracing::info!("Rebuilt retrieval index with {} vectors", ids.by_unit.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_config() -> VectorConfig {
        VectorConfig {
            dimension: 4,
            max_connections: 8,
            ef_construction: 100,
            max_elements: 1000,
            ef_search: 50,
        }
    }

    fn open(path: &std::path::Path) -> VectorStorage {
        let db = Arc::new(Database::create(path).unwrap());
        VectorStorage::new(db, test_config()).unwrap()
    }

    #[test]
    fn test_add_and_search_closest_first() {
        let temp_dir = tempdir().unwrap();
        let storage = open(&temp_dir.path().join("test.db"));
        storage.add("msg_1", &[1.0, 0.0, 0.0, 0.0]).unwrap();
        storage.add("msg_2", &[0.0, 1.0, 0.0, 0.0]).unwrap();
        storage.add("msg_3", &[0.9, 0.1, 0.0, 0.0]).unwrap();

        let results = storage.search(&[1.0, 0.0, 0.0, 0.0], 2).unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].0, "msg_1");
    }

    #[test]
    fn test_dimension_validation() {
        let temp_dir = tempdir().unwrap();
        let storage = open(&temp_dir.path().join("test.db"));
        assert!(storage.add("msg_1", &[1.0, 0.0, 0.0]).is_err());
        assert!(storage.search(&[1.0], 1).is_err());
    }

    #[test]
    fn test_add_is_idempotent_per_unit() {
        let temp_dir = tempdir().unwrap();
        let storage = open(&temp_dir.path().join("test.db"));
        assert!(storage.add("msg_1", &[1.0, 0.0, 0.0, 0.0]).unwrap());
        assert!(!storage.add("msg_1", &[0.0, 1.0, 0.0, 0.0]).unwrap());
        assert_eq!(storage.count(), 1);
    }

    #[test]
    fn test_empty_index_returns_nothing() {
        let temp_dir = tempdir().unwrap();
        let storage = open(&temp_dir.path().join("test.db"));
        assert!(storage.search(&[1.0, 0.0, 0.0, 0.0], 3).unwrap().is_empty());
    }

    #[test]
    fn test_vectors_survive_reopen() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");
        {
            let storage = open(&db_path);
            storage.add("msg_1", &[1.0, 0.0, 0.0, 0.0]).unwrap();
            storage.add("msg_2", &[0.0, 0.0, 1.0, 0.0]).unwrap();
        }

        let storage = open(&db_path);
        assert_eq!(storage.count(), 2);
        assert!(storage.has_vector("msg_2"));
        let results = storage.search(&[0.0, 0.0, 1.0, 0.0], 1).unwrap();
        assert_eq!(results[0].0, "msg_2");
    }
}
