use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::RetrievalStore;
use crate::error::Result;

/// Process-local index ranked by word overlap with the query.
///
/// Used by tests and offline sessions where no embedding backend exists.
#[derive(Default)]
pub struct InMemoryRetrievalStore {
    units: RwLock<Vec<(String, String)>>,
}

impl InMemoryRetrievalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.units.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.read().is_empty()
    }

    /// Indexed `(id, text)` pairs in insertion order.
    pub fn units(&self) -> Vec<(String, String)> {
        self.units.read().clone()
    }
}

fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[async_trait]
impl RetrievalStore for InMemoryRetrievalStore {
    fn name(&self) -> &str {
        "in-memory"
    }

    async fn index(&self, text: &str, id: &str) -> Result<()> {
        let mut units = self.units.write();
        if !units.iter().any(|(existing, _)| existing == id) {
            units.push((id.to_string(), text.to_string()));
        }
        Ok(())
    }

    async fn query(&self, text: &str, k: usize) -> Result<Vec<String>> {
        let query = words(text);
        if query.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let units = self.units.read();
        let mut scored: Vec<(usize, usize, &str)> = units
            .iter()
            .enumerate()
            .filter_map(|(position, (_, unit))| {
                let overlap = words(unit).intersection(&query).count();
                (overlap > 0).then_some((overlap, position, unit.as_str()))
            })
            .collect();
        // Highest overlap first, newest first on ties.
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(_, _, unit)| unit.to_string())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_query_ranks_by_overlap() {
        let store = InMemoryRetrievalStore::new();
        store.index("user: I like hiking, assistant: Nice", "msg_1").await.unwrap();
        store.index("user: my dog is Rex, assistant: Cute dog", "msg_2").await.unwrap();
        store.index("user: hiking in the alps with my dog, assistant: Fun", "msg_3").await.unwrap();

        let hits = store.query("dog hiking", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].contains("alps"));
    }

    #[tokio::test]
    async fn test_query_without_overlap_is_empty() {
        let store = InMemoryRetrievalStore::new();
        store.index("user: hello, assistant: hi", "msg_1").await.unwrap();
        assert!(store.query("quantum chromodynamics", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_index_ignores_duplicate_ids() {
        let store = InMemoryRetrievalStore::new();
        store.index("first", "msg_1").await.unwrap();
        store.index("second", "msg_1").await.unwrap();
        assert_eq!(store.len(), 1);
    }
}
