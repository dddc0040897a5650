use crate::embeddings::Embedder;
use crate::error::Result;
use crate::index::VectorIndex;
use crate::types::{AttributeFilter, CodeMatch, ReferenceRecord, SchemaDescriptor};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Code index over reference records.
///
/// Holds the records, their schema, and the similarity index side by side.
/// All content is replaced in bulk via [`VectorStore::rebuild`]; there are no
/// partial updates.
pub struct VectorStore {
    embedder: Arc<dyn Embedder>,
    index: VectorIndex,
    records: Vec<ReferenceRecord>,
    schema: SchemaDescriptor,
}

/// On-disk shape. Vectors are not persisted; the embedder is deterministic,
/// so load re-embeds the records into an identical index.
#[derive(Serialize, Deserialize)]
struct StoreSnapshot {
    schema: SchemaDescriptor,
    records: Vec<ReferenceRecord>,
}

impl VectorStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        let dimension = embedder.dimension();
        Self {
            embedder,
            index: VectorIndex::new(dimension),
            records: Vec::new(),
            schema: SchemaDescriptor::default(),
        }
    }

    /// Replace all content with `records` under `schema`.
    ///
    /// The new index is built to the side and swapped in only once complete;
    /// a failed rebuild leaves the previous content untouched.
    pub async fn rebuild(
        &mut self,
        records: Vec<ReferenceRecord>,
        schema: SchemaDescriptor,
    ) -> Result<()> {
        log::info!("Rebuilding vector store with {} records", records.len());

        let contents: Vec<&str> = records.iter().map(|r| r.text.as_str()).collect();
        let vectors = self.embedder.embed_batch(&contents).await?;

        let mut index = VectorIndex::new(self.embedder.dimension());
        for vector in vectors {
            index.add(vector)?;
        }

        self.index = index;
        self.records = records;
        self.schema = schema;
        Ok(())
    }

    /// Top-K records closest to `query`, optionally constrained by equality
    /// filters. Filters narrow eligibility before ranking.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&AttributeFilter>,
    ) -> Result<Vec<CodeMatch>> {
        log::debug!("Searching for '{query}' (top_k: {top_k}, filtered: {})", filter.is_some());

        let query_vector = self.embedder.embed(query).await?;
        let hits = self.index.search(&query_vector, top_k, |id| match filter {
            Some(filter) => self.records[id].matches_filter(filter),
            None => true,
        })?;

        Ok(hits
            .into_iter()
            .map(|(id, score)| CodeMatch {
                text: self.records[id].text.clone(),
                attributes: self.records[id].attributes.clone(),
                score,
            })
            .collect())
    }

    pub fn schema(&self) -> &SchemaDescriptor {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Save records and schema to disk.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        log::info!("Saving vector store to {:?}", path.as_ref());
        let snapshot = StoreSnapshot {
            schema: self.schema.clone(),
            records: self.records.clone(),
        };
        let data = serde_json::to_string_pretty(&snapshot)?;
        tokio::fs::write(&path, data).await?;
        Ok(())
    }

    /// Load a snapshot from disk, re-embedding its records.
    pub async fn load(path: impl AsRef<Path>, embedder: Arc<dyn Embedder>) -> Result<Self> {
        log::info!("Loading vector store from {:?}", path.as_ref());
        let data = tokio::fs::read_to_string(&path).await?;
        let snapshot: StoreSnapshot = serde_json::from_str(&data)?;

        let mut store = Self::new(embedder);
        store.rebuild(snapshot.records, snapshot.schema).await?;
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashEmbedder;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn country(name: &str, code: &str, is_reporter: &str) -> ReferenceRecord {
        ReferenceRecord::new(name)
            .with_attribute("countrycode", code)
            .with_attribute("isreporter", is_reporter)
    }

    fn reporter_filter(value: &str) -> AttributeFilter {
        let mut filter = AttributeFilter::new();
        filter.insert("isreporter".to_string(), value.to_string());
        filter
    }

    async fn country_store() -> VectorStore {
        let mut store = VectorStore::new(Arc::new(HashEmbedder::new(64)));
        store
            .rebuild(
                vec![
                    country("Brazil", "076", "1"),
                    country("Brazil", "076", "0"),
                    country("China", "156", "0"),
                ],
                SchemaDescriptor::text_columns(["countrycode", "isreporter"]),
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn exact_text_ranks_first() {
        let store = country_store().await;
        let matches = store.search("Brazil", 3, None).await.unwrap();
        assert_eq!(matches[0].text, "Brazil");
        assert!((matches[0].score - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn only_filtered_records_are_returned() {
        let store = country_store().await;
        let matches = store
            .search("Brazil", 3, Some(&reporter_filter("0")))
            .await
            .unwrap();
        assert!(!matches.is_empty());
        for m in &matches {
            assert_eq!(m.attributes.get("isreporter").map(String::as_str), Some("0"));
        }
    }

    #[tokio::test]
    async fn filtered_top_k_equals_unfiltered_ranking_then_filter() {
        let store = country_store().await;
        let filter = reporter_filter("0");

        let unfiltered = store.search("Brazil", 3, None).await.unwrap();
        let expected: Vec<_> = unfiltered
            .into_iter()
            .filter(|m| m.attributes.get("isreporter").map(String::as_str) == Some("0"))
            .take(1)
            .collect();

        let filtered = store.search("Brazil", 1, Some(&filter)).await.unwrap();
        assert_eq!(filtered, expected);
    }

    #[tokio::test]
    async fn rebuild_replaces_all_content() {
        let mut store = country_store().await;
        assert_eq!(store.len(), 3);

        store
            .rebuild(
                vec![country("Iraq", "368", "0")],
                SchemaDescriptor::text_columns(["countrycode", "isreporter"]),
            )
            .await
            .unwrap();

        assert_eq!(store.len(), 1);
        let matches = store.search("Brazil", 3, None).await.unwrap();
        assert!(matches.iter().all(|m| m.text != "Brazil"));
    }

    #[tokio::test]
    async fn save_then_load_round_trips_search() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("countries.json");

        let store = country_store().await;
        store.save(&path).await.unwrap();

        let loaded = VectorStore::load(&path, Arc::new(HashEmbedder::new(64)))
            .await
            .unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.schema(), store.schema());

        let matches = loaded.search("China", 1, None).await.unwrap();
        assert_eq!(matches[0].attributes.get("countrycode").map(String::as_str), Some("156"));
    }
}
