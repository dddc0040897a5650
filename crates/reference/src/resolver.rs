use crate::error::{ReferenceError, Result};
use crate::source::ReferenceSource;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tariff_system_store::SystemStore;
use tariff_vector_store::{AttributeFilter, CodeMatch, Embedder, SchemaDescriptor, VectorStore};
use tokio::sync::{Mutex, RwLock};

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Semantic code resolver for one reference catalog.
///
/// Construction is cheap; the index snapshot is loaded once on first use and
/// the handle is meant to be built once per process and shared. No
/// per-request state survives a call.
pub struct CodeResolver<S: ReferenceSource> {
    source: S,
    system_store: Arc<dyn SystemStore>,
    embedder: Arc<dyn Embedder>,
    data_dir: PathBuf,
    http: reqwest::Client,
    state: RwLock<Option<VectorStore>>,
    // At most one rebuild per catalog at a time.
    rebuild_lock: Mutex<()>,
}

impl<S: ReferenceSource> CodeResolver<S> {
    pub fn new(
        source: S,
        system_store: Arc<dyn SystemStore>,
        embedder: Arc<dyn Embedder>,
        data_dir: impl AsRef<Path>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|err| ReferenceError::FetchFailed {
                url: String::new(),
                message: err.to_string(),
            })?;

        Ok(Self {
            source,
            system_store,
            embedder,
            data_dir: data_dir.as_ref().to_path_buf(),
            http,
            state: RwLock::new(None),
            rebuild_lock: Mutex::new(()),
        })
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.json", self.source.table_name()))
    }

    /// Load the persisted index, failing fast when the catalog was never
    /// built. The schema in the system store is what marks the index usable;
    /// without it the snapshot must not be queried.
    async fn ensure_initialized(&self) -> Result<()> {
        if self.state.read().await.is_some() {
            return Ok(());
        }

        let key = self.source.metadata_key();
        let Some(schema_value) = self.system_store.get(key).await? else {
            return Err(ReferenceError::NotInitialized(
                self.source.table_name().to_string(),
            ));
        };
        let schema: SchemaDescriptor = serde_json::from_value(schema_value)?;

        let mut guard = self.state.write().await;
        if guard.is_some() {
            return Ok(());
        }

        let path = self.snapshot_path();
        let store = match VectorStore::load(&path, Arc::clone(&self.embedder)).await {
            Ok(store) => store,
            Err(err) => {
                log::warn!(
                    "Schema exists for '{}' but snapshot {} is unreadable: {err}",
                    self.source.table_name(),
                    path.display()
                );
                return Err(ReferenceError::NotInitialized(
                    self.source.table_name().to_string(),
                ));
            }
        };

        if store.schema() != &schema {
            log::warn!(
                "Schema drift for '{}': system store and snapshot disagree",
                self.source.table_name()
            );
        }

        *guard = Some(store);
        Ok(())
    }

    /// Top-K reference rows closest to `query`, optionally constrained by
    /// attribute equality filters.
    pub async fn find(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&AttributeFilter>,
    ) -> Result<Vec<CodeMatch>> {
        self.ensure_initialized().await?;
        let guard = self.state.read().await;
        let store = guard.as_ref().ok_or_else(|| {
            ReferenceError::NotInitialized(self.source.table_name().to_string())
        })?;
        Ok(store.search(query, top_k, filter).await?)
    }

    /// Fetch the catalog and rebuild the index from it.
    pub async fn refresh(&self) -> Result<usize> {
        let url = self.source.catalog_url();
        log::info!("Fetching catalog '{}' from {url}", self.source.table_name());

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| ReferenceError::FetchFailed {
                url: url.clone(),
                message: err.to_string(),
            })?;
        let body = response.text().await.map_err(|err| ReferenceError::FetchFailed {
            url,
            message: err.to_string(),
        })?;

        self.load_catalog(&body).await
    }

    /// Rebuild the index from an already-fetched catalog document.
    ///
    /// Atomic from a reader's perspective: the fresh store is built and
    /// persisted to the side, then swapped in under the write lock.
    pub async fn load_catalog(&self, body: &str) -> Result<usize> {
        let _rebuild = self.rebuild_lock.lock().await;

        let records = self.source.parse_catalog(body)?;
        let schema = self.derive_schema(&records);

        let mut store = VectorStore::new(Arc::clone(&self.embedder));
        store.rebuild(records, schema.clone()).await?;
        store.save(self.snapshot_path()).await?;

        // The schema write marks the index usable; it goes last.
        self.system_store
            .put(self.source.metadata_key(), serde_json::to_value(&schema)?)
            .await?;

        let count = store.len();
        *self.state.write().await = Some(store);
        log::info!("Catalog '{}' rebuilt with {count} records", self.source.table_name());
        Ok(count)
    }

    /// Remove the index snapshot and its schema. A subsequent `find` fails
    /// with `NotInitialized`, never an empty success.
    pub async fn drop_catalog(&self) -> Result<()> {
        let _rebuild = self.rebuild_lock.lock().await;

        match tokio::fs::remove_file(self.snapshot_path()).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        self.system_store.delete(self.source.metadata_key()).await?;
        *self.state.write().await = None;

        log::info!("Catalog '{}' dropped", self.source.table_name());
        Ok(())
    }

    fn derive_schema(&self, records: &[tariff_vector_store::ReferenceRecord]) -> SchemaDescriptor {
        let mut names: BTreeSet<&str> = BTreeSet::new();
        names.insert(self.source.content_field());
        for record in records {
            names.extend(record.attributes.keys().map(String::as_str));
        }
        SchemaDescriptor::text_columns(names)
    }
}
