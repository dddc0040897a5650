use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReferenceError>;

#[derive(Error, Debug)]
pub enum ReferenceError {
    #[error("Catalog '{0}' is not initialized; refresh it before querying")]
    NotInitialized(String),

    #[error("Catalog fetch failed for {url}: {message}")]
    FetchFailed { url: String, message: String },

    #[error("Catalog parse failed: {0}")]
    ParseFailed(String),

    #[error("Vector store error: {0}")]
    VectorStore(#[from] tariff_vector_store::VectorStoreError),

    #[error("System store error: {0}")]
    SystemStore(#[from] tariff_system_store::SystemStoreError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
