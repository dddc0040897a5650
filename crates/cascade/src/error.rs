use thiserror::Error;

pub type Result<T> = std::result::Result<T, CascadeError>;

#[derive(Error, Debug)]
pub enum CascadeError {
    /// The mandatory availability query could not complete. This is a
    /// precondition failure, not part of the fallback logic.
    #[error("Primary source unavailable at {url}: {message}")]
    SourceUnavailable { url: String, message: String },

    /// The primary source returned a non-numeric value where a rate was
    /// expected. Surfaced as-is: it indicates an upstream contract
    /// violation worth escalating.
    #[error("Invalid observation at {url}: expected a numeric rate, got '{value}'")]
    InvalidObservation { url: String, value: String },

    #[error("HTTP client error: {0}")]
    Http(String),
}
