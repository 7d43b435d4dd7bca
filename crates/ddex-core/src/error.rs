use std::path::PathBuf;
use thiserror::Error;

/// Core error types for ddex-lsp.
///
/// Errors only ever surface from resource loading (mapping tables, documents
/// on disk). Lookup misses, syntax errors and detection misses are ordinary
/// results, not errors.
///
/// # Examples
///
/// ```
/// use ddex_core::error::{DdexError, Result};
///
/// fn require_uri(uri: &str) -> Result<&str> {
///     if !uri.starts_with("file://") {
///         return Err(DdexError::InvalidUri(uri.into()));
///     }
///     Ok(uri)
/// }
///
/// assert!(require_uri("untitled:1").is_err());
/// ```
#[derive(Error, Debug)]
pub enum DdexError {
    #[error("failed to read tag mapping {}: {source}", path.display())]
    MappingRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse tag mapping {}: {source}", path.display())]
    MappingParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{} is too large: {size} bytes (max: {limit} bytes)", path.display())]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("document not found: {0}")]
    DocumentNotFound(String),

    #[error("invalid URI: {0}")]
    InvalidUri(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for `Result<T, DdexError>`.
pub type Result<T> = std::result::Result<T, DdexError>;
