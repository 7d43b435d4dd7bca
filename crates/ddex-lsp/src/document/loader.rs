//! Asynchronous file loading for documents and the tag mapping.
//!
//! Everything here reads through `tokio::fs` so the server loop never blocks
//! on disk. Documents are loaded on demand when a request names a file the
//! client never opened (cold start); the mapping is loaded at startup and on
//! `ddex.reloadMapping`.

use ddex_core::error::{DdexError, Result};
use ddex_core::TagMap;
use std::path::Path;
use tower_lsp_server::ls_types::Uri;

/// Maximum document size in bytes (64MB).
///
/// Large catalogue deliveries exceed typical XML sizes, but anything beyond
/// this is rejected.
pub const MAX_FILE_SIZE: u64 = 64_000_000;

/// Documents above this size (8MB) are loaded with a warning.
const LARGE_FILE_THRESHOLD: u64 = 8_000_000;

/// Reads a document from disk with size checks.
///
/// # Errors
///
/// - `DdexError::FileTooLarge` - file exceeds [`MAX_FILE_SIZE`]
/// - `DdexError::Io` - not found, permission denied, non-UTF-8 content
pub async fn read_document(path: &Path) -> Result<String> {
    let metadata = tokio::fs::metadata(path).await.map_err(|e| {
        match e.kind() {
            std::io::ErrorKind::NotFound => tracing::debug!("file not found: {:?}", path),
            std::io::ErrorKind::PermissionDenied => {
                tracing::warn!("permission denied: {:?}", path);
            }
            _ => tracing::error!("IO error reading metadata for {:?}: {}", path, e),
        }
        DdexError::Io(e)
    })?;

    let size = metadata.len();
    if size > MAX_FILE_SIZE {
        tracing::error!(
            "document exceeds maximum size: {} bytes (limit: {} bytes)",
            size,
            MAX_FILE_SIZE
        );
        return Err(DdexError::FileTooLarge {
            path: path.to_path_buf(),
            size,
            limit: MAX_FILE_SIZE,
        });
    }
    if size > LARGE_FILE_THRESHOLD {
        tracing::warn!("document is large: {} bytes for {:?}", size, path);
    }

    let content = tokio::fs::read_to_string(path).await?;
    tracing::debug!("loaded document {:?} ({} bytes)", path, content.len());
    Ok(content)
}

/// Loads document content for a `file://` URI.
///
/// # Errors
///
/// - `DdexError::InvalidUri` - URI is not a file URI
/// - see [`read_document`]
pub async fn load_document_from_disk(uri: &Uri) -> Result<String> {
    let Some(path) = uri.to_file_path() else {
        tracing::debug!("cannot load non-file URI: {:?}", uri);
        return Err(DdexError::InvalidUri(format!("{:?}", uri)));
    };

    read_document(&path).await
}

/// Loads the tag mapping from a JSON file.
pub async fn load_mapping(path: &Path) -> Result<TagMap> {
    let content =
        tokio::fs::read_to_string(path)
            .await
            .map_err(|source| DdexError::MappingRead {
                path: path.to_path_buf(),
                source,
            })?;

    TagMap::from_json_str(&content).map_err(|source| DdexError::MappingParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads the tag mapping, degrading to an empty table on failure.
pub async fn load_mapping_or_empty(path: &Path) -> TagMap {
    match load_mapping(path).await {
        Ok(map) => {
            tracing::info!("loaded {} tag mappings from {}", map.len(), path.display());
            map
        }
        Err(e) => {
            tracing::warn!("{}; continuing with an empty tag mapping", e);
            TagMap::new()
        }
    }
}
