//! Document links over every documented tag.

use crate::config::DdexConfig;
use crate::document::{ServerState, ensure_document_loaded};
use ddex_core::scan_mapped_tags;
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_lsp_server::Client;
use tower_lsp_server::ls_types::{DocumentLink, DocumentLinkParams, Range, Uri};

/// A documented tag occurrence as reported to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappedTag {
    pub name: String,
    /// Byte offset just past `<`.
    pub offset: usize,
    /// Byte length of the name as written, prefix included.
    pub length: usize,
    pub range: Range,
    pub url: String,
}

/// Scans an open document against the current mapping snapshot.
///
/// Returns an empty list for unknown documents.
pub fn mapped_tags(state: &ServerState, uri: &Uri) -> Vec<MappedTag> {
    let Some(doc) = state.get_document(uri) else {
        return vec![];
    };
    let mapping = state.mapping.snapshot();

    scan_mapped_tags(&doc.content, &mapping)
        .filter_map(|occ| {
            let url = mapping.lookup(&occ.local_name)?.to_string();
            Some(MappedTag {
                range: doc.line_index.range(&doc.content, occ.offset, occ.end()),
                name: occ.local_name,
                offset: occ.offset,
                length: occ.len,
                url,
            })
        })
        .collect()
}

/// Handles `textDocument/documentLink`.
pub async fn handle_document_links(
    state: Arc<ServerState>,
    params: DocumentLinkParams,
    client: Client,
    config: Arc<RwLock<DdexConfig>>,
) -> Vec<DocumentLink> {
    let uri = &params.text_document.uri;

    if !config.read().await.links.enabled {
        return vec![];
    }
    if !ensure_document_loaded(uri, Arc::clone(&state), client, config).await {
        tracing::warn!("Could not load document for links: {:?}", uri);
        return vec![];
    }

    let links: Vec<DocumentLink> = mapped_tags(&state, uri)
        .into_iter()
        .filter_map(|tag| {
            let target = match Uri::from_str(&tag.url) {
                Ok(target) => target,
                Err(_) => {
                    tracing::debug!("skipping unparsable URL for {}: {}", tag.name, tag.url);
                    return None;
                }
            };
            Some(DocumentLink {
                range: tag.range,
                target: Some(target),
                tooltip: Some(format!("DDEX documentation for {}", tag.name)),
                data: None,
            })
        })
        .collect();

    tracing::debug!("{} document links for {:?}", links.len(), uri);
    links
}
