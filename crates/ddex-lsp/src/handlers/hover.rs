//! Hover over a tag name: documentation link or an explicit "unmapped" note.

use crate::config::DdexConfig;
use crate::document::{ServerState, ensure_document_loaded};
use crate::line_index::utf16_to_byte_column;
use ddex_core::resolve_tag_at;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_lsp_server::Client;
use tower_lsp_server::ls_types::{
    Hover, HoverContents, HoverParams, MarkupContent, MarkupKind, Position, Uri,
};

/// Resolves the local tag name at an LSP position of an open document.
pub fn tag_at_position(state: &ServerState, uri: &Uri, position: Position) -> Option<String> {
    let doc = state.get_document(uri)?;
    let line = doc.line(position.line)?;
    let column = utf16_to_byte_column(line, position.character);
    resolve_tag_at(line, column)
}

/// Markdown shown for a tag.
pub fn hover_markdown(tag: &str, url: Option<&str>) -> String {
    match url {
        Some(url) => format!("**`{tag}`**\n\n[DDEX documentation]({url})"),
        None => format!("No DDEX documentation mapped for `{tag}`"),
    }
}

/// Handles hover requests.
pub async fn handle_hover(
    state: Arc<ServerState>,
    params: HoverParams,
    client: Client,
    config: Arc<RwLock<DdexConfig>>,
) -> Option<Hover> {
    let uri = &params.text_document_position_params.text_document.uri;
    let position = params.text_document_position_params.position;

    if !ensure_document_loaded(uri, Arc::clone(&state), client, config).await {
        tracing::warn!("Could not load document for hover: {:?}", uri);
        return None;
    }

    let tag = tag_at_position(&state, uri, position)?;
    let mapping = state.mapping.snapshot();
    let url = mapping.lookup(&tag);
    tracing::trace!("hover {} -> {:?}", tag, url);

    Some(Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: hover_markdown(&tag, url),
        }),
        range: None,
    })
}
