//! `workspace/executeCommand` handlers.
//!
//! Commands are the host-glue surface: opening documentation, listing
//! highlight spans, reading the status summary, reloading the mapping and
//! feeding in external validator output.

use crate::config::DdexConfig;
use crate::document::{ServerState, StatusReport, handle_event, load_mapping_or_empty};
use crate::handlers::{diagnostics, hover, links};
use ddex_core::{DiagnosticEntry, DocumentEvent, Evaluation};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_lsp_server::Client;
use tower_lsp_server::ls_types::{Diagnostic, ExecuteCommandParams, MessageType, Position, Uri};

/// Resolve the tag at a position: `{uri, position}` → `{tag, url}`.
pub const OPEN_DOCS: &str = "ddex.openDocs";
/// Documented tag spans: `{uri}` → `[{name, offset, length, range, url}]`.
pub const MAPPED_TAGS: &str = "ddex.mappedTags";
/// Status summary with merged diagnostics: `{uri?}`.
pub const STATUS: &str = "ddex.status";
/// Reload the tag mapping: `{path?}` → `{entries}`.
pub const RELOAD_MAPPING: &str = "ddex.reloadMapping";
/// Schedule an evaluation: `{uri?}`.
pub const REVALIDATE: &str = "ddex.revalidate";
/// Make an open document the active one: `{uri}`.
pub const SET_ACTIVE_DOCUMENT: &str = "ddex.setActiveDocument";
/// Replace external diagnostics: `{uri, diagnostics}`.
pub const SET_EXTERNAL_DIAGNOSTICS: &str = "ddex.setExternalDiagnostics";

/// All commands advertised in the server capabilities.
pub const ALL: &[&str] = &[
    OPEN_DOCS,
    MAPPED_TAGS,
    STATUS,
    RELOAD_MAPPING,
    REVALIDATE,
    SET_ACTIVE_DOCUMENT,
    SET_EXTERNAL_DIAGNOSTICS,
];

#[derive(Debug, Deserialize)]
struct PositionArgs {
    uri: Uri,
    position: Position,
}

#[derive(Debug, Deserialize)]
struct UriArgs {
    uri: Uri,
}

#[derive(Debug, Default, Deserialize)]
struct OptionalUriArgs {
    #[serde(default)]
    uri: Option<Uri>,
}

#[derive(Debug, Default, Deserialize)]
struct ReloadArgs {
    #[serde(default)]
    path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct ExternalDiagnosticsArgs {
    uri: Uri,
    #[serde(default)]
    diagnostics: Vec<Diagnostic>,
}

/// Parses the first command argument.
fn parse_args<T: DeserializeOwned>(params: &ExecuteCommandParams) -> Option<T> {
    let value = params.arguments.first().cloned().unwrap_or(Value::Null);
    match serde_json::from_value(value) {
        Ok(args) => Some(args),
        Err(e) => {
            tracing::warn!("invalid arguments for {}: {}", params.command, e);
            None
        }
    }
}

/// Like [`parse_args`], but a missing or null argument yields `T::default()`.
fn parse_optional_args<T: DeserializeOwned + Default>(params: &ExecuteCommandParams) -> Option<T> {
    if params.arguments.first().is_none_or(Value::is_null) {
        return Some(T::default());
    }
    parse_args(params)
}

/// Handles `workspace/executeCommand`.
pub async fn handle_execute_command(
    state: Arc<ServerState>,
    params: ExecuteCommandParams,
    client: Client,
    config: Arc<RwLock<DdexConfig>>,
) -> Option<Value> {
    match params.command.as_str() {
        OPEN_DOCS => {
            let args: PositionArgs = parse_args(&params)?;
            Some(open_docs(&state, &args.uri, args.position))
        }
        MAPPED_TAGS => {
            let args: UriArgs = parse_args(&params)?;
            serde_json::to_value(links::mapped_tags(&state, &args.uri)).ok()
        }
        STATUS => {
            let args: OptionalUriArgs = parse_optional_args(&params)?;
            let report = status(&state, args.uri, &config).await;
            serde_json::to_value(report).ok()
        }
        RELOAD_MAPPING => {
            let args: ReloadArgs = parse_optional_args(&params)?;
            Some(reload_mapping(&state, args.path, &client, &config).await)
        }
        REVALIDATE => {
            let args: OptionalUriArgs = parse_optional_args(&params)?;
            handle_event(
                DocumentEvent::Revalidate { uri: args.uri },
                state,
                client,
                config,
            )
            .await;
            None
        }
        SET_ACTIVE_DOCUMENT => {
            let args: UriArgs = parse_args(&params)?;
            handle_event(
                DocumentEvent::Activated { uri: args.uri },
                state,
                client,
                config,
            )
            .await;
            None
        }
        SET_EXTERNAL_DIAGNOSTICS => {
            let args: ExternalDiagnosticsArgs = parse_args(&params)?;
            let entries: Vec<DiagnosticEntry> = args
                .diagnostics
                .iter()
                .filter_map(DiagnosticEntry::from_lsp)
                .collect();
            let accepted = entries.len();
            handle_event(
                DocumentEvent::ExternalDiagnostics {
                    uri: args.uri,
                    entries,
                },
                state,
                client,
                config,
            )
            .await;
            Some(json!({ "accepted": accepted }))
        }
        other => {
            tracing::warn!("unknown command: {}", other);
            None
        }
    }
}

fn open_docs(state: &ServerState, uri: &Uri, position: Position) -> Value {
    let Some(tag) = hover::tag_at_position(state, uri, position) else {
        return json!({ "tag": null, "url": null });
    };
    let mapping = state.mapping.snapshot();
    json!({ "tag": tag, "url": mapping.lookup(&tag) })
}

/// Fresh evaluation of the requested (or active) document, including the
/// merged diagnostic set. Nothing is published.
async fn status(
    state: &ServerState,
    uri: Option<Uri>,
    config: &RwLock<DdexConfig>,
) -> StatusReport {
    let Some(uri) = uri.or_else(|| state.active_document()) else {
        return StatusReport::unknown();
    };
    if state.get_document(&uri).is_none() {
        return StatusReport::with_diagnostics(Some(uri), &Evaluation::unknown());
    }

    let settings = { config.read().await.validation.aggregator_config() };
    let evaluation = diagnostics::evaluate_document(state, &uri, settings);
    StatusReport::with_diagnostics(Some(uri), &evaluation)
}

/// Loads the mapping from `path` (or the configured path) and swaps it in.
/// A failed load installs an empty table.
async fn reload_mapping(
    state: &ServerState,
    path: Option<PathBuf>,
    client: &Client,
    config: &RwLock<DdexConfig>,
) -> Value {
    let configured = { config.read().await.mapping_path.clone() };
    let Some(path) = path.or(configured) else {
        tracing::warn!("reloadMapping: no mapping path configured");
        client
            .log_message(MessageType::WARNING, "No DDEX tag mapping path configured")
            .await;
        return json!({ "entries": state.mapping.snapshot().len() });
    };

    let map = load_mapping_or_empty(&path).await;
    let entries = map.len();
    state.mapping.replace(map);

    if entries == 0 {
        client
            .log_message(
                MessageType::WARNING,
                format!("DDEX tag mapping {} is empty or unreadable", path.display()),
            )
            .await;
    }

    json!({ "entries": entries })
}
