use crate::config::DdexConfig;
use crate::document::{ServerState, handle_event, load_mapping_or_empty};
use crate::handlers::{commands, diagnostics, hover, links};
use ddex_core::DocumentEvent;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_lsp_server::ls_types::{
    DiagnosticOptions, DiagnosticServerCapabilities, DidChangeConfigurationParams,
    DidChangeTextDocumentParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams,
    DidSaveTextDocumentParams, DocumentDiagnosticParams, DocumentDiagnosticReport,
    DocumentDiagnosticReportResult, DocumentLink, DocumentLinkOptions, DocumentLinkParams,
    ExecuteCommandOptions, ExecuteCommandParams, FullDocumentDiagnosticReport, Hover, HoverParams,
    HoverProviderCapability, InitializeParams, InitializeResult, InitializedParams, MessageType,
    RelatedFullDocumentDiagnosticReport, SaveOptions, ServerCapabilities, ServerInfo,
    TextDocumentSyncCapability, TextDocumentSyncKind, TextDocumentSyncOptions,
    TextDocumentSyncSaveOptions,
};
use tower_lsp_server::{Client, LanguageServer, jsonrpc::Result};

pub struct Backend {
    pub(crate) client: Client,
    state: Arc<ServerState>,
    config: Arc<RwLock<DdexConfig>>,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            state: Arc::new(ServerState::new()),
            config: Arc::new(RwLock::new(DdexConfig::default())),
        }
    }

    /// Get a reference to the LSP client (primarily for testing/benchmarking).
    #[doc(hidden)]
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Shared state (primarily for testing/benchmarking).
    #[doc(hidden)]
    pub fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    async fn dispatch(&self, event: DocumentEvent) {
        handle_event(
            event,
            Arc::clone(&self.state),
            self.client.clone(),
            Arc::clone(&self.config),
        )
        .await;
    }

    /// Replaces the mapping from the configured path, if any.
    async fn load_configured_mapping(&self) {
        let Some(path) = self.config.read().await.mapping_path.clone() else {
            tracing::info!("no DDEX tag mapping configured");
            return;
        };

        let map = load_mapping_or_empty(&path).await;
        let entries = map.len();
        self.state.mapping.replace(map);

        if entries == 0 {
            self.client
                .log_message(
                    MessageType::WARNING,
                    format!("DDEX tag mapping {} is empty or unreadable", path.display()),
                )
                .await;
        } else {
            tracing::info!("loaded {} DDEX tag mappings from {}", entries, path.display());
        }
    }

    fn server_capabilities() -> ServerCapabilities {
        ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Options(
                TextDocumentSyncOptions {
                    open_close: Some(true),
                    change: Some(TextDocumentSyncKind::FULL),
                    save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                        include_text: Some(true),
                    })),
                    ..Default::default()
                },
            )),
            hover_provider: Some(HoverProviderCapability::Simple(true)),
            document_link_provider: Some(DocumentLinkOptions {
                resolve_provider: Some(false),
                work_done_progress_options: Default::default(),
            }),
            diagnostic_provider: Some(DiagnosticServerCapabilities::Options(DiagnosticOptions {
                identifier: Some("ddex".into()),
                inter_file_dependencies: false,
                workspace_diagnostics: false,
                ..Default::default()
            })),
            execute_command_provider: Some(ExecuteCommandOptions {
                commands: commands::ALL.iter().map(|c| c.to_string()).collect(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

/// Extracts the `ddex` section of a settings payload, accepting the bare
/// config object as well.
fn settings_section(settings: serde_json::Value) -> serde_json::Value {
    match settings {
        serde_json::Value::Object(mut map) if map.contains_key("ddex") => {
            map.remove("ddex").unwrap_or_default()
        }
        other => other,
    }
}

impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        tracing::info!("initializing ddex-lsp server");

        if let Some(init_options) = params.initialization_options {
            match serde_json::from_value::<DdexConfig>(settings_section(init_options)) {
                Ok(config) => {
                    tracing::debug!("loaded configuration: {:?}", config);
                    *self.config.write().await = config;
                }
                Err(e) => tracing::warn!("ignoring invalid initialization options: {}", e),
            }
        }

        self.load_configured_mapping().await;

        Ok(InitializeResult {
            capabilities: Self::server_capabilities(),
            server_info: Some(ServerInfo {
                name: "ddex-lsp".into(),
                version: Some(env!("CARGO_PKG_VERSION").into()),
            }),
            offset_encoding: None,
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        tracing::info!("ddex-lsp server initialized");
        self.client
            .log_message(MessageType::INFO, "ddex-lsp ready")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        tracing::info!("shutting down ddex-lsp server");
        self.state.cancel_all_evaluations();
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        tracing::info!("document opened: {:?}", uri);

        self.dispatch(DocumentEvent::Opened {
            uri,
            text: params.text_document.text,
        })
        .await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        // Full sync: the last change carries the whole text
        if let Some(change) = params.content_changes.into_iter().last() {
            self.dispatch(DocumentEvent::Changed {
                uri: params.text_document.uri,
                text: change.text,
            })
            .await;
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        self.dispatch(DocumentEvent::Saved {
            uri: params.text_document.uri,
            text: params.text,
        })
        .await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        tracing::info!("document closed: {:?}", uri);

        self.dispatch(DocumentEvent::Closed { uri }).await;
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        let config = match serde_json::from_value::<DdexConfig>(settings_section(params.settings))
        {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("ignoring invalid configuration: {}", e);
                return;
            }
        };

        let mapping_changed = {
            let mut current = self.config.write().await;
            let changed = current.mapping_path != config.mapping_path;
            *current = config;
            changed
        };

        if mapping_changed {
            self.load_configured_mapping().await;
        }

        self.dispatch(DocumentEvent::Revalidate { uri: None }).await;
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        Ok(hover::handle_hover(
            Arc::clone(&self.state),
            params,
            self.client.clone(),
            Arc::clone(&self.config),
        )
        .await)
    }

    async fn document_link(&self, params: DocumentLinkParams) -> Result<Option<Vec<DocumentLink>>> {
        Ok(Some(
            links::handle_document_links(
                Arc::clone(&self.state),
                params,
                self.client.clone(),
                Arc::clone(&self.config),
            )
            .await,
        ))
    }

    async fn diagnostic(
        &self,
        params: DocumentDiagnosticParams,
    ) -> Result<DocumentDiagnosticReportResult> {
        let uri = params.text_document.uri;
        tracing::debug!("diagnostic request for: {:?}", uri);

        let items = diagnostics::handle_diagnostics(
            Arc::clone(&self.state),
            &uri,
            self.client.clone(),
            Arc::clone(&self.config),
        )
        .await;

        Ok(DocumentDiagnosticReportResult::Report(
            DocumentDiagnosticReport::Full(RelatedFullDocumentDiagnosticReport {
                related_documents: None,
                full_document_diagnostic_report: FullDocumentDiagnosticReport {
                    result_id: None,
                    items,
                },
            }),
        ))
    }

    async fn execute_command(
        &self,
        params: ExecuteCommandParams,
    ) -> Result<Option<serde_json::Value>> {
        tracing::info!("execute_command: {:?}", params.command);

        Ok(commands::handle_execute_command(
            Arc::clone(&self.state),
            params,
            self.client.clone(),
            Arc::clone(&self.config),
        )
        .await)
    }
}
