use crate::line_index::LineIndex;
use dashmap::DashMap;
use ddex_core::{
    DiagnosticEntry, Debouncer, Evaluation, MappingStore, SchemaInfo, TagMap, ValidationStatus,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tower_lsp_server::ls_types::Uri;

/// State for a single open document.
#[derive(Debug, Clone)]
pub struct DocumentState {
    /// Full document text
    pub content: String,
    /// Line start offsets for `content`
    pub line_index: LineIndex,
    /// Outcome of the most recent evaluation, if any
    pub evaluation: Option<Evaluation>,
}

impl DocumentState {
    pub fn new(content: String) -> Self {
        let line_index = LineIndex::new(&content);
        Self {
            content,
            line_index,
            evaluation: None,
        }
    }

    /// Replaces the document text, keeping the last evaluation until the
    /// next one lands.
    pub fn update_content(&mut self, content: String) {
        self.line_index = LineIndex::new(&content);
        self.content = content;
    }

    /// Text of one line, without its terminator.
    pub fn line(&self, line: u32) -> Option<&str> {
        self.line_index.line(&self.content, line)
    }
}

/// Status summary sent to the host after each evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<Uri>,
    pub status: ValidationStatus,
    pub tooltip: String,
    /// Schema association hint for the host's XML settings.
    pub schema: SchemaInfo,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<DiagnosticEntry>,
}

impl StatusReport {
    pub fn from_evaluation(uri: Option<Uri>, evaluation: &Evaluation) -> Self {
        Self {
            uri,
            status: evaluation.status,
            tooltip: evaluation.tooltip.clone(),
            schema: evaluation.schema.clone(),
            diagnostics: Vec::new(),
        }
    }

    /// Report carrying the merged diagnostic set as well.
    pub fn with_diagnostics(uri: Option<Uri>, evaluation: &Evaluation) -> Self {
        Self {
            diagnostics: evaluation.merged.clone(),
            ..Self::from_evaluation(uri, evaluation)
        }
    }

    pub fn unknown() -> Self {
        Self::from_evaluation(None, &Evaluation::unknown())
    }
}

/// Global server state.
///
/// Shared between the LSP backend, handlers and debounced evaluation tasks.
#[derive(Debug)]
pub struct ServerState {
    /// Open documents by URI
    pub documents: DashMap<Uri, DocumentState>,
    /// Current tag mapping snapshot
    pub mapping: MappingStore,
    /// Diagnostics published by the external validator, per document
    external: DashMap<Uri, Vec<DiagnosticEntry>>,
    /// Document whose verdict the host is showing
    active: RwLock<Option<Uri>>,
    /// Pending evaluations
    debouncer: Debouncer<Uri>,
    evaluations: AtomicU64,
}

impl ServerState {
    /// Creates a new server state with an empty mapping.
    pub fn new() -> Self {
        Self::with_mapping(TagMap::new())
    }

    pub fn with_mapping(map: TagMap) -> Self {
        Self {
            documents: DashMap::new(),
            mapping: MappingStore::new(map),
            external: DashMap::new(),
            active: RwLock::new(None),
            debouncer: Debouncer::default(),
            evaluations: AtomicU64::new(0),
        }
    }

    /// Retrieves document state by URI.
    ///
    /// The returned reference holds a shard lock; drop it before calling
    /// anything that mutates the same document.
    pub fn get_document(
        &self,
        uri: &Uri,
    ) -> Option<dashmap::mapref::one::Ref<'_, Uri, DocumentState>> {
        self.documents.get(uri)
    }

    /// Retrieves a cloned copy of document state by URI.
    pub fn get_document_clone(&self, uri: &Uri) -> Option<DocumentState> {
        self.documents.get(uri).map(|doc| doc.clone())
    }

    /// Updates or inserts document state.
    pub fn update_document(&self, uri: Uri, state: DocumentState) {
        self.documents.insert(uri, state);
    }

    /// Replaces the text of a document, inserting it if unknown.
    pub fn update_content(&self, uri: Uri, content: String) {
        if let Some(mut doc) = self.documents.get_mut(&uri) {
            doc.update_content(content);
            return;
        }
        self.documents.insert(uri, DocumentState::new(content));
    }

    /// Removes document state together with its external diagnostics.
    pub fn remove_document(&self, uri: &Uri) -> Option<(Uri, DocumentState)> {
        self.external.remove(uri);
        self.documents.remove(uri)
    }

    /// Returns the number of open documents.
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Replaces the externally owned diagnostic list for a document.
    ///
    /// Callers only store lists for open documents; `remove_document` is
    /// what drops them.
    pub fn set_external_diagnostics(&self, uri: Uri, entries: Vec<DiagnosticEntry>) {
        self.external.insert(uri, entries);
    }

    pub fn external_diagnostics(&self, uri: &Uri) -> Vec<DiagnosticEntry> {
        self.external
            .get(uri)
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn active_document(&self) -> Option<Uri> {
        self.active.read().clone()
    }

    pub fn set_active_document(&self, uri: Uri) {
        *self.active.write() = Some(uri);
    }

    /// Clears the active document if it is `uri`. Returns true if cleared.
    pub fn deactivate(&self, uri: &Uri) -> bool {
        let mut active = self.active.write();
        if active.as_ref() == Some(uri) {
            *active = None;
            true
        } else {
            false
        }
    }

    /// Schedules `job` for `uri` after `delay`, replacing any pending one.
    pub fn schedule_evaluation<F>(&self, uri: Uri, delay: Duration, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.debouncer.schedule(uri, delay, job);
    }

    /// Cancels the pending evaluation for a document.
    ///
    /// If none is pending, this is a no-op.
    pub fn cancel_evaluation(&self, uri: &Uri) {
        self.debouncer.cancel(uri);
    }

    pub fn is_evaluation_pending(&self, uri: &Uri) -> bool {
        self.debouncer.is_pending(uri)
    }

    pub fn cancel_all_evaluations(&self) {
        self.debouncer.cancel_all();
    }

    /// Stores an evaluation on its document and bumps the counter.
    pub fn record_evaluation(&self, uri: &Uri, evaluation: &Evaluation) {
        if let Some(mut doc) = self.documents.get_mut(uri) {
            doc.evaluation = Some(evaluation.clone());
        }
        self.evaluations.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of evaluations completed since startup.
    pub fn evaluation_count(&self) -> u64 {
        self.evaluations.load(Ordering::Relaxed)
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}
