//! Evaluation, diagnostic publishing and the status notification.

use crate::config::DdexConfig;
use crate::document::{ServerState, StatusReport, ensure_document_loaded};
use ddex_core::{Aggregator, AggregatorConfig, Evaluation};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_lsp_server::Client;
use tower_lsp_server::ls_types::notification::Notification;
use tower_lsp_server::ls_types::{Diagnostic, Uri};

/// `ddex/status` notification carrying a [`StatusReport`].
#[derive(Debug)]
pub enum StatusNotification {}

impl Notification for StatusNotification {
    type Params = StatusReport;
    const METHOD: &'static str = "ddex/status";
}

/// Runs one aggregator cycle for `uri` against the current document text and
/// external diagnostics, and records the result on the document.
///
/// A document that is not open evaluates to `Unknown`.
pub fn evaluate_document(state: &ServerState, uri: &Uri, settings: AggregatorConfig) -> Evaluation {
    let external = state.external_diagnostics(uri);
    let mut aggregator = Aggregator::new(settings);

    let evaluation = {
        let doc = state.get_document(uri);
        aggregator.evaluate(doc.as_deref().map(|d| d.content.as_str()), &external)
    };

    tracing::debug!(
        "evaluated {:?}: {:?} ({} own, {} merged)",
        uri,
        evaluation.status,
        evaluation.own.len(),
        evaluation.merged.len()
    );

    state.record_evaluation(uri, &evaluation);
    evaluation
}

/// Publishes the own diagnostics of an evaluation and its status summary.
pub async fn publish_evaluation(client: &Client, uri: &Uri, evaluation: &Evaluation) {
    let items: Vec<Diagnostic> = evaluation.own.iter().map(|d| d.to_lsp()).collect();
    client.publish_diagnostics(uri.clone(), items, None).await;
    client
        .send_notification::<StatusNotification>(StatusReport::from_evaluation(
            Some(uri.clone()),
            evaluation,
        ))
        .await;
}

/// Clears the own diagnostics of a document.
pub async fn clear_diagnostics(client: &Client, uri: &Uri) {
    client.publish_diagnostics(uri.clone(), vec![], None).await;
}

/// Announces that no document is active.
pub async fn publish_unknown(client: &Client) {
    client
        .send_notification::<StatusNotification>(StatusReport::unknown())
        .await;
}

/// Evaluates and publishes in one step; the body of every debounced job.
pub async fn evaluate_and_publish(
    state: Arc<ServerState>,
    uri: Uri,
    client: Client,
    config: Arc<RwLock<DdexConfig>>,
) {
    let settings = { config.read().await.validation.aggregator_config() };
    let evaluation = evaluate_document(&state, &uri, settings);
    publish_evaluation(&client, &uri, &evaluation).await;
}

/// Handles pull diagnostic requests by evaluating immediately.
pub async fn handle_diagnostics(
    state: Arc<ServerState>,
    uri: &Uri,
    client: Client,
    config: Arc<RwLock<DdexConfig>>,
) -> Vec<Diagnostic> {
    if !ensure_document_loaded(uri, Arc::clone(&state), client, Arc::clone(&config)).await {
        tracing::warn!("Could not load document for diagnostics: {:?}", uri);
        return vec![];
    }

    let validation = { config.read().await.validation.clone() };
    if !validation.enabled {
        return vec![];
    }

    evaluate_document(&state, uri, validation.aggregator_config())
        .own
        .iter()
        .map(|d| d.to_lsp())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentState;
    use crate::test_utils::test_helpers::create_test_client_and_config;
    use ddex_core::{DiagnosticEntry, Severity, ValidationStatus};
    use tower_lsp_server::ls_types::{DiagnosticSeverity, Position, Range};

    const VALID: &str = r#"<ern:NewReleaseMessage xmlns:ern="http://ddex.net/xml/ern/382"/>"#;

    fn uri() -> Uri {
        Uri::from_file_path("/test/release.xml").unwrap()
    }

    #[test]
    fn test_evaluate_missing_document_is_unknown() {
        let state = ServerState::new();
        let eval = evaluate_document(&state, &uri(), AggregatorConfig::default());

        assert_eq!(eval.status, ValidationStatus::Unknown);
        assert_eq!(state.evaluation_count(), 1);
    }

    #[test]
    fn test_evaluate_records_on_document() {
        let state = ServerState::new();
        state.update_document(uri(), DocumentState::new(VALID.into()));

        let eval = evaluate_document(&state, &uri(), AggregatorConfig::default());
        assert_eq!(eval.status, ValidationStatus::Valid);

        let doc = state.get_document(&uri()).unwrap();
        assert_eq!(doc.evaluation.as_ref(), Some(&eval));
    }

    #[test]
    fn test_evaluate_uses_external_diagnostics() {
        let state = ServerState::new();
        state.update_document(uri(), DocumentState::new(VALID.into()));
        state.set_external_diagnostics(
            uri(),
            vec![DiagnosticEntry {
                message: "cvc-complex-type.2.4.b".into(),
                severity: Severity::Error,
                range: Range::new(Position::new(0, 1), Position::new(0, 5)),
                source: "xml".into(),
            }],
        );

        let eval = evaluate_document(&state, &uri(), AggregatorConfig::default());
        assert_eq!(eval.status, ValidationStatus::Invalid);
        assert!(eval.own.is_empty());
        assert_eq!(eval.merged.len(), 1);
    }

    #[tokio::test]
    async fn test_handle_diagnostics_missing_document() {
        let state = Arc::new(ServerState::new());
        let missing = Uri::from_file_path("/nonexistent/release.xml").unwrap();
        let (client, config) = create_test_client_and_config();

        let items = handle_diagnostics(state, &missing, client, config).await;
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_handle_diagnostics_reports_syntax_error() {
        let state = Arc::new(ServerState::new());
        state.update_document(uri(), DocumentState::new("<Foo><Bar></Foo>".into()));
        let (client, config) = create_test_client_and_config();

        let items = handle_diagnostics(state, &uri(), client, config).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].severity, Some(DiagnosticSeverity::ERROR));
        assert_eq!(items[0].source.as_deref(), Some("ddex"));
    }

    #[tokio::test]
    async fn test_handle_diagnostics_disabled() {
        let state = Arc::new(ServerState::new());
        state.update_document(uri(), DocumentState::new("<Foo><Bar></Foo>".into()));
        let (client, config) = create_test_client_and_config();
        config.write().await.validation.enabled = false;

        let items = handle_diagnostics(state, &uri(), client, config).await;
        assert!(items.is_empty());
    }

    #[test]
    fn test_status_notification_method() {
        assert_eq!(StatusNotification::METHOD, "ddex/status");
    }
}
