//! Event dispatcher: routes host events to state updates and debounced
//! evaluations.
//!
//! Every event that changes what the verdict depends on (text, focus,
//! external diagnostics, explicit requests) schedules a fresh evaluation
//! after the configured quiet period, replacing any pending one.

use super::loader::load_document_from_disk;
use super::state::ServerState;
use crate::config::DdexConfig;
use crate::handlers::diagnostics;
use ddex_core::DocumentEvent;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_lsp_server::Client;
use tower_lsp_server::ls_types::{MessageType, Uri};

/// Applies one host event.
pub async fn handle_event(
    event: DocumentEvent,
    state: Arc<ServerState>,
    client: Client,
    config: Arc<RwLock<DdexConfig>>,
) {
    tracing::debug!("document event: {} {:?}", event.kind(), event.uri());

    let activates = event.activates();
    let evaluates = event.triggers_evaluation();

    // Only open and change may introduce a document. Anything else naming
    // an unknown URI is dropped so no state or timer outlives it.
    let target = match event {
        DocumentEvent::Opened { uri, text } | DocumentEvent::Changed { uri, text } => {
            state.update_content(uri.clone(), text);
            uri
        }
        DocumentEvent::Saved { uri, text } => {
            match text {
                Some(text) => state.update_content(uri.clone(), text),
                None if state.get_document(&uri).is_none() => {
                    tracing::debug!("ignoring save of unknown document {:?}", uri);
                    return;
                }
                None => {}
            }
            uri
        }
        DocumentEvent::Activated { uri } => {
            if state.get_document(&uri).is_none() {
                tracing::debug!("ignoring activation of unknown document {:?}", uri);
                return;
            }
            uri
        }
        DocumentEvent::Closed { uri } => {
            handle_close(&uri, &state, &client).await;
            uri
        }
        DocumentEvent::ExternalDiagnostics { uri, entries } => {
            if state.get_document(&uri).is_none() {
                tracing::debug!("ignoring external diagnostics for unknown document {:?}", uri);
                return;
            }
            state.set_external_diagnostics(uri.clone(), entries);
            uri
        }
        DocumentEvent::Revalidate { uri: Some(uri) } => {
            if state.get_document(&uri).is_none() {
                tracing::debug!("ignoring revalidation of unknown document {:?}", uri);
                return;
            }
            uri
        }
        DocumentEvent::Revalidate { uri: None } => match state.active_document() {
            Some(uri) => uri,
            None => {
                diagnostics::publish_unknown(&client).await;
                return;
            }
        },
    };

    if activates {
        state.set_active_document(target.clone());
    }
    if evaluates {
        schedule_evaluation(target, state, client, config).await;
    }
}

async fn handle_close(uri: &Uri, state: &ServerState, client: &Client) {
    state.cancel_evaluation(uri);
    state.remove_document(uri);
    diagnostics::clear_diagnostics(client, uri).await;

    if state.deactivate(uri) {
        tracing::debug!("active document closed: {:?}", uri);
        diagnostics::publish_unknown(client).await;
    }
}

/// Schedules a debounced evaluation of `uri`.
///
/// With validation disabled nothing is scheduled and own diagnostics are
/// cleared.
pub async fn schedule_evaluation(
    uri: Uri,
    state: Arc<ServerState>,
    client: Client,
    config: Arc<RwLock<DdexConfig>>,
) {
    let validation = { config.read().await.validation.clone() };
    if !validation.enabled {
        tracing::trace!("validation disabled, not scheduling {:?}", uri);
        state.cancel_evaluation(&uri);
        diagnostics::clear_diagnostics(&client, &uri).await;
        return;
    }

    let job = diagnostics::evaluate_and_publish(
        Arc::clone(&state),
        uri.clone(),
        client,
        config,
    );
    state.schedule_evaluation(uri, validation.debounce(), job);
}

/// Ensures a document is loaded, reading it from disk if the client never
/// opened it.
///
/// Returns `true` if the document is available in state. A document loaded
/// this way is not made active.
pub async fn ensure_document_loaded(
    uri: &Uri,
    state: Arc<ServerState>,
    client: Client,
    _config: Arc<RwLock<DdexConfig>>,
) -> bool {
    if state.get_document(uri).is_some() {
        return true;
    }

    tracing::info!("loading document from disk (cold start): {:?}", uri);
    match load_document_from_disk(uri).await {
        Ok(content) => {
            state.update_content(uri.clone(), content);
            true
        }
        Err(e) => {
            tracing::warn!("failed to load document {:?}: {}", uri, e);
            client
                .log_message(MessageType::WARNING, format!("Could not load file: {e}"))
                .await;
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_helpers::create_test_client_and_config;
    use ddex_core::{DiagnosticEntry, Severity, ValidationStatus};
    use std::time::Duration;
    use tower_lsp_server::ls_types::Range;

    const VALID: &str = r#"<ern:NewReleaseMessage xmlns:ern="http://ddex.net/xml/ern/382"/>"#;

    fn uri(name: &str) -> Uri {
        Uri::from_file_path(format!("/test/{name}")).unwrap()
    }

    fn status_of(state: &ServerState, uri: &Uri) -> Option<ValidationStatus> {
        state
            .get_document(uri)
            .and_then(|doc| doc.evaluation.as_ref().map(|e| e.status))
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_activates_and_evaluates_after_debounce() {
        let state = Arc::new(ServerState::new());
        let (client, config) = create_test_client_and_config();
        let a = uri("a.xml");

        handle_event(
            DocumentEvent::Opened {
                uri: a.clone(),
                text: VALID.into(),
            },
            Arc::clone(&state),
            client,
            config,
        )
        .await;

        assert_eq!(state.active_document(), Some(a.clone()));
        assert_eq!(state.evaluation_count(), 0);

        tokio::time::sleep(Duration::from_millis(399)).await;
        assert_eq!(state.evaluation_count(), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(state.evaluation_count(), 1);
        assert_eq!(status_of(&state, &a), Some(ValidationStatus::Valid));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_changes_evaluate_once_with_latest_text() {
        let state = Arc::new(ServerState::new());
        let (client, config) = create_test_client_and_config();
        let a = uri("a.xml");

        handle_event(
            DocumentEvent::Opened {
                uri: a.clone(),
                text: VALID.into(),
            },
            Arc::clone(&state),
            client.clone(),
            Arc::clone(&config),
        )
        .await;

        for text in ["<Foo>", "<Foo><Bar>", "<Foo><Bar></Foo>"] {
            tokio::time::sleep(Duration::from_millis(100)).await;
            handle_event(
                DocumentEvent::Changed {
                    uri: a.clone(),
                    text: text.into(),
                },
                Arc::clone(&state),
                client.clone(),
                Arc::clone(&config),
            )
            .await;
        }

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(state.evaluation_count(), 1);

        let doc = state.get_document(&a).unwrap();
        let eval = doc.evaluation.as_ref().unwrap();
        assert_eq!(eval.status, ValidationStatus::Invalid);
        assert_eq!(eval.own.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_of_active_document_clears_active() {
        let state = Arc::new(ServerState::new());
        let (client, config) = create_test_client_and_config();
        let a = uri("a.xml");

        handle_event(
            DocumentEvent::Opened {
                uri: a.clone(),
                text: VALID.into(),
            },
            Arc::clone(&state),
            client.clone(),
            Arc::clone(&config),
        )
        .await;
        handle_event(
            DocumentEvent::Closed { uri: a.clone() },
            Arc::clone(&state),
            client,
            config,
        )
        .await;

        assert!(state.active_document().is_none());
        assert_eq!(state.document_count(), 0);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(state.evaluation_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_of_background_document_keeps_active() {
        let state = Arc::new(ServerState::new());
        let (client, config) = create_test_client_and_config();
        let (a, b) = (uri("a.xml"), uri("b.xml"));

        for target in [&b, &a] {
            handle_event(
                DocumentEvent::Opened {
                    uri: target.clone(),
                    text: VALID.into(),
                },
                Arc::clone(&state),
                client.clone(),
                Arc::clone(&config),
            )
            .await;
        }
        handle_event(
            DocumentEvent::Closed { uri: b.clone() },
            Arc::clone(&state),
            client,
            config,
        )
        .await;

        assert_eq!(state.active_document(), Some(a));
    }

    #[tokio::test(start_paused = true)]
    async fn test_activation_switches_active_document() {
        let state = Arc::new(ServerState::new());
        let (client, config) = create_test_client_and_config();
        let (a, b) = (uri("a.xml"), uri("b.xml"));

        for target in [&a, &b] {
            handle_event(
                DocumentEvent::Opened {
                    uri: target.clone(),
                    text: VALID.into(),
                },
                Arc::clone(&state),
                client.clone(),
                Arc::clone(&config),
            )
            .await;
        }
        handle_event(
            DocumentEvent::Activated { uri: a.clone() },
            Arc::clone(&state),
            client.clone(),
            Arc::clone(&config),
        )
        .await;
        assert_eq!(state.active_document(), Some(a));

        handle_event(
            DocumentEvent::Activated {
                uri: uri("unknown.xml"),
            },
            Arc::clone(&state),
            client,
            config,
        )
        .await;
        assert_eq!(state.active_document(), Some(uri("a.xml")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_diagnostics_trigger_invalid() {
        let state = Arc::new(ServerState::new());
        let (client, config) = create_test_client_and_config();
        let a = uri("a.xml");

        handle_event(
            DocumentEvent::Opened {
                uri: a.clone(),
                text: VALID.into(),
            },
            Arc::clone(&state),
            client.clone(),
            Arc::clone(&config),
        )
        .await;
        handle_event(
            DocumentEvent::ExternalDiagnostics {
                uri: a.clone(),
                entries: vec![DiagnosticEntry {
                    message: "cvc-complex-type.2.4.a: Invalid content".into(),
                    severity: Severity::Error,
                    range: Range::default(),
                    source: "xml".into(),
                }],
            },
            Arc::clone(&state),
            client,
            config,
        )
        .await;

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(state.evaluation_count(), 1);
        assert_eq!(status_of(&state, &a), Some(ValidationStatus::Invalid));
    }

    #[tokio::test(start_paused = true)]
    async fn test_revalidate_targets_active_document() {
        let state = Arc::new(ServerState::new());
        let (client, config) = create_test_client_and_config();

        handle_event(
            DocumentEvent::Revalidate { uri: None },
            Arc::clone(&state),
            client.clone(),
            Arc::clone(&config),
        )
        .await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(state.evaluation_count(), 0);

        let a = uri("a.xml");
        state.update_content(a.clone(), VALID.into());
        state.set_active_document(a.clone());
        handle_event(
            DocumentEvent::Revalidate { uri: None },
            Arc::clone(&state),
            client,
            config,
        )
        .await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(state.evaluation_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_for_unopened_documents_leave_no_state() {
        let state = Arc::new(ServerState::new());
        let (client, config) = create_test_client_and_config();
        let never_opened: Vec<Uri> = (0..100)
            .map(|i| Uri::from_file_path(format!("/never/opened/{i}.xml")).unwrap())
            .collect();

        for target in &never_opened {
            handle_event(
                DocumentEvent::ExternalDiagnostics {
                    uri: target.clone(),
                    entries: vec![DiagnosticEntry {
                        message: "cvc-elt.1: Cannot find the declaration".into(),
                        severity: Severity::Error,
                        range: Range::default(),
                        source: "xml".into(),
                    }],
                },
                Arc::clone(&state),
                client.clone(),
                Arc::clone(&config),
            )
            .await;
        }
        for event in [
            DocumentEvent::Revalidate {
                uri: Some(never_opened[0].clone()),
            },
            DocumentEvent::Saved {
                uri: never_opened[1].clone(),
                text: None,
            },
        ] {
            handle_event(event, Arc::clone(&state), client.clone(), Arc::clone(&config)).await;
        }

        assert!(never_opened.iter().all(|u| !state.is_evaluation_pending(u)));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(state.evaluation_count(), 0);
        assert_eq!(state.document_count(), 0);
        assert!(state.active_document().is_none());
        assert!(
            never_opened
                .iter()
                .all(|u| state.external_diagnostics(u).is_empty())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_configured_debounce_is_used() {
        let state = Arc::new(ServerState::new());
        let (client, config) = create_test_client_and_config();
        config.write().await.validation.debounce_ms = 50;
        let a = uri("a.xml");

        handle_event(
            DocumentEvent::Opened {
                uri: a,
                text: VALID.into(),
            },
            Arc::clone(&state),
            client,
            config,
        )
        .await;

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(state.evaluation_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_validation_disabled_schedules_nothing() {
        let state = Arc::new(ServerState::new());
        let (client, config) = create_test_client_and_config();
        config.write().await.validation.enabled = false;

        handle_event(
            DocumentEvent::Opened {
                uri: uri("a.xml"),
                text: VALID.into(),
            },
            Arc::clone(&state),
            client,
            config,
        )
        .await;

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(state.evaluation_count(), 0);
        assert_eq!(state.document_count(), 1);
    }

    #[tokio::test]
    async fn test_ensure_document_loaded_fast_path() {
        let state = Arc::new(ServerState::new());
        let (client, config) = create_test_client_and_config();
        let a = uri("a.xml");
        state.update_content(a.clone(), VALID.into());

        assert!(ensure_document_loaded(&a, Arc::clone(&state), client, config).await);
    }

    #[tokio::test]
    async fn test_ensure_document_loaded_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("release.xml");
        std::fs::write(&path, VALID).unwrap();
        let doc_uri = Uri::from_file_path(&path).unwrap();

        let state = Arc::new(ServerState::new());
        let (client, config) = create_test_client_and_config();

        assert!(ensure_document_loaded(&doc_uri, Arc::clone(&state), client, config).await);
        assert_eq!(state.get_document(&doc_uri).unwrap().content, VALID);
        assert!(state.active_document().is_none());
    }

    #[tokio::test]
    async fn test_ensure_document_loaded_missing_file() {
        let state = Arc::new(ServerState::new());
        let (client, config) = create_test_client_and_config();
        let missing = Uri::from_file_path("/nonexistent/release.xml").unwrap();

        assert!(!ensure_document_loaded(&missing, state, client, config).await);
    }
}
