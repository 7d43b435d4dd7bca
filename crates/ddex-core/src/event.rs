//! Host events routed to the dispatcher.

use crate::aggregator::DiagnosticEntry;
use tower_lsp_server::ls_types::Uri;

/// Something the host reported about a document.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentEvent {
    /// Document opened; it becomes the active document.
    Opened { uri: Uri, text: String },
    /// An already open document gained focus.
    Activated { uri: Uri },
    /// Full new text of the document.
    Changed { uri: Uri, text: String },
    /// Document saved, optionally with its text.
    Saved { uri: Uri, text: Option<String> },
    Closed { uri: Uri },
    /// External validator published a new diagnostic list.
    ExternalDiagnostics {
        uri: Uri,
        entries: Vec<DiagnosticEntry>,
    },
    /// Explicit re-evaluation; `None` targets the active document.
    Revalidate { uri: Option<Uri> },
}

impl DocumentEvent {
    /// Document the event refers to, if it names one.
    pub fn uri(&self) -> Option<&Uri> {
        match self {
            Self::Opened { uri, .. }
            | Self::Activated { uri }
            | Self::Changed { uri, .. }
            | Self::Saved { uri, .. }
            | Self::Closed { uri }
            | Self::ExternalDiagnostics { uri, .. } => Some(uri),
            Self::Revalidate { uri } => uri.as_ref(),
        }
    }

    /// Returns true if the event starts a (debounced) evaluation.
    pub fn triggers_evaluation(&self) -> bool {
        !matches!(self, Self::Closed { .. })
    }

    /// Returns true if the event makes its document the active one.
    pub fn activates(&self) -> bool {
        matches!(self, Self::Opened { .. } | Self::Activated { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Opened { .. } => "opened",
            Self::Activated { .. } => "activated",
            Self::Changed { .. } => "changed",
            Self::Saved { .. } => "saved",
            Self::Closed { .. } => "closed",
            Self::ExternalDiagnostics { .. } => "external-diagnostics",
            Self::Revalidate { .. } => "revalidate",
        }
    }
}
