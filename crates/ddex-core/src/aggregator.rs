//! Validity verdict for a document.
//!
//! One evaluation cycle walks the phases
//! `Idle → SyntaxChecking → SyntaxInvalid` or
//! `Idle → SyntaxChecking → SchemaChecking → Valid | Invalid`.
//! The aggregator never validates against a schema itself: it consumes
//! diagnostics already produced by an external validator and adds its own
//! syntax and advisory entries.

use crate::schema::{DEFAULT_HEADER_WINDOW, SchemaInfo, detect_schema, header_window};
use crate::syntax::check_well_formed;
use serde::{Deserialize, Serialize};
use tower_lsp_server::ls_types::{Diagnostic, DiagnosticSeverity, Position, Range};

/// Source tag carried by diagnostics this system produces.
pub const OWN_SOURCE: &str = "ddex";

/// Source tag assigned to external diagnostics that arrive without one.
pub const EXTERNAL_SOURCE: &str = "external";

/// Default number of error messages previewed in the tooltip.
pub const DEFAULT_MAX_ERROR_PREVIEW: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Information,
}

impl Severity {
    /// Maps an LSP severity. Missing severity counts as an error; hints are
    /// not tracked and map to `None`.
    pub fn from_lsp(severity: Option<DiagnosticSeverity>) -> Option<Self> {
        match severity {
            None => Some(Self::Error),
            Some(s) if s == DiagnosticSeverity::ERROR => Some(Self::Error),
            Some(s) if s == DiagnosticSeverity::WARNING => Some(Self::Warning),
            Some(s) if s == DiagnosticSeverity::INFORMATION => Some(Self::Information),
            Some(_) => None,
        }
    }

    pub fn to_lsp(self) -> DiagnosticSeverity {
        match self {
            Self::Error => DiagnosticSeverity::ERROR,
            Self::Warning => DiagnosticSeverity::WARNING,
            Self::Information => DiagnosticSeverity::INFORMATION,
        }
    }
}

/// A diagnostic from either this system (`source == "ddex"`) or an external
/// validator. External entries are passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticEntry {
    pub message: String,
    pub severity: Severity,
    pub range: Range,
    pub source: String,
}

impl DiagnosticEntry {
    /// Creates an entry owned by this system.
    pub fn own(severity: Severity, range: Range, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity,
            range,
            source: OWN_SOURCE.to_string(),
        }
    }

    pub fn is_own(&self) -> bool {
        self.source == OWN_SOURCE
    }

    /// Converts an LSP diagnostic. Hints are dropped.
    pub fn from_lsp(diagnostic: &Diagnostic) -> Option<Self> {
        Some(Self {
            message: diagnostic.message.clone(),
            severity: Severity::from_lsp(diagnostic.severity)?,
            range: diagnostic.range,
            source: diagnostic
                .source
                .clone()
                .unwrap_or_else(|| EXTERNAL_SOURCE.to_string()),
        })
    }

    pub fn to_lsp(&self) -> Diagnostic {
        Diagnostic {
            range: self.range,
            severity: Some(self.severity.to_lsp()),
            source: Some(self.source.clone()),
            message: self.message.clone(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Valid,
    Invalid,
    Unknown,
}

/// Aggregator phase; the last phase of a cycle is kept until the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    SyntaxChecking,
    SyntaxInvalid,
    SchemaChecking,
    Valid,
    Invalid,
}

/// Tunables for one evaluation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatorConfig {
    /// Characters of the document inspected for schema detection.
    pub header_window: usize,
    /// Maximum error messages listed in the tooltip.
    pub max_error_preview: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            header_window: DEFAULT_HEADER_WINDOW,
            max_error_preview: DEFAULT_MAX_ERROR_PREVIEW,
        }
    }
}

/// Result of one evaluation cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub status: ValidationStatus,
    pub tooltip: String,
    pub schema: SchemaInfo,
    /// Diagnostics owned by this system; published as a full replacement.
    pub own: Vec<DiagnosticEntry>,
    /// External errors, external warnings, then own entries.
    pub merged: Vec<DiagnosticEntry>,
    /// Terminal phase reached by the cycle.
    pub phase: Phase,
}

impl Evaluation {
    /// The verdict for "no active document".
    pub fn unknown() -> Self {
        Self {
            status: ValidationStatus::Unknown,
            tooltip: "DDEX: no active document".to_string(),
            schema: SchemaInfo::default(),
            own: Vec::new(),
            merged: Vec::new(),
            phase: Phase::Idle,
        }
    }

    pub fn error_count(&self) -> usize {
        self.merged
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }
}

/// Stateful driver for evaluation cycles.
///
/// # Examples
///
/// ```
/// use ddex_core::{Aggregator, ValidationStatus};
///
/// let mut aggregator = Aggregator::default();
/// let xml = r#"<ern:M xmlns:ern="http://ddex.net/xml/ern/382"/>"#;
///
/// let eval = aggregator.evaluate(Some(xml), &[]);
/// assert_eq!(eval.status, ValidationStatus::Valid);
/// assert!(eval.tooltip.contains("382"));
/// ```
#[derive(Debug, Default)]
pub struct Aggregator {
    config: AggregatorConfig,
    phase: Phase,
}

impl Aggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        Self {
            config,
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Runs one cycle over the active document's text (`None` when no
    /// document is active) and the external diagnostics published for it.
    pub fn evaluate(&mut self, text: Option<&str>, external: &[DiagnosticEntry]) -> Evaluation {
        self.enter(Phase::Idle);
        let Some(text) = text else {
            return Evaluation::unknown();
        };

        self.enter(Phase::SyntaxChecking);
        if let Err(err) = check_well_formed(text) {
            self.enter(Phase::SyntaxInvalid);
            let position = Position::new(err.line, err.column);
            let entry = DiagnosticEntry::own(
                Severity::Error,
                Range::new(position, position),
                format!("XML syntax error: {}", err.message),
            );
            return Evaluation {
                status: ValidationStatus::Invalid,
                tooltip: format!(
                    "DDEX: XML is not well-formed (line {}, column {})\n{}",
                    err.line + 1,
                    err.column + 1,
                    err.message
                ),
                schema: SchemaInfo::default(),
                own: vec![entry.clone()],
                merged: vec![entry],
                phase: self.phase,
            };
        }

        self.enter(Phase::SchemaChecking);
        let (errors, warnings): (Vec<_>, Vec<_>) = external
            .iter()
            .filter(|d| !d.is_own())
            .filter(|d| matches!(d.severity, Severity::Error | Severity::Warning))
            .cloned()
            .partition(|d| d.severity == Severity::Error);

        let schema = detect_schema(header_window(text, self.config.header_window));
        let mut own = Vec::new();
        if schema.version.is_none() {
            own.push(DiagnosticEntry::own(
                Severity::Information,
                first_line_range(text),
                "No DDEX ERN schema detected. Declare xsi:schemaLocation or xmlns:ern to associate a schema for validation.",
            ));
        }

        let status = if errors.is_empty() {
            self.enter(Phase::Valid);
            ValidationStatus::Valid
        } else {
            self.enter(Phase::Invalid);
            ValidationStatus::Invalid
        };

        let tooltip = self.tooltip(&schema, &errors);

        let mut merged = Vec::with_capacity(errors.len() + warnings.len() + own.len());
        merged.extend(errors);
        merged.extend(warnings);
        merged.extend(own.iter().cloned());

        Evaluation {
            status,
            tooltip,
            schema,
            own,
            merged,
            phase: self.phase,
        }
    }

    fn enter(&mut self, phase: Phase) {
        tracing::trace!("aggregator: {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    fn tooltip(&self, schema: &SchemaInfo, errors: &[DiagnosticEntry]) -> String {
        let mut text = match (schema.dotted_version(), &schema.version) {
            (Some(dotted), Some(raw)) => {
                let mut line = format!("DDEX ERN {dotted} ({raw})");
                if let Some(url) = &schema.schema_url {
                    line.push_str(": ");
                    line.push_str(url);
                }
                line
            }
            _ => "DDEX: no ERN schema detected".to_string(),
        };

        if errors.is_empty() {
            return text;
        }

        text.push_str(&format!("\n{} schema error(s):", errors.len()));
        for error in errors.iter().take(self.config.max_error_preview) {
            text.push_str("\n- ");
            text.push_str(&error.message);
        }
        if errors.len() > self.config.max_error_preview {
            text.push_str(&format!(
                "\n... and {} more",
                errors.len() - self.config.max_error_preview
            ));
        }
        text
    }
}

fn first_line_range(text: &str) -> Range {
    let width = text
        .lines()
        .next()
        .map_or(0, |line| line.encode_utf16().count() as u32);
    Range::new(Position::new(0, 0), Position::new(0, width))
}
