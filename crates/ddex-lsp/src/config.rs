use ddex_core::{AggregatorConfig, DEFAULT_DEBOUNCE, DEFAULT_HEADER_WINDOW};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for the ddex-lsp server.
///
/// Provided by the LSP client via initialization options or
/// `workspace/didChangeConfiguration`. All fields use sensible defaults if
/// not specified.
///
/// # Examples
///
/// ```
/// use ddex_lsp::config::DdexConfig;
///
/// let json = r#"{
///     "mapping_path": "/opt/ddex/ddex-map.json",
///     "validation": { "debounce_ms": 250 }
/// }"#;
///
/// let config: DdexConfig = serde_json::from_str(json).unwrap();
/// assert_eq!(config.validation.debounce_ms, 250);
/// assert!(config.links.enabled);
/// ```
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct DdexConfig {
    /// Path of the `ddex-map.json` tag → URL table.
    #[serde(default)]
    pub mapping_path: Option<PathBuf>,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub links: LinksConfig,
}

/// Configuration of the validity verdict.
///
/// # Defaults
///
/// - `enabled`: `true`
/// - `debounce_ms`: `400`
/// - `header_window_chars`: `8000`
/// - `max_error_preview`: `5`
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ValidationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Quiet period after the latest trigger before evaluating.
    /// Maximum: 10000 ms (clamped with a warning if exceeded).
    #[serde(
        default = "default_debounce_ms",
        deserialize_with = "deserialize_debounce_ms"
    )]
    pub debounce_ms: u64,
    #[serde(default = "default_header_window")]
    pub header_window_chars: usize,
    #[serde(default = "default_max_error_preview")]
    pub max_error_preview: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: default_debounce_ms(),
            header_window_chars: default_header_window(),
            max_error_preview: default_max_error_preview(),
        }
    }
}

impl ValidationConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn aggregator_config(&self) -> AggregatorConfig {
        AggregatorConfig {
            header_window: self.header_window_chars,
            max_error_preview: self.max_error_preview,
        }
    }
}

/// Configuration for document links over documented tags.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LinksConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

const fn default_true() -> bool {
    true
}

const fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE.as_millis() as u64
}

const fn default_header_window() -> usize {
    DEFAULT_HEADER_WINDOW
}

const fn default_max_error_preview() -> usize {
    5
}

/// Upper bound for `debounce_ms`.
const MAX_DEBOUNCE_MS: u64 = 10_000;

fn validate_debounce_ms(ms: u64) -> u64 {
    if ms > MAX_DEBOUNCE_MS {
        tracing::warn!(
            "debounce_ms exceeded max of {} ms, clamping from {}",
            MAX_DEBOUNCE_MS,
            ms
        );
        MAX_DEBOUNCE_MS
    } else {
        ms
    }
}

fn deserialize_debounce_ms<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let ms = u64::deserialize(deserializer)?;
    Ok(validate_debounce_ms(ms))
}
