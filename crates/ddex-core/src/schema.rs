//! ERN schema version detection.
//!
//! Only the head of a document is inspected. Two strategies are tried in
//! order; the first that yields a version wins:
//!
//! 1. `xsi:schemaLocation` with a namespace/XSD pair, version taken from the
//!    `/ern/<digits>` segment of the namespace.
//! 2. An `xmlns:ern` / `xmlns:ddex` declaration pointing at
//!    `http(s)://ddex.net/xml/ern/<digits>`, with the XSD URL synthesized.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Number of characters inspected by default.
pub const DEFAULT_HEADER_WINDOW: usize = 8000;

static SCHEMA_LOCATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"schemaLocation\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap());

static ERN_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/ern/(\d+)").unwrap());

static ERN_NAMESPACE_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"xmlns:(?:ern|ddex)\s*=\s*["'](https?://ddex\.net/xml/ern/(\d+))"#).unwrap()
});

/// Schema information declared by a document.
///
/// Every field is optional; absence means "not detected".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_uri: Option<String>,
    /// ERN version as written in the namespace, e.g. `382`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_url: Option<String>,
}

impl SchemaInfo {
    /// Returns true if nothing was detected.
    pub fn is_empty(&self) -> bool {
        self.namespace_uri.is_none() && self.version.is_none() && self.schema_url.is_none()
    }

    /// Renders the version with a dot between digits (`382` → `3.8.2`).
    ///
    /// # Examples
    ///
    /// ```
    /// use ddex_core::SchemaInfo;
    ///
    /// let info = SchemaInfo { version: Some("382".into()), ..Default::default() };
    /// assert_eq!(info.dotted_version().as_deref(), Some("3.8.2"));
    /// ```
    pub fn dotted_version(&self) -> Option<String> {
        let version = self.version.as_deref()?;
        let mut out = String::with_capacity(version.len() * 2);
        for (i, c) in version.chars().enumerate() {
            if i > 0 {
                out.push('.');
            }
            out.push(c);
        }
        Some(out)
    }
}

/// Returns the first `limit` characters of `text`.
pub fn header_window(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Detects the declared ERN schema in a document header.
///
/// Never fails: a header without a recognizable declaration yields an empty
/// [`SchemaInfo`].
///
/// # Examples
///
/// ```
/// use ddex_core::detect_schema;
///
/// let header = r#"<ern:NewReleaseMessage xmlns:ern="http://ddex.net/xml/ern/41">"#;
/// let info = detect_schema(header);
///
/// assert_eq!(info.version.as_deref(), Some("41"));
/// assert_eq!(
///     info.schema_url.as_deref(),
///     Some("http://ddex.net/xml/ern/41/release-notification.xsd")
/// );
/// ```
pub fn detect_schema(header: &str) -> SchemaInfo {
    if let Some(info) = from_schema_location(header) {
        return info;
    }
    if let Some(info) = from_namespace_declaration(header) {
        return info;
    }
    tracing::trace!("no ERN schema declaration in header");
    SchemaInfo::default()
}

fn from_schema_location(header: &str) -> Option<SchemaInfo> {
    let caps = SCHEMA_LOCATION.captures(header)?;
    let value = caps.get(1).or_else(|| caps.get(2))?.as_str();

    let mut tokens = value.split_whitespace();
    let namespace = tokens.next()?;
    let schema_url = tokens.next()?;

    // A schemaLocation whose namespace has no ERN version defers to the
    // namespace-declaration strategy, even though a URL was found.
    let Some(version) = ERN_SEGMENT.captures(namespace).and_then(|c| c.get(1)) else {
        tracing::debug!(
            "schemaLocation namespace {} carries no ERN version, trying xmlns",
            namespace
        );
        return None;
    };

    Some(SchemaInfo {
        namespace_uri: Some(namespace.to_string()),
        version: Some(version.as_str().to_string()),
        schema_url: Some(schema_url.to_string()),
    })
}

fn from_namespace_declaration(header: &str) -> Option<SchemaInfo> {
    let caps = ERN_NAMESPACE_DECL.captures(header)?;
    let namespace = caps.get(1)?.as_str();
    let version = caps.get(2)?.as_str();

    Some(SchemaInfo {
        namespace_uri: Some(namespace.to_string()),
        version: Some(version.to_string()),
        schema_url: Some(format!("{namespace}/release-notification.xsd")),
    })
}
