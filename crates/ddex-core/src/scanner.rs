//! Document-wide scan for tags that have documentation.

use crate::mapping::TagMap;
use crate::resolver::local_name;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Start of an opening tag: `<`, optional whitespace, then a name.
static OPEN_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<\s*([A-Za-z_][A-Za-z0-9_:\-]*)").unwrap());

/// A mapped tag found in a document.
///
/// `offset` is the byte offset immediately after the `<`. `len` covers the
/// raw name as written, so for `ern:ReleaseList` it spans the prefix too,
/// even though only `ReleaseList` was looked up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagOccurrence {
    /// Local name that matched the mapping.
    pub local_name: String,
    /// Name as written in the document, prefix included.
    pub raw_name: String,
    pub offset: usize,
    pub len: usize,
}

impl TagOccurrence {
    /// Byte offset one past the reported span.
    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// Lazily scans `text` for opening tags whose local name is in `mapping`.
///
/// Every call starts a fresh scan; occurrences come out in document order.
///
/// # Examples
///
/// ```
/// use ddex_core::{TagMap, scan_mapped_tags};
///
/// let map = TagMap::from_entries([("Deal", "https://example.org/deal")]);
/// let text = "<DealList><Deal/><ern:Deal/></DealList>";
///
/// let found: Vec<_> = scan_mapped_tags(text, &map).map(|o| (o.offset, o.len)).collect();
/// assert_eq!(found, vec![(11, 4), (18, 8)]);
/// ```
pub fn scan_mapped_tags<'a>(
    text: &'a str,
    mapping: &'a TagMap,
) -> impl Iterator<Item = TagOccurrence> + 'a {
    OPEN_TAG.captures_iter(text).filter_map(move |caps| {
        let whole = caps.get(0)?;
        let name = caps.get(1)?;
        let local = local_name(name.as_str());

        if !mapping.contains(local) {
            return None;
        }

        Some(TagOccurrence {
            local_name: local.to_string(),
            raw_name: name.as_str().to_string(),
            offset: whole.start() + 1,
            len: name.len(),
        })
    })
}
