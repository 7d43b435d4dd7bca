//! Tag documentation mapping.
//!
//! The mapping is a flat JSON object from DDEX tag name to documentation URL,
//! produced offline (`ddex-map.json`). It is immutable once built; a reload
//! builds a new [`TagMap`] and swaps it into the [`MappingStore`] so every
//! reader sees one consistent snapshot for the duration of an operation.

use crate::resolver::local_name;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Read-only table from local tag name to documentation URL.
///
/// Keys never carry a namespace prefix: `ern:ReleaseList` is stored as
/// `ReleaseList`. Entries with a blank URL are not stored.
///
/// # Examples
///
/// ```
/// use ddex_core::TagMap;
///
/// let map = TagMap::from_json_str(r#"{
///     "ern:ReleaseList": "https://ern.ddex.net/release-list/",
///     "Deal": ""
/// }"#).unwrap();
///
/// assert_eq!(map.lookup("ReleaseList"), Some("https://ern.ddex.net/release-list/"));
/// assert!(!map.contains("Deal"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagMap {
    entries: HashMap<String, String>,
}

impl TagMap {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a mapping from `(tag, url)` pairs, normalizing keys.
    ///
    /// Unprefixed keys take precedence over prefixed ones that normalize to
    /// the same local name; among prefixed duplicates the first one wins.
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut bare = Vec::new();
        let mut prefixed = Vec::new();

        for (key, url) in entries {
            let key = key.as_ref().trim();
            let url: String = url.into();
            let url = url.trim();
            if key.is_empty() || url.is_empty() {
                continue;
            }
            let local = local_name(key);
            if local.is_empty() {
                continue;
            }
            if local.len() == key.len() {
                bare.push((local.to_string(), url.to_string()));
            } else {
                prefixed.push((local.to_string(), url.to_string()));
            }
        }

        let mut map = HashMap::with_capacity(bare.len() + prefixed.len());
        for (key, url) in bare {
            map.insert(key, url);
        }
        for (key, url) in prefixed {
            map.entry(key).or_insert(url);
        }

        Self { entries: map }
    }

    /// Parses the JSON object form of the mapping.
    ///
    /// Non-string values are treated as blank URLs and skipped.
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        let object: Map<String, Value> = serde_json::from_str(json)?;
        let total = object.len();

        let map = Self::from_entries(object.into_iter().filter_map(|(key, value)| match value {
            Value::String(url) => Some((key, url)),
            _ => None,
        }));

        if map.len() < total {
            tracing::debug!(
                "tag mapping: kept {} of {} entries (blank, non-string or duplicate URLs dropped)",
                map.len(),
                total
            );
        }

        Ok(map)
    }

    /// Returns the documentation URL for a local tag name.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Returns true if the local tag name has a documentation URL.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(tag, url)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Shared holder for the current [`TagMap`] snapshot.
///
/// Readers take an `Arc` once per operation; [`replace`](Self::replace)
/// swaps the pointer without disturbing scans that still hold the old one.
#[derive(Debug, Default)]
pub struct MappingStore {
    current: RwLock<Arc<TagMap>>,
}

impl MappingStore {
    pub fn new(map: TagMap) -> Self {
        Self {
            current: RwLock::new(Arc::new(map)),
        }
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Arc<TagMap> {
        Arc::clone(&self.current.read())
    }

    /// Installs a new mapping and returns the previous snapshot.
    pub fn replace(&self, map: TagMap) -> Arc<TagMap> {
        let next = Arc::new(map);
        std::mem::replace(&mut *self.current.write(), next)
    }
}
