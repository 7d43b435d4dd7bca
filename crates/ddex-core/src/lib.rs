//! Core text processing for ddex-lsp.
//!
//! Everything here is pure and synchronous apart from the [`Debouncer`],
//! which needs a tokio runtime:
//!
//! - [`TagMap`] / [`MappingStore`]: tag → documentation URL table
//! - [`resolve_tag_at`]: tag under a cursor
//! - [`scan_mapped_tags`]: every documented tag in a document
//! - [`detect_schema`]: declared ERN version and XSD
//! - [`Aggregator`]: validity verdict from syntax and external diagnostics
//!
//! # Examples
//!
//! ```
//! use ddex_core::{TagMap, resolve_tag_at, scan_mapped_tags};
//!
//! let map = TagMap::from_json_str(r#"{"ReleaseList": "https://example.org/release-list"}"#)
//!     .unwrap();
//!
//! let tag = resolve_tag_at("<ern:ReleaseList>", 5).unwrap();
//! assert_eq!(map.lookup(&tag), Some("https://example.org/release-list"));
//!
//! let text = "<ern:ReleaseList><Other/></ern:ReleaseList>";
//! assert_eq!(scan_mapped_tags(text, &map).count(), 1);
//! ```

pub mod aggregator;
pub mod debounce;
pub mod error;
pub mod event;
pub mod mapping;
pub mod resolver;
pub mod scanner;
pub mod schema;
pub mod syntax;

pub use aggregator::{
    Aggregator, AggregatorConfig, DiagnosticEntry, Evaluation, OWN_SOURCE, Phase, Severity,
    ValidationStatus,
};
pub use debounce::{DEFAULT_DEBOUNCE, Debouncer};
pub use error::{DdexError, Result};
pub use event::DocumentEvent;
pub use mapping::{MappingStore, TagMap};
pub use resolver::{local_name, resolve_tag_at};
pub use scanner::{TagOccurrence, scan_mapped_tags};
pub use schema::{DEFAULT_HEADER_WINDOW, SchemaInfo, detect_schema, header_window};
pub use syntax::{SyntaxError, check_well_formed};
