//! Document management module.
//!
//! - `state`: document and server state
//! - `lifecycle`: event dispatch and debounced evaluation scheduling
//! - `loader`: disk loading for documents and the tag mapping

mod lifecycle;
mod loader;
mod state;

pub use lifecycle::{ensure_document_loaded, handle_event, schedule_evaluation};
pub use loader::{
    MAX_FILE_SIZE, load_document_from_disk, load_mapping, load_mapping_or_empty, read_document,
};
pub use state::{DocumentState, ServerState, StatusReport};
