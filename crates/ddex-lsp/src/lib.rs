pub mod cli;
pub mod config;
pub mod document;
pub mod handlers;
pub mod line_index;
pub mod server;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types
pub use ddex_core::{DdexError, Result};
pub use server::Backend;
