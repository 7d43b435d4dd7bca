//! LSP protocol handlers.
//!
//! - [`hover`]: documentation link for the tag under the cursor
//! - [`links`]: document links over every mapped tag
//! - [`diagnostics`]: evaluation, publishing and pull diagnostics
//! - [`commands`]: `workspace/executeCommand` surface for host glue
//!
//! Handlers never fail the request: a missing document or an unusable
//! argument degrades to an empty response and a log line.

pub mod commands;
pub mod diagnostics;
pub mod hover;
pub mod links;
