//! Command-line interface.
//!
//! Without a subcommand the binary speaks LSP over stdio. The other
//! subcommands run the same core logic once against a file, which is handy
//! for scripting and for checking a mapping table.

use crate::document::StatusReport;
use crate::line_index::LineIndex;
use clap::{Parser, Subcommand, ValueEnum};
use ddex_core::{Evaluation, Severity, TagMap, resolve_tag_at, scan_mapped_tags};
use std::fmt::Write as _;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "ddex-lsp")]
#[command(about = "Language server and checker for DDEX ERN XML documents")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the language server on stdio (default)
    Serve,

    /// Check well-formedness and detect the ERN schema
    Check {
        /// XML file to check
        file: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List every tag with a documentation link
    Tags {
        /// XML file to scan
        file: PathBuf,

        /// Path to ddex-map.json
        #[arg(long)]
        map: PathBuf,
    },

    /// Resolve the tag at a position
    Resolve {
        /// XML file
        file: PathBuf,

        /// Line number (1-based)
        line: u32,

        /// Column number (1-based, in characters)
        column: u32,

        /// Path to ddex-map.json
        #[arg(long)]
        map: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Information => "info",
    }
}

/// Renders an evaluation: the tooltip followed by one line per diagnostic,
/// or the status report as JSON.
pub fn render_check(evaluation: &Evaluation, format: OutputFormat) -> serde_json::Result<String> {
    if format == OutputFormat::Json {
        return serde_json::to_string_pretty(&StatusReport::with_diagnostics(None, evaluation));
    }

    let mut out = evaluation.tooltip.clone();
    for d in &evaluation.merged {
        let _ = write!(
            out,
            "\n{}:{}: {}: {}",
            d.range.start.line + 1,
            d.range.start.character + 1,
            severity_label(d.severity),
            d.message
        );
    }
    Ok(out)
}

/// One `line:column<TAB>name<TAB>url` row per mapped tag, 1-based.
pub fn render_tags(content: &str, map: &TagMap) -> String {
    let index = LineIndex::new(content);
    scan_mapped_tags(content, map)
        .filter_map(|occ| {
            let url = map.lookup(&occ.local_name)?;
            let pos = index.position(content, occ.offset);
            Some(format!(
                "{}:{}\t{}\t{}",
                pos.line + 1,
                pos.character + 1,
                occ.local_name,
                url
            ))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Resolves the tag at a 1-based line and character column.
///
/// Returns `None` when the position is not on a tag name.
pub fn render_resolve(content: &str, line: u32, column: u32, map: &TagMap) -> Option<String> {
    let index = LineIndex::new(content);
    let text = index.line(content, line.checked_sub(1)?)?;
    let chars = column.checked_sub(1)? as usize;
    let byte_column = text
        .char_indices()
        .nth(chars)
        .map_or(text.len(), |(i, _)| i);

    let tag = resolve_tag_at(text, byte_column)?;
    Some(match map.lookup(&tag) {
        Some(url) => format!("{tag}\t{url}"),
        None => tag,
    })
}
