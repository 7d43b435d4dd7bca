//! XML well-formedness check.
//!
//! Built on `roxmltree`, which rejects unbalanced tags, invalid characters,
//! unknown namespace prefixes and the like while tracking the error position.

use roxmltree::{Document, ParsingOptions};

/// A well-formedness failure.
///
/// `line` and `column` are 0-based, with `column` counted in UTF-16 code
/// units like an LSP position. When the parser reports no usable position
/// the error is anchored at the start of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

/// Checks that `text` is a well-formed XML document.
///
/// # Examples
///
/// ```
/// use ddex_core::check_well_formed;
///
/// assert!(check_well_formed("<Foo><Bar/></Foo>").is_ok());
///
/// let err = check_well_formed("<Foo><Bar></Foo>").unwrap_err();
/// assert_eq!(err.line, 0);
/// ```
pub fn check_well_formed(text: &str) -> Result<(), SyntaxError> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };

    match Document::parse_with_options(text, options) {
        Ok(_) => Ok(()),
        Err(e) => {
            let pos = e.pos();
            let line = pos.row.saturating_sub(1);
            Err(SyntaxError {
                message: e.to_string(),
                line,
                column: utf16_column(text, line, pos.col.saturating_sub(1)),
            })
        }
    }
}

/// Converts roxmltree's character column into UTF-16 code units.
fn utf16_column(text: &str, line: u32, chars: u32) -> u32 {
    let chars = chars as usize;
    let units = match text.lines().nth(line as usize) {
        Some(l) => l.chars().take(chars).map(char::len_utf16).sum(),
        None => chars,
    };
    units as u32
}
