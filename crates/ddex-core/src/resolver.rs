//! Tag name under the cursor.
//!
//! Resolution is lexical and single-line: the nearest `<` at or before the
//! cursor starts the candidate tag. Tags spanning lines are not resolved.

use once_cell::sync::Lazy;
use regex::Regex;

/// `<` followed by an optional closing slash and an XML-ish name.
static TAG_AT_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^</?([A-Za-z_][A-Za-z0-9_:\-]*)").unwrap());

/// Strips any namespace prefix, returning the segment after the last colon.
///
/// # Examples
///
/// ```
/// use ddex_core::local_name;
///
/// assert_eq!(local_name("ern:ReleaseList"), "ReleaseList");
/// assert_eq!(local_name("a:b:Deal"), "Deal");
/// assert_eq!(local_name("Deal"), "Deal");
/// ```
pub fn local_name(name: &str) -> &str {
    match name.rfind(':') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}

/// Returns the local name of the tag at `column` (a byte offset into `line`).
///
/// The character at `column` is included in the leftward search, so a
/// cursor sitting on `<` still resolves. Columns past the end of the line
/// are clamped to the end.
///
/// # Examples
///
/// ```
/// use ddex_core::resolve_tag_at;
///
/// let line = r#"  <ern:SoundRecording LanguageAndScriptCode="en">"#;
/// assert_eq!(resolve_tag_at(line, 10).as_deref(), Some("SoundRecording"));
/// assert_eq!(resolve_tag_at("no tags here", 4), None);
/// ```
pub fn resolve_tag_at(line: &str, column: usize) -> Option<String> {
    let search_end = inclusive_end(line, column);
    let lt = line[..search_end].rfind('<')?;

    let caps = TAG_AT_START.captures(&line[lt..])?;
    let name = caps.get(1)?.as_str();

    Some(local_name(name).to_string())
}

/// Byte index just past the character starting at or containing `column`.
fn inclusive_end(line: &str, column: usize) -> usize {
    if column >= line.len() {
        return line.len();
    }
    let mut start = column;
    while !line.is_char_boundary(start) {
        start -= 1;
    }
    line[start..]
        .chars()
        .next()
        .map_or(line.len(), |c| start + c.len_utf8())
}
