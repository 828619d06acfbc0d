//! Post-processing of the text read back from the editor.
//!
//! `.svox` files are written with CRLF line endings regardless of what the
//! editor hands back, so output is byte-stable across platforms and editor
//! builds. Both `\n` and `\r\n` map to `\r\n`; a lone `\r` is left as-is.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r?\n").unwrap());

/// Normalise every line break in `input` to `\r\n`.
pub fn normalise_line_endings(input: &str) -> String {
    RE_LINE_BREAK.replace_all(input, "\r\n").into_owned()
}
