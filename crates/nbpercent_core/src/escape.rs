//! Markdown escaping and markdown/code classification.
//!
//! Markdown lines are stored in the text form behind the language's comment
//! token: `<token> <text>`, or the bare `<token>` for an empty line. The same
//! escaping is applied to every line of the header block. Classification is
//! the exact inverse of that rule.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::model::CellKind;

/// How cells whose marker carries no `[markdown]`/`[code]` tag are classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Markdown iff every non-blank body line is escaped, code iff none is.
    /// A mix is reported as `AmbiguousCellClassification`.
    #[default]
    Inferred,

    /// Untagged cells are always code (the jupytext convention).
    Tagged,
}

/// Escape one markdown (or header) line.
///
/// # Examples
///
/// ```
/// use nbpercent_core::escape::escape_line;
///
/// assert_eq!(escape_line("#", "# Title"), "# # Title");
/// assert_eq!(escape_line("#", ""), "#");
/// assert_eq!(escape_line("//", "body"), "// body");
/// ```
pub fn escape_line(token: &str, line: &str) -> String {
    if line.is_empty() {
        token.to_string()
    } else {
        format!("{token} {line}")
    }
}

/// Strip the escape prefix from a line.
///
/// Returns `None` when the line is not escaped with `token`.
pub fn unescape_line<'a>(token: &str, line: &'a str) -> Option<&'a str> {
    let rest = line.strip_prefix(token)?;
    if rest.is_empty() {
        Some(rest)
    } else {
        rest.strip_prefix(' ')
    }
}

/// Whether a line carries the markdown escape prefix.
pub fn is_escaped(token: &str, line: &str) -> bool {
    unescape_line(token, line).is_some()
}

/// Whether a body line counts as blank for classification.
pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// The text form of one source line of a cell of the given kind.
pub fn emit_line<'a>(kind: CellKind, token: &str, line: &'a str) -> Cow<'a, str> {
    match kind {
        CellKind::Markdown => Cow::Owned(escape_line(token, line)),
        CellKind::Code => Cow::Borrowed(line),
    }
}

/// Whether a line looks like a cell marker.
///
/// That is the comment token, optionally a second token, optionally one
/// space, then `%%`. Every such line is either a valid marker or a
/// `MalformedCellMarker`; it can never be cell content.
///
/// ```
/// use nbpercent_core::escape::looks_like_marker;
///
/// assert!(looks_like_marker("#", "# %% [markdown]"));
/// assert!(looks_like_marker("#", "##%%"));
/// assert!(looks_like_marker("#", "#%%"));
/// assert!(!looks_like_marker("#", "x = \"##%%\""));
/// assert!(!looks_like_marker("#", "#   %% indented"));
/// ```
pub fn looks_like_marker(token: &str, line: &str) -> bool {
    let Some(rest) = line.strip_prefix(token) else {
        return false;
    };
    let percent_follows = |s: &str| s.strip_prefix(' ').unwrap_or(s).starts_with("%%");
    percent_follows(rest) || rest.strip_prefix(token).is_some_and(percent_follows)
}

/// Infer a cell's kind from its body lines.
///
/// Blank lines are ignored. A body whose non-blank lines are all escaped is
/// markdown; one with no escaped line (including an empty body) is code. For a
/// mixed body the error holds the index of the first line whose escaping
/// differs from the first non-blank line.
pub fn infer_kind<S: AsRef<str>>(token: &str, lines: &[S]) -> Result<CellKind, usize> {
    let mut expected: Option<bool> = None;
    for (index, line) in lines.iter().enumerate() {
        let line = line.as_ref();
        if is_blank(line) {
            continue;
        }
        let escaped = is_escaped(token, line);
        match expected {
            None => expected = Some(escaped),
            Some(first) if first != escaped => return Err(index),
            Some(_) => {}
        }
    }

    if expected == Some(true) {
        Ok(CellKind::Markdown)
    } else {
        Ok(CellKind::Code)
    }
}

/// Classify a cell from its marker tag and raw body lines.
///
/// A tag always wins. Untagged cells are code in [`Classification::Tagged`]
/// mode and go through [`infer_kind`] otherwise.
pub fn classify<S: AsRef<str>>(
    token: &str,
    tag: Option<CellKind>,
    classification: Classification,
    lines: &[S],
) -> Result<CellKind, usize> {
    match (tag, classification) {
        (Some(kind), _) => Ok(kind),
        (None, Classification::Tagged) => Ok(CellKind::Code),
        (None, Classification::Inferred) => infer_kind(token, lines),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_and_unescape_are_inverse() {
        for line in ["# Title", "", "body text", "  indented", "#", "%% not a marker"] {
            let escaped = escape_line("#", line);
            assert_eq!(unescape_line("#", &escaped), Some(line));
        }
    }

    #[test]
    fn test_unescape_requires_space_after_token() {
        assert_eq!(unescape_line("#", "#x"), None);
        assert_eq!(unescape_line("#", "x"), None);
        assert_eq!(unescape_line("#", "#"), Some(""));
        assert_eq!(unescape_line("--", "-- select"), Some("select"));
    }

    #[test]
    fn test_looks_like_marker_variants() {
        assert!(looks_like_marker("#", "# %%"));
        assert!(looks_like_marker("#", "## %%"));
        assert!(looks_like_marker("#", "# %%x"));
        assert!(looks_like_marker("//", "// %% [markdown]"));
        assert!(looks_like_marker("//", "////%%"));
        assert!(!looks_like_marker("#", "# # %%"));
        assert!(!looks_like_marker("#", "# #%%"));
        assert!(!looks_like_marker("#", "print('# %%')"));
        assert!(!looks_like_marker("#", " # %%"));
        assert!(!looks_like_marker("//", "# %%"));
    }

    #[test]
    fn test_looks_like_marker_with_percent_token() {
        // Matlab's own "%%" section marker is ordinary content here.
        assert!(!looks_like_marker("%", "%%"));
        assert!(looks_like_marker("%", "% %%"));
        assert!(looks_like_marker("%", "%%%%"));
    }

    #[test]
    fn test_infer_kind() {
        assert_eq!(infer_kind("#", &["# # Title", "#", "# body"]), Ok(CellKind::Markdown));
        assert_eq!(infer_kind("#", &["x = 1", "", "x"]), Ok(CellKind::Code));
        assert_eq!(infer_kind::<&str>("#", &[]), Ok(CellKind::Code));
        assert_eq!(infer_kind("#", &["", "  "]), Ok(CellKind::Code));
    }

    #[test]
    fn test_infer_kind_reports_first_conflict() {
        assert_eq!(infer_kind("#", &["# comment", "x = 1"]), Err(1));
        assert_eq!(infer_kind("#", &["x = 1", "", "# comment"]), Err(2));
    }

    #[test]
    fn test_classify_prefers_tag() {
        let empty: [&str; 0] = [];
        assert_eq!(
            classify("#", Some(CellKind::Markdown), Classification::Inferred, &empty),
            Ok(CellKind::Markdown)
        );
        assert_eq!(classify("#", None, Classification::Inferred, &empty), Ok(CellKind::Code));
        assert_eq!(
            classify("#", None, Classification::Tagged, &["# comment"]),
            Ok(CellKind::Code)
        );
        assert_eq!(
            classify("#", None, Classification::Inferred, &["# comment"]),
            Ok(CellKind::Markdown)
        );
    }

    #[test]
    fn test_classification_inverts_escaping() {
        let source = ["# Heading", "", "text with # inside", "   "];
        let escaped: Vec<String> = source
            .iter()
            .map(|line| emit_line(CellKind::Markdown, "#", line).into_owned())
            .collect();
        assert_eq!(infer_kind("#", &escaped), Ok(CellKind::Markdown));
    }
}
