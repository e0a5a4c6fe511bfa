//! Document → percent text.
//!
//! Output layout:
//!
//! ```text
//! # -*- coding: utf-8 -*-      <- only when jupytext.encoding is set
//! # ---
//! # jupyter:
//! #   ...
//! # ---
//!
//! # %% [markdown]
//! # # Title
//! #
//! # body text
//!
//! # %%
//! Q = KroneckerQuiver(3)
//! Q
//! ```
//!
//! One blank line separates the header from the first cell and each cell from
//! the next. The text ends with a single newline.

use crate::config::CodecOptions;
use crate::escape;
use crate::header;
use crate::marker::Marker;
use crate::model::{Cell, CellKind, NotebookDocument};

/// Serialize a document with the default options.
///
/// # Examples
///
/// ```
/// use nbpercent_core::{parse, serialize, Cell, HeaderBuilder, NotebookDocument};
///
/// let header = HeaderBuilder::new("python").build();
/// let doc = NotebookDocument::new(header, vec![Cell::markdown(["# Title"])]).unwrap();
/// let text = serialize(&doc);
/// assert!(text.ends_with("# %% [markdown]\n# # Title\n"));
/// assert_eq!(parse(&text).unwrap(), doc);
/// ```
pub fn serialize(document: &NotebookDocument) -> String {
    serialize_with(document, &CodecOptions::default())
}

/// Serialize a document.
pub fn serialize_with(document: &NotebookDocument, options: &CodecOptions) -> String {
    let token = document.comment_token();
    let mut out = String::new();

    if let Some(cookie) = document.encoding() {
        push_line(&mut out, cookie);
    }
    for line in header::escape_block(document.header_yaml(), token) {
        push_line(&mut out, &line);
    }

    for cell in document.cells() {
        out.push('\n');
        push_line(&mut out, &marker_for(cell, token, options).render(token));
        for line in cell.source() {
            push_line(&mut out, &escape::emit_line(cell.kind(), token, line));
        }
    }

    log::debug!(
        "Serialized {} cells ({} bytes, language '{}')",
        document.len(),
        out.len(),
        document.language()
    );
    out
}

/// The marker line for a cell.
///
/// Markdown cells are always tagged. Code cells are tagged only when their
/// body would otherwise be read back as markdown or as ambiguous.
fn marker_for(cell: &Cell, token: &str, options: &CodecOptions) -> Marker {
    let kind = match cell.kind() {
        CellKind::Markdown => Some(CellKind::Markdown),
        CellKind::Code => match escape::infer_kind(token, cell.source()) {
            Ok(CellKind::Code) => None,
            _ => Some(CellKind::Code),
        },
    };

    Marker {
        style: options.marker_style,
        kind,
        metadata: cell.metadata().clone(),
    }
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::MarkerStyle;
    use crate::test_utils::sage_document;
    use serde_json::json;

    const SAGE_HEADER_TEXT: &str = "\
# ---
# jupyter:
#   kernelspec:
#     language: python
#     name: sagemath
#     display_name: SageMath 10.3
#   jupytext:
#     text_representation:
#       extension: .py
#       format_name: percent
#       format_version: '1.3'
# ---
";

    #[test]
    fn test_single_code_cell() {
        let doc = sage_document(vec![Cell::code(["Q = KroneckerQuiver(3)", "Q"])]);
        let expected = format!("{SAGE_HEADER_TEXT}\n# %%\nQ = KroneckerQuiver(3)\nQ\n");
        assert_eq!(serialize(&doc), expected);
    }

    #[test]
    fn test_markdown_cell_escaping() {
        let doc = sage_document(vec![Cell::markdown(["# Title", "", "body text"])]);
        let text = serialize(&doc);
        assert!(text.ends_with("\n\n# %% [markdown]\n# # Title\n#\n# body text\n"));
        assert!(!text.lines().any(|line| line.ends_with(' ')));
    }

    #[test]
    fn test_zero_cells_is_header_only() {
        let doc = sage_document(Vec::new());
        assert_eq!(serialize(&doc), SAGE_HEADER_TEXT);
    }

    #[test]
    fn test_one_blank_line_between_cells() {
        let doc = sage_document(vec![Cell::code(["a"]), Cell::code(["b"])]);
        let text = serialize(&doc);
        assert!(text.ends_with("# ---\n\n# %%\na\n\n# %%\nb\n"));
        assert!(!text.ends_with("\n\n"));
    }

    #[test]
    fn test_code_cell_that_reads_as_markdown_is_tagged() {
        let doc = sage_document(vec![
            Cell::code(["# only a comment"]),
            Cell::code(["# %display latex", "factor(x^10 - 1)"]),
            Cell::code(["plain()"]),
        ]);
        let text = serialize(&doc);
        let markers: Vec<&str> = text.lines().filter(|line| line.starts_with("# %%")).collect();
        assert_eq!(markers, vec!["# %% [code]", "# %% [code]", "# %%"]);
    }

    #[test]
    fn test_metadata_annotation() {
        let doc = sage_document(vec![
            Cell::code(["x"]).with_metadata("tags", json!(["hide-input"])),
            Cell::markdown(["note"]).with_metadata("lang", json!("fr")),
        ]);
        let text = serialize(&doc);
        assert!(text.contains("\n# %% tags=[\"hide-input\"]\nx\n"));
        assert!(text.contains("\n# %% [markdown] lang=\"fr\"\n# note\n"));
    }

    #[test]
    fn test_doubled_marker_style() {
        let doc = sage_document(vec![Cell::markdown(["hi"]), Cell::code(["1"])]);
        let options = CodecOptions::default().with_marker_style(MarkerStyle::Doubled);
        let text = serialize_with(&doc, &options);
        assert!(text.contains("\n##%% [markdown]\n# hi\n\n##%%\n1\n"));
    }

    #[test]
    fn test_encoding_cookie_is_first_line() {
        let mut header = crate::test_utils::sage_header();
        header::set_encoding(&mut header, "# -*- coding: utf-8 -*-");
        let doc = NotebookDocument::new(header, Vec::new()).unwrap();
        let text = serialize(&doc);
        assert!(text.starts_with("# -*- coding: utf-8 -*-\n# ---\n# jupyter:\n"));
        assert!(text.contains("#     encoding: '# -*- coding: utf-8 -*-'\n"));
    }

    #[test]
    fn test_other_comment_token() {
        let header = header::HeaderBuilder::new("rust").build();
        let doc = NotebookDocument::new(header, vec![Cell::markdown(["Doc"]), Cell::code(["let x = 1;"])])
            .unwrap();
        let text = serialize(&doc);
        assert!(text.starts_with("// ---\n// jupyter:\n"));
        assert!(text.ends_with("\n// %% [markdown]\n// Doc\n\n// %%\nlet x = 1;\n"));
    }
}
