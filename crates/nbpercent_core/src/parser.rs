//! Percent text → document.
//!
//! The parser makes one pass over the lines. Every line ends up as exactly
//! one of: the coding comment, a header line, a preamble line (between the
//! header and the first marker, discarded), a marker line, a cell body line,
//! or a blank separator.
//!
//! Any error aborts the parse; no partial document is returned.

use crate::config::CodecOptions;
use crate::error::{PercentError, Result};
use crate::escape::{self, Classification};
use crate::header;
use crate::language;
use crate::marker::{self, Marker};
use crate::model::{Cell, CellKind, NotebookDocument};

/// Parse percent text with the default options.
///
/// # Examples
///
/// ```
/// use nbpercent_core::{parse, CellKind};
///
/// let text = concat!(
///     "# ---\n",
///     "# jupyter:\n",
///     "#   kernelspec:\n",
///     "#     language: python\n",
///     "# ---\n",
///     "\n",
///     "# %% [markdown]\n",
///     "# # Title\n",
///     "\n",
///     "# %%\n",
///     "print('hi')\n",
/// );
/// let doc = parse(text).unwrap();
/// assert_eq!(doc.len(), 2);
/// assert_eq!(doc.cells()[0].kind(), CellKind::Markdown);
/// assert_eq!(doc.cells()[0].source(), ["# Title"]);
/// assert_eq!(doc.cells()[1].source(), ["print('hi')"]);
/// ```
pub fn parse(text: &str) -> Result<NotebookDocument> {
    parse_with(text, &CodecOptions::default())
}

/// Parse percent text.
pub fn parse_with(text: &str, options: &CodecOptions) -> Result<NotebookDocument> {
    let mut lines = text.lines().enumerate().map(|(index, line)| (index + 1, line));

    // Coding comment and opening delimiter
    let (first_number, first) = lines.next().ok_or_else(|| PercentError::MalformedHeader {
        line: 1,
        reason: "input is empty".to_string(),
    })?;
    let (token, cookie, open_line) = match header::opening_token(first) {
        Some(token) => (token, None, first_number),
        None => {
            let token = header::cookie_token(first).ok_or_else(|| missing_header(first_number))?;
            match lines.next() {
                Some((number, line)) if header::opening_token(line) == Some(token) => {
                    (token, Some(first), number)
                }
                Some((number, _)) => return Err(missing_header(number)),
                None => return Err(missing_header(first_number + 1)),
            }
        }
    };

    // Header block
    let delimiter = header::delimiter(token);
    let mut header_lines = Vec::new();
    let mut closed = false;
    for (_, line) in lines.by_ref() {
        if line == delimiter {
            closed = true;
            break;
        }
        if escape::looks_like_marker(token, line) {
            break;
        }
        header_lines.push(line);
    }
    if !closed {
        return Err(PercentError::UnterminatedHeader { line: open_line });
    }

    let mut header_metadata = header::decode_block(token, open_line + 1, &header_lines)?;
    if let Some(cookie) = cookie {
        match header::get_str(&header_metadata, header::ENCODING_KEY) {
            Some(existing) if existing != cookie => {
                log::warn!(
                    "Coding comment '{}' differs from {} '{}'; keeping the header value",
                    cookie,
                    header::ENCODING_KEY,
                    existing
                );
            }
            Some(_) => {}
            None => {
                if !header::set_encoding(&mut header_metadata, cookie) {
                    return Err(PercentError::MalformedHeader {
                        line: open_line,
                        reason: "'jupytext' must be a mapping".to_string(),
                    });
                }
            }
        }
    }

    let language = header::get_str(&header_metadata, header::LANGUAGE_KEY).ok_or_else(|| {
        PercentError::MalformedHeader {
            line: open_line,
            reason: format!("missing string value for '{}'", header::LANGUAGE_KEY),
        }
    })?;
    let expected = language::comment_token(language);
    if expected != token {
        return Err(PercentError::MalformedHeader {
            line: open_line,
            reason: format!(
                "header is commented with '{token}' but '{language}' uses '{expected}'"
            ),
        });
    }
    log::debug!(
        "Header at line {} closed, {} lines, language '{}'",
        open_line,
        header_lines.len(),
        language
    );

    // Cells
    let mut cells = Vec::new();
    let mut pending: Option<PendingCell> = None;
    let mut discarded = 0usize;
    for (number, line) in lines {
        if let Some(marker) = marker::parse_marker(token, line, number)? {
            if let Some(cell) = pending.take() {
                cells.push(cell.finish(token, options.classification, false)?);
            }
            pending = Some(PendingCell::new(marker, number));
        } else if let Some(cell) = pending.as_mut() {
            cell.body.push((number, line));
        } else if !escape::is_blank(line) {
            discarded += 1;
        }
    }
    if let Some(cell) = pending {
        cells.push(cell.finish(token, options.classification, true)?);
    }

    if discarded > 0 {
        log::warn!(
            "Discarded {} non-blank lines between the header and the first cell marker",
            discarded
        );
    }
    log::debug!("Parsed {} cells", cells.len());

    NotebookDocument::new(header_metadata, cells).map_err(|err| match err {
        PercentError::InvalidMetadata { key, reason } => PercentError::MalformedHeader {
            line: open_line,
            reason: format!("{key}: {reason}"),
        },
        other => other,
    })
}

fn missing_header(line: usize) -> PercentError {
    PercentError::MalformedHeader {
        line,
        reason: "expected a header delimiter such as '# ---'".to_string(),
    }
}

/// A cell whose body is still being collected.
struct PendingCell<'a> {
    marker: Marker,
    marker_line: usize,
    body: Vec<(usize, &'a str)>,
}

impl<'a> PendingCell<'a> {
    fn new(marker: Marker, marker_line: usize) -> Self {
        Self {
            marker,
            marker_line,
            body: Vec::new(),
        }
    }

    fn ambiguous(&self, line: usize) -> PercentError {
        PercentError::AmbiguousCellClassification {
            line,
            marker_line: self.marker_line,
        }
    }

    /// Classify the body and build the cell.
    ///
    /// `is_last` is true for the final cell, which has no separator after it.
    fn finish(self, token: &str, classification: Classification, is_last: bool) -> Result<Cell> {
        if let Some((number, _)) = self.body.iter().find(|(_, line)| line.contains('\r')) {
            return Err(PercentError::MalformedCellBody {
                line: *number,
                reason: "carriage return inside a line".to_string(),
            });
        }

        let lines: Vec<&str> = self.body.iter().map(|(_, line)| *line).collect();
        let kind = escape::classify(token, self.marker.kind, classification, &lines)
            .map_err(|index| self.ambiguous(self.body[index].0))?;

        let mut body = self.body.as_slice();
        let source = match kind {
            CellKind::Markdown => {
                // The serializer never writes a raw blank line inside markdown.
                while let Some(((_, line), rest)) = body.split_last()
                    && escape::is_blank(line)
                {
                    body = rest;
                }
                let mut source = Vec::with_capacity(body.len());
                for (number, line) in body {
                    if escape::is_blank(line) {
                        source.push(String::new());
                        continue;
                    }
                    let text = escape::unescape_line(token, line)
                        .ok_or_else(|| self.ambiguous(*number))?;
                    source.push(text.to_string());
                }
                source
            }
            CellKind::Code => {
                // One empty line separates a cell from the next marker. After
                // the last cell every empty line is past the final newline.
                while let Some(((_, line), rest)) = body.split_last()
                    && line.is_empty()
                {
                    body = rest;
                    if !is_last {
                        break;
                    }
                }
                body.iter().map(|(_, line)| line.to_string()).collect()
            }
        };

        let mut cell = Cell::new(kind, source);
        *cell.metadata_mut() = self.marker.metadata;
        Ok(cell)
    }
}
