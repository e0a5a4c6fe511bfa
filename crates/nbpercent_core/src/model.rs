//! Notebook document model.
//!
//! A [`NotebookDocument`] is an ordered list of [`Cell`]s plus the header
//! metadata found under the `jupyter:` root of the percent file's YAML header.
//! Documents are only created through [`NotebookDocument::new`] or the parser,
//! and both validate, so every document value can be serialized without error
//! and parses back to itself.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{PercentError, Result};
use crate::escape;
use crate::header::{self, HeaderBuilder};
use crate::language;
use crate::marker;

/// Header metadata: the mapping under `jupyter:`, in file order.
pub type HeaderMetadata = IndexMap<String, serde_yaml::Value>;

/// Per-cell metadata. Empty means the cell has none.
pub type CellMetadata = IndexMap<String, serde_json::Value>;

/// The two kinds of cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum CellKind {
    /// Narrative text, escaped behind the comment token
    Markdown,
    /// Executable source, written verbatim
    Code,
}

impl CellKind {
    /// The tag used in marker annotations (`markdown` / `code`).
    pub fn as_str(&self) -> &'static str {
        match self {
            CellKind::Markdown => "markdown",
            CellKind::Code => "code",
        }
    }

    /// Parse a marker annotation tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "markdown" => Some(CellKind::Markdown),
            "code" => Some(CellKind::Code),
            _ => None,
        }
    }
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One notebook cell.
///
/// `source` holds the cell body one line per entry, without line terminators.
/// Markdown lines never include the comment prefix used to escape them.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "cell_type", rename_all = "snake_case")]
pub enum Cell {
    /// A markdown cell
    Markdown {
        /// Body lines
        source: Vec<String>,
        /// Cell metadata
        #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
        metadata: CellMetadata,
    },
    /// A code cell
    Code {
        /// Body lines
        source: Vec<String>,
        /// Cell metadata
        #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
        metadata: CellMetadata,
    },
}

impl Cell {
    /// Create a cell of the given kind with no metadata.
    pub fn new(kind: CellKind, source: Vec<String>) -> Self {
        let metadata = CellMetadata::new();
        match kind {
            CellKind::Markdown => Cell::Markdown { source, metadata },
            CellKind::Code => Cell::Code { source, metadata },
        }
    }

    /// Create a markdown cell from its lines.
    pub fn markdown<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Cell::new(CellKind::Markdown, lines.into_iter().map(Into::into).collect())
    }

    /// Create a code cell from its lines.
    pub fn code<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Cell::new(CellKind::Code, lines.into_iter().map(Into::into).collect())
    }

    /// Create a cell from multi-line text.
    ///
    /// Splits on `\n` (dropping a `\r` before it). Empty text gives an empty
    /// body, so `Cell::from_text(kind, "")` and a cell with one empty line are
    /// different cells.
    pub fn from_text(kind: CellKind, text: &str) -> Self {
        let source = if text.is_empty() {
            Vec::new()
        } else {
            text.split('\n')
                .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
                .collect()
        };
        Cell::new(kind, source)
    }

    /// Add one metadata entry (builder pattern).
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata_mut().insert(key.into(), value);
        self
    }

    /// The cell's kind.
    pub fn kind(&self) -> CellKind {
        match self {
            Cell::Markdown { .. } => CellKind::Markdown,
            Cell::Code { .. } => CellKind::Code,
        }
    }

    /// Body lines.
    pub fn source(&self) -> &[String] {
        match self {
            Cell::Markdown { source, .. } | Cell::Code { source, .. } => source,
        }
    }

    /// Cell metadata.
    pub fn metadata(&self) -> &CellMetadata {
        match self {
            Cell::Markdown { metadata, .. } | Cell::Code { metadata, .. } => metadata,
        }
    }

    /// Mutable cell metadata.
    pub fn metadata_mut(&mut self) -> &mut CellMetadata {
        match self {
            Cell::Markdown { metadata, .. } | Cell::Code { metadata, .. } => metadata,
        }
    }

    /// Body as a single string, lines joined with `\n`.
    pub fn text(&self) -> String {
        self.source().join("\n")
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind()
            && self.source() == other.source()
            && json_map_eq(self.metadata(), other.metadata())
    }
}

/// A notebook: header metadata and an ordered list of cells.
#[derive(Debug, Clone)]
pub struct NotebookDocument {
    header_metadata: HeaderMetadata,
    cells: Vec<Cell>,
    /// YAML rendering of the header, produced while validating.
    header_yaml: String,
}

impl NotebookDocument {
    /// Create a document, validating the header and every cell.
    ///
    /// Fails with `InvalidMetadata` when `kernelspec.language` is missing,
    /// and with `InvalidCell` when a cell cannot be written as percent text.
    /// That includes a final code cell ending in an empty line, which would
    /// leave blank lines after the last newline of the file.
    ///
    /// # Examples
    ///
    /// ```
    /// use nbpercent_core::{Cell, HeaderBuilder, NotebookDocument};
    ///
    /// let header = HeaderBuilder::new("python").build();
    /// let doc = NotebookDocument::new(header, vec![Cell::code(["print(1)"])]).unwrap();
    /// assert_eq!(doc.comment_token(), "#");
    /// assert_eq!(doc.len(), 1);
    /// ```
    pub fn new(header_metadata: HeaderMetadata, cells: Vec<Cell>) -> Result<Self> {
        let header_yaml = validate_header(&header_metadata)?;
        let token = document_token(&header_metadata);
        for (index, cell) in cells.iter().enumerate() {
            validate_cell(index, cell, token)?;
        }
        if let Some(last) = cells.last() {
            validate_last_cell(cells.len() - 1, last)?;
        }

        Ok(Self {
            header_metadata,
            cells,
            header_yaml,
        })
    }

    /// Create a document with a header produced by `builder`.
    pub fn for_kernel(builder: &HeaderBuilder, cells: Vec<Cell>) -> Result<Self> {
        Self::new(builder.build(), cells)
    }

    /// Header metadata.
    pub fn header_metadata(&self) -> &HeaderMetadata {
        &self.header_metadata
    }

    /// Cells, in order.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the document has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The `kernelspec.language` value.
    pub fn language(&self) -> &str {
        header::get_str(&self.header_metadata, header::LANGUAGE_KEY).unwrap_or_default()
    }

    /// The line-comment token for the document's language.
    pub fn comment_token(&self) -> &'static str {
        document_token(&self.header_metadata)
    }

    /// The `jupytext.encoding` coding comment, if any.
    pub fn encoding(&self) -> Option<&str> {
        header::get_str(&self.header_metadata, header::ENCODING_KEY)
    }

    /// Append a cell, validating it first.
    pub fn push_cell(&mut self, cell: Cell) -> Result<()> {
        validate_cell(self.cells.len(), &cell, self.comment_token())?;
        validate_last_cell(self.cells.len(), &cell)?;
        self.cells.push(cell);
        Ok(())
    }

    /// Take the document apart.
    pub fn into_parts(self) -> (HeaderMetadata, Vec<Cell>) {
        (self.header_metadata, self.cells)
    }

    pub(crate) fn header_yaml(&self) -> &str {
        &self.header_yaml
    }
}

/// Equality is order-sensitive all the way down: header keys, nested mapping
/// keys and cell metadata keys must appear in the same order.
impl PartialEq for NotebookDocument {
    fn eq(&self, other: &Self) -> bool {
        self.header_metadata.len() == other.header_metadata.len()
            && self
                .header_metadata
                .iter()
                .zip(&other.header_metadata)
                .all(|((ka, va), (kb, vb))| ka == kb && yaml_eq(va, vb))
            && self.cells == other.cells
    }
}

/// Create a document. See [`NotebookDocument::new`].
pub fn new_document(header_metadata: HeaderMetadata, cells: Vec<Cell>) -> Result<NotebookDocument> {
    NotebookDocument::new(header_metadata, cells)
}

fn document_token(header_metadata: &HeaderMetadata) -> &'static str {
    language::comment_token(
        header::get_str(header_metadata, header::LANGUAGE_KEY).unwrap_or_default(),
    )
}

fn invalid_metadata(key: &str, reason: impl Into<String>) -> PercentError {
    PercentError::InvalidMetadata {
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Check the header and return its YAML rendering.
fn validate_header(header_metadata: &HeaderMetadata) -> Result<String> {
    let language = match header::get_path(header_metadata, header::LANGUAGE_KEY) {
        None => {
            return Err(invalid_metadata(header::LANGUAGE_KEY, "required key is missing"));
        }
        Some(value) => value
            .as_str()
            .ok_or_else(|| invalid_metadata(header::LANGUAGE_KEY, "must be a string"))?,
    };
    let token = language::comment_token(language);

    if let Some(value) = header::get_path(header_metadata, header::ENCODING_KEY) {
        let cookie = value
            .as_str()
            .ok_or_else(|| invalid_metadata(header::ENCODING_KEY, "must be a string"))?;
        if cookie.contains(['\n', '\r'])
            || !header::is_encoding_cookie(token, cookie)
            || escape::looks_like_marker(token, cookie)
        {
            return Err(invalid_metadata(
                header::ENCODING_KEY,
                format!("'{cookie}' is not a '{token}' coding comment"),
            ));
        }
    }

    let yaml = header::render_yaml(header_metadata)
        .map_err(|err| invalid_metadata("jupyter", err.to_string()))?;
    let delimiter = header::delimiter(token);
    for line in yaml.lines() {
        let emitted = escape::escape_line(token, line);
        if emitted == delimiter || escape::looks_like_marker(token, &emitted) {
            return Err(invalid_metadata(
                "jupyter",
                format!("header line '{line}' would end the header block"),
            ));
        }
    }

    Ok(yaml)
}

fn invalid_cell(index: usize, reason: String) -> PercentError {
    PercentError::InvalidCell { index, reason }
}

/// Check that a cell survives a serialize/parse cycle unchanged.
fn validate_cell(index: usize, cell: &Cell, token: &str) -> Result<()> {
    for line in cell.source() {
        if line.contains(['\n', '\r']) {
            return Err(invalid_cell(
                index,
                "source lines must not contain line breaks".to_string(),
            ));
        }
        let emitted = escape::emit_line(cell.kind(), token, line);
        if escape::looks_like_marker(token, &emitted) {
            return Err(invalid_cell(
                index,
                format!("{} line '{line}' would be read as a cell marker", cell.kind()),
            ));
        }
    }

    if let Some(key) = cell.metadata().keys().find(|key| !marker::is_valid_key(key)) {
        return Err(invalid_cell(
            index,
            format!("metadata key '{key}' cannot be written on a marker line"),
        ));
    }

    Ok(())
}

/// The final cell is followed only by the file's trailing newline.
fn validate_last_cell(index: usize, cell: &Cell) -> Result<()> {
    if cell.kind() == CellKind::Code && cell.source().last().is_some_and(|line| line.is_empty()) {
        return Err(invalid_cell(
            index,
            "the last code cell must not end with an empty line".to_string(),
        ));
    }
    Ok(())
}

fn yaml_eq(a: &serde_yaml::Value, b: &serde_yaml::Value) -> bool {
    use serde_yaml::Value;

    match (a, b) {
        (Value::Mapping(x), Value::Mapping(y)) => {
            x.len() == y.len()
                && x.iter()
                    .zip(y.iter())
                    .all(|((ka, va), (kb, vb))| yaml_eq(ka, kb) && yaml_eq(va, vb))
        }
        (Value::Sequence(x), Value::Sequence(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(p, q)| yaml_eq(p, q))
        }
        (Value::Tagged(x), Value::Tagged(y)) => x.tag == y.tag && yaml_eq(&x.value, &y.value),
        _ => a == b,
    }
}

fn json_eq(a: &serde_json::Value, b: &serde_json::Value) -> bool {
    use serde_json::Value;

    match (a, b) {
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .zip(y)
                    .all(|((ka, va), (kb, vb))| ka == kb && json_eq(va, vb))
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(p, q)| json_eq(p, q))
        }
        _ => a == b,
    }
}

fn json_map_eq(a: &CellMetadata, b: &CellMetadata) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|((ka, va), (kb, vb))| ka == kb && json_eq(va, vb))
}
