#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Codec options (marker style, classification mode)
pub mod config;

/// Error (common error types)
pub mod error;

/// Markdown escaping and cell classification
pub mod escape;

/// Header block (`# ---` delimited YAML)
pub mod header;

/// Kernel languages and their comment tokens
pub mod language;

/// Cell marker lines
pub mod marker;

/// Document model (cells and header metadata)
pub mod model;

/// Percent text → document
pub mod parser;

/// Document → percent text
pub mod serializer;

#[cfg(test)]
pub mod test_utils;

pub use config::CodecOptions;
pub use error::{PercentError, Result, SerializableError};
pub use escape::Classification;
pub use header::HeaderBuilder;
pub use marker::MarkerStyle;
pub use model::{Cell, CellKind, CellMetadata, HeaderMetadata, NotebookDocument, new_document};
pub use parser::{parse, parse_with};
pub use serializer::{serialize, serialize_with};
