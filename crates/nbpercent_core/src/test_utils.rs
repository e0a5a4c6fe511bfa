//! Test utilities for nbpercent_core
//!
//! Shared fixtures: the SageMath header used throughout the tests and a few
//! ready-made documents.

use crate::model::{Cell, HeaderMetadata, NotebookDocument};

/// Header YAML (the part under `jupyter:`) of the SageMath fixture.
pub const SAGE_HEADER_YAML: &str = r#"kernelspec:
  language: python
  name: sagemath
  display_name: SageMath 10.3
jupytext:
  text_representation:
    extension: .py
    format_name: percent
    format_version: '1.3'
"#;

/// The SageMath fixture header.
pub fn sage_header() -> HeaderMetadata {
    serde_yaml::from_str(SAGE_HEADER_YAML).unwrap()
}

/// A document with the SageMath header and the given cells.
pub fn sage_document(cells: Vec<Cell>) -> NotebookDocument {
    NotebookDocument::new(sage_header(), cells).unwrap()
}

/// A small document mixing every cell shape the codec has to handle.
pub fn mixed_document() -> NotebookDocument {
    sage_document(vec![
        Cell::markdown(["# QuiverTools", "", "Some *prose*."]),
        Cell::code(["Q = KroneckerQuiver(3)", "Q"]),
        Cell::code(["# %display latex", "factor(x^10 - 1)"]),
        Cell::markdown(Vec::<String>::new()),
        Cell::code(["x = 1", ""]).with_metadata("tags", serde_json::json!(["hide"])),
        Cell::code(Vec::<String>::new()),
    ])
}
