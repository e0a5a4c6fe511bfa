//! Codec options.
//!
//! [`CodecOptions`] is the text encoding policy a caller hands to the codec:
//! which marker form the serializer writes and how untagged cells are
//! classified by the parser. Options can be persisted as TOML:
//!
//! ```toml
//! marker_style = "doubled"
//! classification = "tagged"
//! ```
//!
//! Missing fields take their defaults, so an empty string is a valid config.
//!
//! # Example
//!
//! ```
//! use nbpercent_core::{Classification, CodecOptions, MarkerStyle};
//!
//! let options = CodecOptions::from_toml_str("marker_style = \"doubled\"").unwrap();
//! assert_eq!(options.marker_style, MarkerStyle::Doubled);
//! assert_eq!(options.classification, Classification::Inferred);
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::Result;
use crate::escape::Classification;
use crate::marker::MarkerStyle;

/// `CodecOptions` holds the parts of the percent codec a caller can configure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(default)]
pub struct CodecOptions {
    /// Marker form written by the serializer (`# %%` or `##%%`).
    /// The parser reads both.
    pub marker_style: MarkerStyle,

    /// How the parser classifies cells without a kind tag.
    pub classification: Classification,
}

impl CodecOptions {
    /// Options matching jupytext: spaced markers, untagged cells are code.
    pub fn jupytext() -> Self {
        Self {
            marker_style: MarkerStyle::Spaced,
            classification: Classification::Tagged,
        }
    }

    /// Set the marker style (builder pattern).
    pub fn with_marker_style(mut self, marker_style: MarkerStyle) -> Self {
        self.marker_style = marker_style;
        self
    }

    /// Set the classification mode (builder pattern).
    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.classification = classification;
        self
    }

    /// Parse options from TOML.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Serialize options to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }
}
