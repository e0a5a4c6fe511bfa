use serde::Serialize;
use thiserror::Error;

/// Unified error type for nbpercent operations
#[derive(Debug, Error)]
pub enum PercentError {
    // Construction errors
    #[error("Invalid header metadata at '{key}': {reason}")]
    InvalidMetadata { key: String, reason: String },

    #[error("Cell {index} cannot be represented as percent text: {reason}")]
    InvalidCell { index: usize, reason: String },

    // Parse errors
    #[error("Malformed header at line {line}: {reason}")]
    MalformedHeader { line: usize, reason: String },

    #[error("Header opened at line {line} is never closed")]
    UnterminatedHeader { line: usize },

    #[error("Malformed cell marker at line {line}: {reason}")]
    MalformedCellMarker { line: usize, reason: String },

    #[error("Malformed cell body at line {line}: {reason}")]
    MalformedCellBody { line: usize, reason: String },

    #[error(
        "Cell starting at line {marker_line} mixes escaped and unescaped lines (first conflict at line {line})"
    )]
    AmbiguousCellClassification { line: usize, marker_line: usize },

    // Config errors
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

/// Result type alias for nbpercent operations
pub type Result<T> = std::result::Result<T, PercentError>;

impl PercentError {
    /// The 1-based line number the error refers to, for parse errors.
    pub fn line(&self) -> Option<usize> {
        match self {
            PercentError::MalformedHeader { line, .. }
            | PercentError::UnterminatedHeader { line }
            | PercentError::MalformedCellMarker { line, .. }
            | PercentError::MalformedCellBody { line, .. }
            | PercentError::AmbiguousCellClassification { line, .. } => Some(*line),
            _ => None,
        }
    }

    /// Convert to a serializable representation for IPC
    pub fn to_serializable(&self) -> SerializableError {
        SerializableError::from(self)
    }
}

/// A serializable representation of PercentError for IPC (e.g., editor frontends)
#[derive(Debug, Clone, Serialize)]
pub struct SerializableError {
    /// Error kind/variant name
    pub kind: String,
    /// Human-readable error message
    pub message: String,
    /// Offending line (if applicable)
    pub line: Option<usize>,
}

impl From<&PercentError> for SerializableError {
    fn from(err: &PercentError) -> Self {
        let kind = match err {
            PercentError::InvalidMetadata { .. } => "InvalidMetadata",
            PercentError::InvalidCell { .. } => "InvalidCell",
            PercentError::MalformedHeader { .. } => "MalformedHeader",
            PercentError::UnterminatedHeader { .. } => "UnterminatedHeader",
            PercentError::MalformedCellMarker { .. } => "MalformedCellMarker",
            PercentError::MalformedCellBody { .. } => "MalformedCellBody",
            PercentError::AmbiguousCellClassification { .. } => "AmbiguousCellClassification",
            PercentError::ConfigParse(_) => "ConfigParse",
            PercentError::ConfigSerialize(_) => "ConfigSerialize",
        }
        .to_string();

        Self {
            kind,
            message: err.to_string(),
            line: err.line(),
        }
    }
}

impl From<PercentError> for SerializableError {
    fn from(err: PercentError) -> Self {
        SerializableError::from(&err)
    }
}
