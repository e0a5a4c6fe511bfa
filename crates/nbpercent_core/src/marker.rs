//! Cell marker lines.
//!
//! A marker line opens every cell:
//!
//! ```text
//! # %%
//! # %% [markdown]
//! # %% [code] tags=["hide-input"] collapsed=true
//! ##%% [markdown] lang="fr"
//! ```
//!
//! The grammar, for a comment token `t`, is `t " %%"` (spaced, the jupytext
//! form) or `t t "%%"` (doubled), then either the end of the line or a space
//! and an annotation. The annotation is an optional kind tag, `[markdown]` or
//! `[code]`, followed by space-separated `key=<json>` pairs that make up the
//! cell metadata.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{PercentError, Result};
use crate::escape::looks_like_marker;
use crate::model::{CellKind, CellMetadata};

/// Which form of marker line the serializer writes.
///
/// The parser accepts both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum MarkerStyle {
    /// `# %%`
    #[default]
    Spaced,

    /// `##%%`
    Doubled,
}

impl MarkerStyle {
    /// The marker prefix for a comment token, without annotation.
    pub fn prefix(&self, token: &str) -> String {
        match self {
            MarkerStyle::Spaced => format!("{token} %%"),
            MarkerStyle::Doubled => format!("{token}{token}%%"),
        }
    }
}

/// A parsed (or to-be-rendered) marker line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Marker {
    /// Form of the marker prefix
    pub style: MarkerStyle,
    /// Explicit `[markdown]` / `[code]` tag
    pub kind: Option<CellKind>,
    /// `key=<json>` pairs, in line order
    pub metadata: CellMetadata,
}

impl Marker {
    /// Render the marker line for a comment token.
    ///
    /// # Examples
    ///
    /// ```
    /// use nbpercent_core::marker::{Marker, MarkerStyle};
    /// use nbpercent_core::CellKind;
    ///
    /// let mut marker = Marker {
    ///     style: MarkerStyle::Spaced,
    ///     kind: Some(CellKind::Markdown),
    ///     ..Marker::default()
    /// };
    /// marker.metadata.insert("lang".to_string(), serde_json::json!("fr"));
    /// assert_eq!(marker.render("#"), r#"# %% [markdown] lang="fr""#);
    /// ```
    pub fn render(&self, token: &str) -> String {
        let mut line = self.style.prefix(token);
        if let Some(kind) = self.kind {
            line.push_str(" [");
            line.push_str(kind.as_str());
            line.push(']');
        }
        for (key, value) in &self.metadata {
            line.push(' ');
            line.push_str(key);
            line.push('=');
            line.push_str(&value.to_string());
        }
        line
    }
}

/// Whether a metadata key can be written in a marker annotation.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

/// Parse a line as a cell marker.
///
/// Returns `Ok(None)` for lines that do not look like a marker at all, and
/// `MalformedCellMarker` for lines that look like one but break the grammar.
pub fn parse_marker(token: &str, line: &str, line_number: usize) -> Result<Option<Marker>> {
    if !looks_like_marker(token, line) {
        return Ok(None);
    }

    let malformed = |reason: String| PercentError::MalformedCellMarker {
        line: line_number,
        reason,
    };

    let after_token = &line[token.len()..];
    let (style, tail) = if let Some(tail) = after_token.strip_prefix(" %%") {
        (MarkerStyle::Spaced, tail)
    } else if let Some(tail) = after_token
        .strip_prefix(token)
        .and_then(|rest| rest.strip_prefix("%%"))
    {
        (MarkerStyle::Doubled, tail)
    } else {
        return Err(malformed(format!(
            "expected '{token} %%' or '{token}{token}%%'"
        )));
    };

    let annotation = if tail.is_empty() {
        tail
    } else if let Some(annotation) = tail.strip_prefix(' ') {
        annotation
    } else {
        return Err(malformed(
            "expected a space between '%%' and the annotation".to_string(),
        ));
    };

    let (kind, metadata) = parse_annotation(annotation).map_err(malformed)?;
    Ok(Some(Marker {
        style,
        kind,
        metadata,
    }))
}

/// Parse `[kind] key=<json> ...`.
fn parse_annotation(
    annotation: &str,
) -> std::result::Result<(Option<CellKind>, CellMetadata), String> {
    let mut rest = annotation.trim_start_matches(' ');
    let mut kind = None;

    if let Some(after_bracket) = rest.strip_prefix('[') {
        let close = after_bracket
            .find(']')
            .ok_or_else(|| "unterminated cell kind tag".to_string())?;
        let tag = &after_bracket[..close];
        kind = Some(CellKind::from_tag(tag).ok_or_else(|| format!("unknown cell kind '{tag}'"))?);
        rest = &after_bracket[close + 1..];
        if !rest.is_empty() && !rest.starts_with(' ') {
            return Err(format!("expected a space after '[{tag}]'"));
        }
    }

    let mut metadata = CellMetadata::new();
    loop {
        rest = rest.trim_start_matches(' ');
        if rest.is_empty() {
            break;
        }

        let eq = rest
            .find('=')
            .ok_or_else(|| format!("expected key=value, found '{rest}'"))?;
        let key = &rest[..eq];
        if !is_valid_key(key) {
            return Err(format!("invalid metadata key '{key}'"));
        }

        let value_text = &rest[eq + 1..];
        if value_text.starts_with(char::is_whitespace) || value_text.is_empty() {
            return Err(format!("missing value for '{key}'"));
        }

        let mut values =
            serde_json::Deserializer::from_str(value_text).into_iter::<serde_json::Value>();
        let value = match values.next() {
            Some(Ok(value)) => value,
            Some(Err(err)) => return Err(format!("invalid value for '{key}': {err}")),
            None => return Err(format!("missing value for '{key}'")),
        };
        rest = &value_text[values.byte_offset()..];
        if !rest.is_empty() && !rest.starts_with(' ') {
            return Err(format!("expected a space after the value of '{key}'"));
        }

        if metadata.insert(key.to_string(), value).is_some() {
            return Err(format!("duplicate metadata key '{key}'"));
        }
    }

    Ok((kind, metadata))
}
