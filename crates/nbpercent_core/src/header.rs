//! Header block encoding and decoding.
//!
//! The header sits at the top of a percent file, framed by `<token> ---`
//! delimiters, with every YAML line behind the comment token:
//!
//! ```text
//! # ---
//! # jupyter:
//! #   kernelspec:
//! #     language: python
//! # ---
//! ```
//!
//! [`HeaderMetadata`] is the mapping under `jupyter:`, kept in file order.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::error::{PercentError, Result};
use crate::escape;
use crate::language::{self, KNOWN_TOKENS};
use crate::model::HeaderMetadata;

/// Dotted path of the kernel language.
pub const LANGUAGE_KEY: &str = "kernelspec.language";

/// Dotted path of the coding comment kept from the first line of the file.
pub const ENCODING_KEY: &str = "jupytext.encoding";

/// Value of `jupytext.text_representation.format_name`.
pub const FORMAT_NAME: &str = "percent";

/// Default `jupytext.text_representation.format_version`.
pub const FORMAT_VERSION: &str = "1.3";

#[derive(Serialize)]
struct HeaderRoot<'a> {
    jupyter: &'a HeaderMetadata,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct OwnedHeaderRoot {
    jupyter: HeaderMetadata,
}

/// The delimiter line for a comment token (`# ---`).
pub fn delimiter(token: &str) -> String {
    format!("{token} ---")
}

/// If `line` is a header delimiter, the comment token it uses.
pub fn opening_token(line: &str) -> Option<&'static str> {
    let prefix = line.strip_suffix(" ---")?;
    KNOWN_TOKENS.iter().copied().find(|token| *token == prefix)
}

/// Whether a line is a coding comment (`# -*- coding: utf-8 -*-`).
pub fn is_encoding_cookie(token: &str, line: &str) -> bool {
    line.strip_prefix(token)
        .is_some_and(|rest| rest.contains("coding:") || rest.contains("coding="))
}

/// If `line` is a coding comment, the comment token it uses.
pub fn cookie_token(line: &str) -> Option<&'static str> {
    KNOWN_TOKENS
        .iter()
        .copied()
        .find(|token| is_encoding_cookie(token, line))
}

/// Render header metadata as YAML under a `jupyter:` root.
pub fn render_yaml(header: &HeaderMetadata) -> serde_yaml::Result<String> {
    serde_yaml::to_string(&HeaderRoot { jupyter: header })
}

/// Escape rendered YAML into header block lines, delimiters included.
pub fn escape_block(yaml: &str, token: &str) -> Vec<String> {
    let mut lines = Vec::with_capacity(yaml.lines().count() + 2);
    lines.push(delimiter(token));
    lines.extend(yaml.lines().map(|line| escape::escape_line(token, line)));
    lines.push(delimiter(token));
    lines
}

/// Decode the lines between the two delimiters.
///
/// `first_line` is the 1-based file line of `lines[0]`, used to report
/// errors at the right place.
pub fn decode_block(token: &str, first_line: usize, lines: &[&str]) -> Result<HeaderMetadata> {
    let mut yaml = String::new();
    for (offset, line) in lines.iter().enumerate() {
        let content =
            escape::unescape_line(token, line).ok_or_else(|| PercentError::MalformedHeader {
                line: first_line + offset,
                reason: format!("header line is not prefixed with '{token}'"),
            })?;
        yaml.push_str(content);
        yaml.push('\n');
    }

    let root: OwnedHeaderRoot = serde_yaml::from_str(&yaml).map_err(|err| {
        let line = err
            .location()
            .map(|location| first_line + location.line().saturating_sub(1))
            .unwrap_or(first_line);
        PercentError::MalformedHeader {
            line,
            reason: err.to_string(),
        }
    })?;

    Ok(root.jupyter)
}

/// Look up a dotted path such as `kernelspec.language`.
pub fn get_path<'a>(header: &'a HeaderMetadata, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = header.get(parts.next()?)?;
    for part in parts {
        current = current.get(part)?;
    }
    Some(current)
}

/// Get a string value at a dotted path.
pub fn get_str<'a>(header: &'a HeaderMetadata, path: &str) -> Option<&'a str> {
    get_path(header, path).and_then(|value| value.as_str())
}

/// Set `jupytext.encoding` (in place), creating the `jupytext` mapping if needed.
///
/// Returns `false` when `jupytext` exists but is not a mapping.
pub fn set_encoding(header: &mut HeaderMetadata, cookie: &str) -> bool {
    let jupytext = header
        .entry("jupytext".to_string())
        .or_insert_with(|| Value::Mapping(Mapping::new()));
    match jupytext {
        Value::Mapping(map) => {
            map.insert(string("encoding"), string(cookie));
            true
        }
        _ => false,
    }
}

fn string(value: &str) -> Value {
    Value::String(value.to_string())
}

/// Builds the standard jupytext header for a kernel.
///
/// # Examples
///
/// ```
/// use nbpercent_core::header::{get_str, HeaderBuilder};
///
/// let header = HeaderBuilder::new("sage")
///     .kernel_name("sagemath")
///     .display_name("SageMath 10.3")
///     .build();
/// assert_eq!(get_str(&header, "kernelspec.language"), Some("sage"));
/// assert_eq!(get_str(&header, "jupytext.text_representation.format_name"), Some("percent"));
/// ```
#[derive(Debug, Clone)]
pub struct HeaderBuilder {
    language: String,
    kernel_name: Option<String>,
    display_name: Option<String>,
    format_version: String,
    jupytext_version: Option<String>,
    formats: Option<String>,
    extension: Option<String>,
    encoding: Option<String>,
}

impl HeaderBuilder {
    /// Start a header for a kernel language.
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            kernel_name: None,
            display_name: None,
            format_version: FORMAT_VERSION.to_string(),
            jupytext_version: None,
            formats: None,
            extension: None,
            encoding: None,
        }
    }

    /// `kernelspec.name` (defaults to the lowercase language).
    pub fn kernel_name(mut self, name: impl Into<String>) -> Self {
        self.kernel_name = Some(name.into());
        self
    }

    /// `kernelspec.display_name` (defaults to the language).
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// `text_representation.format_version`.
    pub fn format_version(mut self, version: impl Into<String>) -> Self {
        self.format_version = version.into();
        self
    }

    /// `text_representation.jupytext_version`.
    pub fn jupytext_version(mut self, version: impl Into<String>) -> Self {
        self.jupytext_version = Some(version.into());
        self
    }

    /// `jupytext.formats` (defaults to `ipynb,<ext>:percent`).
    pub fn formats(mut self, formats: impl Into<String>) -> Self {
        self.formats = Some(formats.into());
        self
    }

    /// `text_representation.extension` (defaults to the language's script extension).
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    /// `jupytext.encoding`, the coding comment written on the first line.
    pub fn encoding(mut self, cookie: impl Into<String>) -> Self {
        self.encoding = Some(cookie.into());
        self
    }

    /// Produce the header metadata.
    pub fn build(&self) -> HeaderMetadata {
        let extension = self
            .extension
            .clone()
            .unwrap_or_else(|| language::extension(&self.language).to_string());
        let formats = self
            .formats
            .clone()
            .unwrap_or_else(|| format!("ipynb,{}:{}", extension.trim_start_matches('.'), FORMAT_NAME));

        let mut text_representation = Mapping::new();
        text_representation.insert(string("extension"), string(&extension));
        text_representation.insert(string("format_name"), string(FORMAT_NAME));
        text_representation.insert(string("format_version"), string(&self.format_version));
        if let Some(version) = &self.jupytext_version {
            text_representation.insert(string("jupytext_version"), string(version));
        }

        let mut jupytext = Mapping::new();
        if let Some(cookie) = &self.encoding {
            jupytext.insert(string("encoding"), string(cookie));
        }
        jupytext.insert(string("formats"), string(&formats));
        jupytext.insert(
            string("text_representation"),
            Value::Mapping(text_representation),
        );

        let mut kernelspec = Mapping::new();
        kernelspec.insert(
            string("display_name"),
            string(self.display_name.as_deref().unwrap_or(&self.language)),
        );
        kernelspec.insert(string("language"), string(&self.language));
        kernelspec.insert(
            string("name"),
            Value::String(
                self.kernel_name
                    .clone()
                    .unwrap_or_else(|| self.language.to_lowercase()),
            ),
        );

        let mut header = HeaderMetadata::new();
        header.insert("jupytext".to_string(), Value::Mapping(jupytext));
        header.insert("kernelspec".to_string(), Value::Mapping(kernelspec));
        header
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sage_header;

    #[test]
    fn test_escape_block() {
        let yaml = render_yaml(&sage_header()).unwrap();
        let lines = escape_block(&yaml, "#");
        assert_eq!(lines.first().map(String::as_str), Some("# ---"));
        assert_eq!(lines.last().map(String::as_str), Some("# ---"));
        assert_eq!(lines[1], "# jupyter:");
        assert_eq!(lines[2], "#   kernelspec:");
        assert!(lines.contains(&"#     language: python".to_string()));
        assert!(lines.contains(&"#       format_version: '1.3'".to_string()));
    }

    #[test]
    fn test_decode_reverses_render() {
        let header = sage_header();
        let yaml = render_yaml(&header).unwrap();
        let block = escape_block(&yaml, "#");
        let inner: Vec<&str> = block[1..block.len() - 1].iter().map(String::as_str).collect();
        let decoded = decode_block("#", 2, &inner).unwrap();

        let keys: Vec<_> = decoded.keys().collect();
        assert_eq!(keys, vec!["kernelspec", "jupytext"]);
        assert_eq!(decoded, header);
        assert_eq!(get_str(&decoded, "jupytext.text_representation.format_version"), Some("1.3"));
    }

    #[test]
    fn test_decode_rejects_unprefixed_line() {
        let lines = ["# jupyter:", "  kernelspec: {}"];
        match decode_block("#", 2, &lines) {
            Err(PercentError::MalformedHeader { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected MalformedHeader, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_reports_yaml_error_line() {
        let lines = ["# jupyter:", "#   kernelspec:", "#     language: [python"];
        match decode_block("#", 2, &lines) {
            Err(PercentError::MalformedHeader { line, .. }) => assert!((3..=5).contains(&line)),
            other => panic!("expected MalformedHeader, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_requires_jupyter_root() {
        let lines = ["# title: notes"];
        assert!(matches!(
            decode_block("#", 2, &lines),
            Err(PercentError::MalformedHeader { .. })
        ));
        assert!(matches!(
            decode_block("#", 2, &[]),
            Err(PercentError::MalformedHeader { .. })
        ));
    }

    #[test]
    fn test_opening_token() {
        assert_eq!(opening_token("# ---"), Some("#"));
        assert_eq!(opening_token("// ---"), Some("//"));
        assert_eq!(opening_token("-- ---"), Some("--"));
        assert_eq!(opening_token("---"), None);
        assert_eq!(opening_token("#---"), None);
        assert_eq!(opening_token("x ---"), None);
    }

    #[test]
    fn test_cookie_detection() {
        assert_eq!(cookie_token("# -*- coding: utf-8 -*-"), Some("#"));
        assert_eq!(cookie_token("// vim: set fileencoding=utf-8 coding=utf-8"), Some("//"));
        assert_eq!(cookie_token("# plain comment"), None);
        assert!(!is_encoding_cookie("#", "coding: utf-8"));
    }

    #[test]
    fn test_get_path() {
        let header = sage_header();
        assert_eq!(get_str(&header, "kernelspec.name"), Some("sagemath"));
        assert!(get_path(&header, "kernelspec.missing").is_none());
        assert!(get_path(&header, "nothing").is_none());
        assert!(get_path(&header, "jupytext.text_representation").is_some());
    }

    #[test]
    fn test_set_encoding() {
        let mut header = HeaderMetadata::new();
        assert!(set_encoding(&mut header, "# -*- coding: latin-1 -*-"));
        assert_eq!(get_str(&header, ENCODING_KEY), Some("# -*- coding: latin-1 -*-"));

        let mut header = HeaderMetadata::new();
        header.insert("jupytext".to_string(), Value::Bool(true));
        assert!(!set_encoding(&mut header, "# -*- coding: utf-8 -*-"));
    }

    #[test]
    fn test_builder_defaults() {
        let header = HeaderBuilder::new("python").build();
        let keys: Vec<_> = header.keys().collect();
        assert_eq!(keys, vec!["jupytext", "kernelspec"]);
        assert_eq!(get_str(&header, "jupytext.formats"), Some("ipynb,py:percent"));
        assert_eq!(get_str(&header, "jupytext.text_representation.extension"), Some(".py"));
        assert_eq!(get_str(&header, "kernelspec.display_name"), Some("python"));
        assert_eq!(get_str(&header, "kernelspec.name"), Some("python"));
        assert!(get_path(&header, ENCODING_KEY).is_none());
    }

    #[test]
    fn test_builder_sage_defaults_match_jupytext() {
        let header = HeaderBuilder::new("sage").kernel_name("sagemath").build();
        assert_eq!(get_str(&header, "jupytext.formats"), Some("ipynb,py:percent"));
        assert_eq!(get_str(&header, "jupytext.text_representation.extension"), Some(".py"));
    }

    #[test]
    fn test_builder_overrides() {
        let header = HeaderBuilder::new("sage")
            .kernel_name("sagemath")
            .display_name("SageMath 10.1.rc0")
            .extension(".py")
            .formats("ipynb,py:percent")
            .jupytext_version("1.16.2")
            .encoding("# -*- coding: utf-8 -*-")
            .build();
        assert_eq!(get_str(&header, "jupytext.formats"), Some("ipynb,py:percent"));
        assert_eq!(
            get_str(&header, "jupytext.text_representation.jupytext_version"),
            Some("1.16.2")
        );
        assert_eq!(get_str(&header, ENCODING_KEY), Some("# -*- coding: utf-8 -*-"));
        assert_eq!(get_str(&header, "kernelspec.name"), Some("sagemath"));
    }
}
