//! Kernel language lookup.
//!
//! The percent format escapes markdown and the header with the kernel
//! language's line-comment token. This module holds the one table that maps a
//! `kernelspec.language` value to that token and to the script extension used
//! in `jupytext.text_representation.extension`.
//!
//! Lookups are case-insensitive. Languages missing from the table fall back to
//! [`DEFAULT_COMMENT_TOKEN`] and [`DEFAULT_EXTENSION`].

/// Comment token for languages not in [`LANGUAGES`].
pub const DEFAULT_COMMENT_TOKEN: &str = "#";

/// Script extension for languages not in [`LANGUAGES`].
pub const DEFAULT_EXTENSION: &str = ".txt";

/// One row of the language table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageSpec {
    /// Lowercase `kernelspec.language` value
    pub name: &'static str,
    /// Line-comment token
    pub comment_token: &'static str,
    /// Script extension, including the leading dot
    pub extension: &'static str,
}

const fn lang(
    name: &'static str,
    comment_token: &'static str,
    extension: &'static str,
) -> LanguageSpec {
    LanguageSpec {
        name,
        comment_token,
        extension,
    }
}

/// Every language the codec knows by name.
pub const LANGUAGES: &[LanguageSpec] = &[
    lang("python", "#", ".py"),
    lang("ipython", "#", ".py"),
    // jupytext writes SageMath notebooks as `.py` scripts.
    lang("sage", "#", ".py"),
    lang("sagemath", "#", ".py"),
    lang("r", "#", ".R"),
    lang("julia", "#", ".jl"),
    lang("bash", "#", ".sh"),
    lang("sh", "#", ".sh"),
    lang("zsh", "#", ".zsh"),
    lang("ruby", "#", ".rb"),
    lang("perl", "#", ".pl"),
    lang("powershell", "#", ".ps1"),
    lang("c", "//", ".c"),
    lang("c++", "//", ".cpp"),
    lang("cpp", "//", ".cpp"),
    lang("c#", "//", ".cs"),
    lang("csharp", "//", ".cs"),
    lang("java", "//", ".java"),
    lang("javascript", "//", ".js"),
    lang("typescript", "//", ".ts"),
    lang("rust", "//", ".rs"),
    lang("go", "//", ".go"),
    lang("scala", "//", ".scala"),
    lang("kotlin", "//", ".kt"),
    lang("swift", "//", ".swift"),
    lang("groovy", "//", ".groovy"),
    lang("dart", "//", ".dart"),
    lang("matlab", "%", ".m"),
    lang("octave", "%", ".m"),
    lang("sql", "--", ".sql"),
    lang("haskell", "--", ".hs"),
    lang("lua", "--", ".lua"),
    lang("clojure", ";;", ".clj"),
    lang("scheme", ";;", ".scm"),
    lang("common-lisp", ";;", ".lisp"),
    lang("fortran", "!", ".f90"),
];

/// The distinct comment tokens in [`LANGUAGES`], longest first.
///
/// The header's opening delimiter is recognised against this list before the
/// kernel language is known.
pub const KNOWN_TOKENS: &[&str] = &["//", "--", ";;", "#", "%", "!"];

/// Find the table row for a `kernelspec.language` value.
pub fn lookup(language: &str) -> Option<&'static LanguageSpec> {
    let language = language.trim();
    LANGUAGES
        .iter()
        .find(|spec| spec.name.eq_ignore_ascii_case(language))
}

/// Line-comment token for a language.
///
/// # Examples
///
/// ```
/// use nbpercent_core::language::comment_token;
///
/// assert_eq!(comment_token("python"), "#");
/// assert_eq!(comment_token("Rust"), "//");
/// assert_eq!(comment_token("brainfuck"), "#");
/// ```
pub fn comment_token(language: &str) -> &'static str {
    lookup(language)
        .map(|spec| spec.comment_token)
        .unwrap_or(DEFAULT_COMMENT_TOKEN)
}

/// Script extension for a language, including the leading dot.
pub fn extension(language: &str) -> &'static str {
    lookup(language)
        .map(|spec| spec.extension)
        .unwrap_or(DEFAULT_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(comment_token("SageMath"), "#");
        assert_eq!(comment_token("C++"), "//");
        assert_eq!(extension("R"), ".R");
    }

    #[test]
    fn test_sage_scripts_use_py_extension() {
        assert_eq!(extension("sage"), ".py");
        assert_eq!(extension("SageMath"), ".py");
    }

    #[test]
    fn test_unknown_language_uses_defaults() {
        assert!(lookup("cobol").is_none());
        assert_eq!(comment_token("cobol"), DEFAULT_COMMENT_TOKEN);
        assert_eq!(extension("cobol"), DEFAULT_EXTENSION);
    }

    #[test]
    fn test_known_tokens_cover_table() {
        for spec in LANGUAGES {
            assert!(
                KNOWN_TOKENS.contains(&spec.comment_token),
                "{} uses unlisted token {}",
                spec.name,
                spec.comment_token
            );
        }
        assert!(KNOWN_TOKENS.contains(&DEFAULT_COMMENT_TOKEN));
    }

    #[test]
    fn test_table_names_are_lowercase_and_unique() {
        for (i, spec) in LANGUAGES.iter().enumerate() {
            assert_eq!(spec.name, spec.name.to_lowercase());
            assert!(LANGUAGES[i + 1..].iter().all(|other| other.name != spec.name));
        }
    }
}
