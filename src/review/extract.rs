//! Extract the fenced code block from a model reply.
//!
//! Extraction is lenient: a reply that does not follow the fenced-block
//! format still yields content (as [`Extraction::Fallback`]) so a malformed
//! reply is never silently dropped. Only a reply with no content at all is a
//! hard failure.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

const FENCE: &str = "```";

/// Outcome of extracting a code block from a reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Content of a properly fenced and closed block
    Success(String),
    /// The raw reply, used verbatim because it did not follow the format
    Fallback(String),
    /// No usable content
    Failed(ExtractionFailure),
}

impl Extraction {
    /// Content to write, if any
    pub fn content(&self) -> Option<&str> {
        match self {
            Extraction::Success(content) | Extraction::Fallback(content) => Some(content),
            Extraction::Failed(_) => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Extraction::Fallback(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionFailure {
    #[error("empty reply")]
    EmptyReply,
}

/// Non-fatal observations made while extracting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ExtractionWarning {
    /// The fence's language tag differs from the one expected for the file
    LanguageMismatch { found: String, expected: String },
    /// The reply does not start with a fence
    MissingFence,
    /// The opening fence has no matching closing fence on the last line
    UnclosedFence,
}

impl fmt::Display for ExtractionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionWarning::LanguageMismatch { found, expected } => write!(
                f,
                "code block language hint '{}' does not match expected '{}'",
                found, expected
            ),
            ExtractionWarning::MissingFence => {
                write!(f, "reply does not start with a markdown code block; using full reply")
            }
            ExtractionWarning::UnclosedFence => {
                write!(f, "code block not properly closed; using full reply")
            }
        }
    }
}

/// Extraction outcome plus the warnings raised on the way
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    pub extraction: Extraction,
    pub warnings: Vec<ExtractionWarning>,
}

/// Language tag expected in a fence for a file extension (with or without the dot)
pub fn expected_language(extension: &str) -> Option<&'static str> {
    let ext = extension.trim_start_matches('.').to_lowercase();
    let lang = match ext.as_str() {
        "py" => "python",
        "js" => "javascript",
        "html" => "html",
        "css" => "css",
        "json" => "json",
        "md" => "markdown",
        "txt" => "text",
        _ => return None,
    };
    Some(lang)
}

/// Extract the file content from `reply` for a file with `target_extension`.
pub fn extract(reply: &str, target_extension: &str) -> ExtractionResult {
    let mut warnings = Vec::new();

    // Surrounding blank lines are not part of the format
    let trimmed = reply.trim();
    if trimmed.is_empty() {
        return ExtractionResult {
            extraction: Extraction::Failed(ExtractionFailure::EmptyReply),
            warnings,
        };
    }

    let lines: Vec<&str> = trimmed.lines().collect();
    let first = lines[0].trim();

    if !first.starts_with(FENCE) {
        warnings.push(ExtractionWarning::MissingFence);
        return ExtractionResult {
            extraction: Extraction::Fallback(reply.to_string()),
            warnings,
        };
    }

    let tag = first[FENCE.len()..].trim();
    if !tag.is_empty() {
        if let Some(expected) = expected_language(target_extension) {
            if !tag.eq_ignore_ascii_case(expected) {
                warnings.push(ExtractionWarning::LanguageMismatch {
                    found: tag.to_string(),
                    expected: expected.to_string(),
                });
            }
        }
    }

    let closed = lines.len() >= 2 && lines[lines.len() - 1].trim() == FENCE;
    if !closed {
        warnings.push(ExtractionWarning::UnclosedFence);
        return ExtractionResult {
            extraction: Extraction::Fallback(reply.to_string()),
            warnings,
        };
    }

    ExtractionResult {
        extraction: Extraction::Success(lines[1..lines.len() - 1].join("\n")),
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_extract_python_block() {
        let result = extract("```python\nx = 1\nprint(x)\n```", ".py");
        assert_eq!(
            result.extraction,
            Extraction::Success("x = 1\nprint(x)".to_string())
        );
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_extract_untagged_fence() {
        let result = extract("```\nbody { margin: 0; }\n```\n", ".css");
        assert_eq!(
            result.extraction,
            Extraction::Success("body { margin: 0; }".to_string())
        );
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_extract_tag_is_case_insensitive() {
        let result = extract("```Python\npass\n```", ".py");
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_language_mismatch_still_succeeds() {
        let result = extract("```javascript\nconst x = 1;\n```", ".py");
        assert_eq!(
            result.extraction,
            Extraction::Success("const x = 1;".to_string())
        );
        assert_eq!(
            result.warnings,
            vec![ExtractionWarning::LanguageMismatch {
                found: "javascript".to_string(),
                expected: "python".to_string(),
            }]
        );
    }

    #[test]
    fn test_unknown_extension_skips_tag_check() {
        let result = extract("```toml\n[package]\n```", ".toml");
        assert!(result.warnings.is_empty());
        assert_eq!(result.extraction, Extraction::Success("[package]".to_string()));
    }

    #[test]
    fn test_no_fence_falls_back_to_full_reply() {
        let reply = "Here is your file:\nx = 2\n";
        let result = extract(reply, ".py");
        assert_eq!(result.extraction, Extraction::Fallback(reply.to_string()));
        assert!(result.extraction.is_fallback());
        assert_eq!(result.warnings, vec![ExtractionWarning::MissingFence]);
    }

    #[test]
    fn test_unclosed_fence_falls_back() {
        let reply = "```python\nx = 1\n";
        let result = extract(reply, ".py");
        assert_eq!(result.extraction, Extraction::Fallback(reply.to_string()));
        assert_eq!(result.warnings, vec![ExtractionWarning::UnclosedFence]);
    }

    #[test]
    fn test_single_fence_line_is_unclosed() {
        let result = extract("```", ".md");
        assert!(result.extraction.is_fallback());
    }

    #[test]
    fn test_trailing_prose_after_fence_falls_back() {
        let reply = "```python\nx = 1\n```\nHope this helps!";
        let result = extract(reply, ".py");
        assert!(result.extraction.is_fallback());
    }

    #[test]
    fn test_empty_reply_fails() {
        for reply in ["", "   ", "\n\n"] {
            let result = extract(reply, ".py");
            assert_eq!(
                result.extraction,
                Extraction::Failed(ExtractionFailure::EmptyReply)
            );
            assert_eq!(result.extraction.content(), None);
        }
    }

    #[test]
    fn test_empty_block() {
        let result = extract("```json\n```", ".json");
        assert_eq!(result.extraction, Extraction::Success(String::new()));
    }

    #[test]
    fn test_expected_language_table() {
        assert_eq!(expected_language(".py"), Some("python"));
        assert_eq!(expected_language("JS"), Some("javascript"));
        assert_eq!(expected_language(".md"), Some("markdown"));
        assert_eq!(expected_language(".txt"), Some("text"));
        assert_eq!(expected_language(".exe"), None);
    }

    fn code_line() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9_ =+()\\[\\]{}:;,.'\"#-]{0,40}"
            .prop_filter("no fence lines", |line| !line.trim().starts_with(FENCE))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn fenced_code_roundtrips(lines in prop::collection::vec(code_line(), 1..20)) {
            let code = lines.join("\n");
            // Surrounding whitespace is not preserved by the format
            prop_assume!(code.trim() == code);
            prop_assume!(!code.is_empty());

            let reply = format!("```python\n{}\n```", code);
            let result = extract(&reply, ".py");
            prop_assert_eq!(result.extraction, Extraction::Success(code));
        }

        #[test]
        fn extract_never_panics(ref reply in ".{0,300}") {
            let _ = extract(reply, ".py");
        }
    }
}
