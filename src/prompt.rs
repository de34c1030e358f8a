//! Prompt templates for fact-check questions and file reviews

use crate::Constraint;
use std::path::Path;

/// Build the fact-check prompt for a claim
pub fn build_prompt(claim: &str, constraint: Constraint) -> String {
    let instruction = match constraint {
        Constraint::OnlyTrue => {
            "Respond only with 'True' if the statement is correct. \
             Say nothing if it is false. No explanation."
        }
        Constraint::OnlyFalse => {
            "Respond only with 'False' if the statement is NOT correct. \
             Say nothing if it is true. No explanation."
        }
        Constraint::VerdictAndShortReason => {
            "Reply with 'True' or 'False' at the start, followed by a one-sentence reason \
             (max 15 words)."
        }
    };

    format!("Fact-check this statement: '{}'. {}", claim, instruction)
}

/// Build the review prompt for a single file.
///
/// `extension_hint` is the extension without the leading dot (`py`, `md`, ...)
/// and is used as the language tag of the embedded code block.
pub fn build_review_prompt(filepath: &Path, extension_hint: &str, content: &str) -> String {
    format!(
        r#"You are an expert code editor and reviewer.
Your task is to analyze the provided file content, identify potential bugs,
suggest refactorings for clarity or efficiency, and improve code quality.
You MUST return the ENTIRE, MODIFIED FILE CONTENT within a single markdown code block.
If no changes are needed, return the original content unchanged.
The response MUST be a single markdown code block (e.g., ```python\n...code...\n```)
containing the complete file content, with no additional text outside the code block.

---
File Path: {}
File Content:
```{}
{}
```
---
Your Review/Suggestions (return the full modified file here):
"#,
        filepath.display(),
        extension_hint,
        content,
    )
}
