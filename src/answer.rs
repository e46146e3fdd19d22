//! Answer validation for task submissions.
//!
//! Every answer must carry at least [`MIN_ANSWER_CHARS`] characters after
//! trimming. Tasks that carry a reference answer (transcription, copy-typing)
//! additionally require an exact match after [`normalize`]; there is no fuzzy
//! or edit-distance matching.

use crate::error::{TaskError, TaskResult};

/// Minimum answer length, in characters, after trimming.
pub const MIN_ANSWER_CHARS: usize = 2;

/// Canonical form for match-based comparison: curly quotes become straight
/// quotes, whitespace runs collapse to one space, the result is trimmed and
/// lowercased. Idempotent.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        let ch = match ch {
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' => '\'',
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' => '"',
            other => other,
        };
        out.extend(ch.to_lowercase());
    }
    out
}

/// Check a submitted answer against the task's rules.
pub fn validate(answer: &str, reference: Option<&str>) -> TaskResult<()> {
    let trimmed = answer.trim();
    if trimmed.chars().count() < MIN_ANSWER_CHARS {
        return Err(TaskError::InvalidAnswer(format!(
            "answer must be at least {} characters",
            MIN_ANSWER_CHARS
        )));
    }
    if let Some(reference) = reference {
        if normalize(trimmed) != normalize(reference) {
            return Err(TaskError::InvalidAnswer(
                "answer does not match the expected text".to_string(),
            ));
        }
    }
    Ok(())
}
