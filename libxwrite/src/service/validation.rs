//! Post text validation
//!
//! Lengths are counted in Unicode scalar values, not bytes.

use std::fmt;

use crate::platforms::CHARACTER_LIMIT;

/// Why a post was refused before reaching the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationIssue {
    /// Nothing but whitespace
    Empty,
    /// Over the character limit
    TooLong { length: usize },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::Empty => write!(f, "Post text cannot be empty"),
            ValidationIssue::TooLong { length } => {
                write!(f, "{}/{} characters - too long", length, CHARACTER_LIMIT)
            }
        }
    }
}

/// Check that `text` can be posted as is
pub fn validate_post_text(text: &str) -> Result<(), ValidationIssue> {
    if text.trim().is_empty() {
        return Err(ValidationIssue::Empty);
    }

    let length = text.chars().count();
    if length > CHARACTER_LIMIT {
        return Err(ValidationIssue::TooLong { length });
    }

    Ok(())
}

/// Initial post text from an editor selection, cut to the character limit
pub fn prefill_from_selection(selection: &str) -> String {
    selection.chars().take(CHARACTER_LIMIT).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_text() {
        assert_eq!(validate_post_text("Hello world"), Ok(()));
        assert_eq!(validate_post_text(&"a".repeat(280)), Ok(()));
    }

    #[test]
    fn test_empty_and_whitespace() {
        assert_eq!(validate_post_text(""), Err(ValidationIssue::Empty));
        assert_eq!(validate_post_text("  \n\t "), Err(ValidationIssue::Empty));
    }

    #[test]
    fn test_too_long() {
        assert_eq!(
            validate_post_text(&"a".repeat(281)),
            Err(ValidationIssue::TooLong { length: 281 })
        );
    }

    #[test]
    fn test_length_counts_chars_not_bytes() {
        // 280 multi-byte characters are still within the limit
        let text = "é".repeat(280);
        assert!(text.len() > 280);
        assert_eq!(validate_post_text(&text), Ok(()));
    }

    #[test]
    fn test_issue_messages() {
        assert_eq!(
            ValidationIssue::TooLong { length: 300 }.to_string(),
            "300/280 characters - too long"
        );
        assert_eq!(ValidationIssue::Empty.to_string(), "Post text cannot be empty");
    }

    #[test]
    fn test_prefill_truncates() {
        let selection = "x".repeat(500);
        assert_eq!(prefill_from_selection(&selection).chars().count(), 280);
        assert_eq!(prefill_from_selection("short"), "short");
        assert_eq!(prefill_from_selection(&"日".repeat(300)), "日".repeat(280));
    }
}
