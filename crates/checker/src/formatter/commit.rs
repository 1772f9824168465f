//! Commit-message and commit-footer linting strategies.
//!
//! Both operate on the commit-message pseudo-file only and never rewrite it:
//! a clean message comes back as unchanged content, a violation comes back as
//! a diagnostic message with no content.

use async_trait::async_trait;

use crate::errors::CheckError;
use crate::types::{FormattedFile, SourceFile};

use super::{FormatOutput, Formatter};

/// Lints the shape of a commit message: subject line, blank separator,
/// subject length, and trailing punctuation.
pub struct CommitMessageFormatter;

#[async_trait]
impl Formatter for CommitMessageFormatter {
    async fn format(&self, files: &[SourceFile]) -> Result<FormatOutput, CheckError> {
        let Some(file) = files.first() else {
            return Ok(FormatOutput::default());
        };
        let message = String::from_utf8_lossy(&file.content);
        Ok(FormatOutput {
            files: vec![lint_reply(file, check_commit_message(&message))],
            diagnostic: String::new(),
        })
    }
}

/// Requires a `<key>: <value>` footer in the last paragraph of the message.
pub struct CommitFooterFormatter {
    footer: String,
}

impl CommitFooterFormatter {
    /// Creates a strategy requiring the given footer key.
    pub fn new(footer: impl Into<String>) -> Self {
        Self {
            footer: footer.into(),
        }
    }
}

#[async_trait]
impl Formatter for CommitFooterFormatter {
    async fn format(&self, files: &[SourceFile]) -> Result<FormatOutput, CheckError> {
        let Some(file) = files.first() else {
            return Ok(FormatOutput::default());
        };
        let message = String::from_utf8_lossy(&file.content);
        Ok(FormatOutput {
            files: vec![lint_reply(file, check_commit_footer(&message, &self.footer))],
            diagnostic: String::new(),
        })
    }
}

/// Unchanged content on a clean message, the complaint otherwise.
fn lint_reply(file: &SourceFile, complaint: Option<String>) -> FormattedFile {
    match complaint {
        Some(message) => FormattedFile {
            name: file.name.clone(),
            content: None,
            message: Some(message),
        },
        None => FormattedFile {
            name: file.name.clone(),
            content: Some(file.content.clone()),
            message: None,
        },
    }
}

/// Checks commit-message shape; the first violated rule wins.
fn check_commit_message(message: &str) -> Option<String> {
    let lines: Vec<&str> = message.split('\n').collect();
    if lines.len() < 2 {
        return Some("must have multiple lines".to_string());
    }

    if lines[1].len() > 1 {
        return Some("subject and body must be separated by blank line".to_string());
    }

    if lines[0].len() > 70 {
        return Some("subject must be less than 70 chars".to_string());
    }

    if lines[0].ends_with('.') {
        return Some("subject must not end in '.'".to_string());
    }

    None
}

/// Checks that the last paragraph carries the required `footer: value` pair.
fn check_commit_footer(message: &str, footer: &str) -> Option<String> {
    if footer.is_empty() {
        return Some("required footer should be non-empty".to_string());
    }

    let blocks: Vec<&str> = message.split("\n\n").collect();
    if blocks.len() < 2 {
        return Some("changes must have two paragraphs.".to_string());
    }

    let footer_block = blocks[blocks.len() - 1];
    for line in footer_block.split('\n') {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        if key != footer {
            continue;
        }
        if !value.starts_with(' ') {
            return Some(format!("footer {value:?} should have space after ':'"));
        }
        return None;
    }

    Some(format!("footer {footer:?} not found"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_message_rules() {
        let long_subject = format!("{}\n", "x".repeat(80));
        let cases = [
            ("abc", "multiple lines"),
            ("abc\ndef\n", "blank line"),
            (long_subject.as_str(), "70 chars"),
            ("abc.\n\ndef", "end in '.'"),
            ("abc\n\ndef", ""),
        ];
        for (input, want) in cases {
            let got = check_commit_message(input).unwrap_or_default();
            if want.is_empty() {
                assert!(got.is_empty(), "want no complaint for {input:?}, got {got:?}");
            } else {
                assert!(
                    got.contains(want),
                    "got {got:?}, want substring {want:?} for {input:?}"
                );
            }
        }
    }

    #[test]
    fn commit_footer_rules() {
        let cases = [
            ("abc", "two paragraphs"),
            ("abc\n\ndef\n", "not found"),
            ("abc.\n\nmyfooter:abc", "space after"),
            ("abc\n\nChange-Id: Iabc123\nmyfooter: value!", ""),
        ];
        for (input, want) in cases {
            let got = check_commit_footer(input, "myfooter").unwrap_or_default();
            if want.is_empty() {
                assert!(got.is_empty(), "want no complaint for {input:?}, got {got:?}");
            } else {
                assert!(
                    got.contains(want),
                    "got {got:?}, want substring {want:?} for {input:?}"
                );
            }
        }
    }

    #[test]
    fn empty_footer_key_is_rejected() {
        let got = check_commit_footer("abc\n\ndef", "").unwrap();
        assert!(got.contains("non-empty"));
    }

    #[tokio::test]
    async fn clean_message_returns_content_unchanged() {
        let file = SourceFile {
            language: "commitmsg".to_string(),
            name: "/COMMIT_MSG".to_string(),
            content: b"abc\n\ndef".to_vec(),
        };
        let output = CommitMessageFormatter.format(&[file.clone()]).await.unwrap();
        assert_eq!(output.files.len(), 1);
        assert_eq!(output.files[0].content.as_deref(), Some(file.content.as_slice()));
        assert_eq!(output.files[0].message, None);
    }

    #[tokio::test]
    async fn violating_message_returns_complaint_without_content() {
        let file = SourceFile {
            language: "commitmsg".to_string(),
            name: "/COMMIT_MSG".to_string(),
            content: b"abc".to_vec(),
        };
        let output = CommitMessageFormatter.format(&[file]).await.unwrap();
        assert_eq!(output.files[0].content, None);
        assert_eq!(
            output.files[0].message.as_deref(),
            Some("must have multiple lines")
        );
    }

    #[tokio::test]
    async fn footer_strategy_accepts_structurally_valid_pair() {
        let file = SourceFile {
            language: "commitfooter-myfooter".to_string(),
            name: "/COMMIT_MSG".to_string(),
            content: b"abc\n\nChange-Id: I1\nmyfooter: value!".to_vec(),
        };
        let output = CommitFooterFormatter::new("myfooter")
            .format(&[file])
            .await
            .unwrap();
        assert_eq!(output.files[0].message, None);
        assert!(output.files[0].content.is_some());
    }
}
