//! Per-check execution: the `UNSET → RUNNING → {SUCCESSFUL, FAILED,
//! IRRELEVANT}` state machine.
//!
//! For each checker owed on a revision the executor posts `RUNNING`, decodes
//! the checker's language, fetches and filters the revision's files, runs the
//! resolved strategy, diffs the reply against the originals, and posts the
//! terminal verdict. Only report-posting failures abort an entry; everything
//! that goes wrong inside a check folds into that check's `FAILED` verdict.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::errors::CheckError;
use crate::formatter::FormatterRegistry;
use crate::host::ReviewHost;
use crate::identifiers::{ChangeId, PatchSetId};
use crate::types::{
    CheckReport, CheckState, FileStatus, FormatRequest, PendingCheckEntry, SourceFile,
};

/// Upper bound on the remote-facing verdict message, in bytes.
///
/// Longer messages are cut to leave room for the ellipsis marker, so reports
/// never exceed the remote API's message-size limits.
pub const MESSAGE_LIMIT: usize = 1000;

/// Executes all checks owed on one pending entry.
pub struct CheckExecutor {
    host: Arc<dyn ReviewHost>,
    registry: FormatterRegistry,
    scheme: String,
}

impl CheckExecutor {
    pub fn new(
        host: Arc<dyn ReviewHost>,
        registry: FormatterRegistry,
        scheme: impl Into<String>,
    ) -> Self {
        Self {
            host,
            registry,
            scheme: scheme.into(),
        }
    }

    /// Runs the state machine for every checker UUID owed on the entry.
    ///
    /// Returns an error only when posting a state to the review server
    /// failed; such an error aborts the remaining checkers of this entry but
    /// leaves other entries of the round untouched.
    pub async fn execute(&self, entry: &PendingCheckEntry) -> Result<(), CheckError> {
        for uuid in &entry.checkers {
            info!(
                change = %entry.change,
                patch_set = %entry.patch_set,
                checker = %uuid,
                "check set to RUNNING"
            );
            self.host
                .report_check(entry.change, entry.patch_set, &CheckReport::running(uuid.clone()))
                .await?;

            let (state, message) = match uuid.language(&self.scheme) {
                None => {
                    let err = CheckError::UnknownLanguage { uuid: uuid.clone() };
                    (CheckState::Failed, err.to_string())
                }
                Some(language) => {
                    match self.check_revision(entry.change, entry.patch_set, language).await {
                        Err(CheckError::Irrelevant) => (CheckState::Irrelevant, String::new()),
                        Err(err) => {
                            warn!(
                                change = %entry.change,
                                patch_set = %entry.patch_set,
                                %language,
                                error = %err,
                                "check failed"
                            );
                            (
                                CheckState::Failed,
                                truncate_message(format!("tool failure: {err}")),
                            )
                        }
                        Ok(complaints) if complaints.is_empty() => {
                            (CheckState::Successful, String::new())
                        }
                        Ok(complaints) => (
                            CheckState::Failed,
                            truncate_message(complaints.join(", ")),
                        ),
                    }
                }
            };

            info!(
                change = %entry.change,
                patch_set = %entry.patch_set,
                checker = %uuid,
                %state,
                "posting verdict"
            );
            self.host
                .report_check(
                    entry.change,
                    entry.patch_set,
                    &CheckReport::terminal(uuid.clone(), state, message),
                )
                .await?;
        }
        Ok(())
    }

    /// Checks one revision in one language, returning the complaints.
    ///
    /// [`CheckError::Irrelevant`] signals that no file matched the checker's
    /// filter; any other error is this check's failure.
    async fn check_revision(
        &self,
        change: ChangeId,
        patch_set: PatchSetId,
        language: &str,
    ) -> Result<Vec<String>, CheckError> {
        let entry = self
            .registry
            .resolve(language)
            .ok_or_else(|| CheckError::NotConfigured {
                language: language.to_string(),
            })?;

        let files = self.host.revision_files(change, patch_set).await?;
        let mut request = FormatRequest::default();
        for (name, file) in &files {
            if !entry.filter.is_match(name) {
                continue;
            }
            if file.status == FileStatus::Deleted {
                continue;
            }
            request.files.push(SourceFile {
                language: language.to_string(),
                name: name.clone(),
                content: file.content.clone().unwrap_or_default(),
            });
        }
        if request.files.is_empty() {
            return Err(CheckError::Irrelevant);
        }

        let reply = self.registry.format(&request).await?;

        let mut complaints = Vec::new();
        for formatted in &reply {
            let Some(original) = files.get(&formatted.name) else {
                return Err(CheckError::Protocol {
                    file: formatted.name.clone(),
                });
            };
            let original_content = original.content.as_deref().unwrap_or_default();
            if formatted.content.as_deref() == Some(original_content) {
                debug!(%change, %patch_set, file = %formatted.name, "file OK");
            } else {
                let message = formatted
                    .message
                    .clone()
                    .unwrap_or_else(|| "found a difference".to_string());
                debug!(%change, %patch_set, file = %formatted.name, %message, "file differs");
                complaints.push(format!("{}: {}", formatted.name, message));
            }
        }
        Ok(complaints)
    }
}

/// Cuts a message to [`MESSAGE_LIMIT`] bytes, ending in a visible `"..."`
/// so a partial report is unambiguous.
fn truncate_message(mut message: String) -> String {
    if message.len() > MESSAGE_LIMIT {
        let mut cut = MESSAGE_LIMIT - 5;
        while !message.is_char_boundary(cut) {
            cut -= 1;
        }
        message.truncate(cut);
        message.push_str("...");
    }
    message
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use regex::Regex;

    use super::*;
    use crate::config::{ToolLocations, DEFAULT_SCHEME};
    use crate::formatter::{FormatOutput, Formatter, FormatterEntry};
    use crate::identifiers::{CheckerUuid, RepositoryName};
    use crate::testing::{commit_msg_revision, InMemoryHost};
    use crate::types::{FormattedFile, RevisionFile, RevisionFileSet};

    fn registry() -> FormatterRegistry {
        FormatterRegistry::probe(&ToolLocations::default()).0
    }

    fn repo() -> RepositoryName {
        RepositoryName::new("test-repo").unwrap()
    }

    fn executor(host: Arc<InMemoryHost>, registry: FormatterRegistry) -> CheckExecutor {
        CheckExecutor::new(host, registry, DEFAULT_SCHEME)
    }

    #[tokio::test]
    async fn single_line_commit_message_fails_with_one_complaint() {
        let uuid = CheckerUuid::encode(DEFAULT_SCHEME, "commitmsg", &repo());
        let host = Arc::new(InMemoryHost::new());
        host.put_revision(7, 1, commit_msg_revision("abc"));

        let entry = InMemoryHost::entry(7, 1, &[&uuid]);
        executor(host.clone(), registry()).execute(&entry).await.unwrap();

        let reports = host.reports();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].2.state, CheckState::Running);
        assert!(reports[0].2.started.is_some());
        assert_eq!(
            host.terminal_states(&uuid),
            vec![(
                CheckState::Failed,
                Some("/COMMIT_MSG: must have multiple lines".to_string())
            )]
        );
    }

    #[tokio::test]
    async fn clean_commit_message_is_successful() {
        let uuid = CheckerUuid::encode(DEFAULT_SCHEME, "commitmsg", &repo());
        let host = Arc::new(InMemoryHost::new());
        host.put_revision(7, 1, commit_msg_revision("Add linter\n\nChange-Id: I1\n"));

        let entry = InMemoryHost::entry(7, 1, &[&uuid]);
        executor(host.clone(), registry()).execute(&entry).await.unwrap();

        assert_eq!(
            host.terminal_states(&uuid),
            vec![(CheckState::Successful, None)]
        );
    }

    #[tokio::test]
    async fn no_matching_file_is_irrelevant() {
        let uuid = CheckerUuid::encode(DEFAULT_SCHEME, "commitmsg", &repo());
        let host = Arc::new(InMemoryHost::new());
        let mut files = RevisionFileSet::new();
        files.insert(
            "src/main.rs".to_string(),
            RevisionFile {
                content: Some(b"fn main() {}\n".to_vec()),
                ..RevisionFile::default()
            },
        );
        host.put_revision(7, 1, files);

        let entry = InMemoryHost::entry(7, 1, &[&uuid]);
        executor(host.clone(), registry()).execute(&entry).await.unwrap();

        assert_eq!(
            host.terminal_states(&uuid),
            vec![(CheckState::Irrelevant, None)]
        );
    }

    #[tokio::test]
    async fn undecodable_uuid_fails_with_unknown_language() {
        let uuid = CheckerUuid::new("fmt:garbage").unwrap();
        let host = Arc::new(InMemoryHost::new());
        host.put_revision(7, 1, commit_msg_revision("abc"));

        let entry = InMemoryHost::entry(7, 1, &[&uuid]);
        executor(host.clone(), registry()).execute(&entry).await.unwrap();

        let states = host.terminal_states(&uuid);
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].0, CheckState::Failed);
        assert!(states[0].1.as_deref().unwrap().contains("unknown language"));
    }

    #[tokio::test]
    async fn unconfigured_language_fails_with_tool_failure() {
        // `go` is not registered because no gofmt was located at probe time.
        let uuid = CheckerUuid::encode(DEFAULT_SCHEME, "go", &repo());
        let host = Arc::new(InMemoryHost::new());
        host.put_revision(7, 1, commit_msg_revision("abc"));

        let entry = InMemoryHost::entry(7, 1, &[&uuid]);
        executor(host.clone(), registry()).execute(&entry).await.unwrap();

        let states = host.terminal_states(&uuid);
        assert_eq!(states[0].0, CheckState::Failed);
        let message = states[0].1.as_deref().unwrap();
        assert!(message.starts_with("tool failure: "));
        assert!(message.contains("not configured"));
    }

    #[tokio::test]
    async fn identity_tool_round_trip_is_successful() {
        use crate::formatter::ToolFormatter;

        // `true` never rewrites anything, so every staged file reads back
        // byte-identical and the verdict must be SUCCESSFUL.
        let mut registry = registry();
        registry.register_fixed(
            "go",
            FormatterEntry {
                filter: Regex::new(r"\.go$").unwrap(),
                query: None,
                formatter: Arc::new(ToolFormatter::new("true", "true", Vec::<String>::new())),
            },
        );
        let uuid = CheckerUuid::encode(DEFAULT_SCHEME, "go", &repo());
        let host = Arc::new(InMemoryHost::new());
        let mut files = RevisionFileSet::new();
        for (name, content) in [("cmd/main.go", "package main\n"), ("lib/util.go", "package lib\n")] {
            files.insert(
                name.to_string(),
                RevisionFile {
                    content: Some(content.as_bytes().to_vec()),
                    ..RevisionFile::default()
                },
            );
        }
        host.put_revision(9, 2, files);

        let entry = InMemoryHost::entry(9, 2, &[&uuid]);
        executor(host.clone(), registry).execute(&entry).await.unwrap();

        assert_eq!(
            host.terminal_states(&uuid),
            vec![(CheckState::Successful, None)]
        );
    }

    struct UnknownFileFormatter;

    #[async_trait]
    impl Formatter for UnknownFileFormatter {
        async fn format(&self, _files: &[SourceFile]) -> Result<FormatOutput, CheckError> {
            Ok(FormatOutput {
                files: vec![FormattedFile {
                    name: "not-in-request".to_string(),
                    content: Some(Vec::new()),
                    message: None,
                }],
                diagnostic: String::new(),
            })
        }
    }

    #[tokio::test]
    async fn reply_for_unknown_file_fails_the_check() {
        let mut registry = registry();
        registry.register_fixed(
            "weird",
            FormatterEntry {
                filter: Regex::new(r"\.weird$").unwrap(),
                query: None,
                formatter: Arc::new(UnknownFileFormatter),
            },
        );
        let uuid = CheckerUuid::encode(DEFAULT_SCHEME, "weird", &repo());
        let host = Arc::new(InMemoryHost::new());
        let mut files = RevisionFileSet::new();
        files.insert(
            "a.weird".to_string(),
            RevisionFile {
                content: Some(b"x".to_vec()),
                ..RevisionFile::default()
            },
        );
        host.put_revision(7, 1, files);

        let entry = InMemoryHost::entry(7, 1, &[&uuid]);
        executor(host.clone(), registry).execute(&entry).await.unwrap();

        let states = host.terminal_states(&uuid);
        assert_eq!(states[0].0, CheckState::Failed);
        assert!(states[0]
            .1
            .as_deref()
            .unwrap()
            .contains("unknown file \"not-in-request\""));
    }

    #[tokio::test]
    async fn report_post_failure_aborts_the_entry() {
        let uuid = CheckerUuid::encode(DEFAULT_SCHEME, "commitmsg", &repo());
        let host = Arc::new(InMemoryHost::new());
        host.put_revision(7, 1, commit_msg_revision("abc"));
        host.set_fail_reports(true);

        let entry = InMemoryHost::entry(7, 1, &[&uuid]);
        let err = executor(host.clone(), registry())
            .execute(&entry)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckError::Host(_)));
        assert!(host.reports().is_empty());
    }

    #[test]
    fn truncation_bounds_the_message() {
        let message = truncate_message("x".repeat(5000));
        assert_eq!(message.len(), MESSAGE_LIMIT - 5 + 3);
        assert!(message.ends_with("..."));

        let short = truncate_message("all good".to_string());
        assert_eq!(short, "all good");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // 'é' is two bytes; the cut point lands mid-character and must back
        // off instead of panicking.
        let message = truncate_message("é".repeat(1000));
        assert!(message.ends_with("..."));
        assert!(message.len() <= MESSAGE_LIMIT);
    }
}
