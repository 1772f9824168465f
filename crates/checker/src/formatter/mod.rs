//! The formatter registry: maps a language identifier to a file-name filter
//! and a formatting strategy.
//!
//! Fixed entries are registered at probe time; the `commitfooter-<key>`
//! family is a parametrized registration whose strategy is constructed per
//! lookup from the key embedded in the language identifier. External-tool
//! entries are registered only when their binary was located, so a probe
//! returns the registry together with the list of skipped languages.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;

use crate::config::ToolLocations;
use crate::errors::CheckError;
use crate::types::{FormatRequest, FormattedFile, SourceFile};

mod commit;
mod tool;

pub use commit::{CommitFooterFormatter, CommitMessageFormatter};
pub use tool::ToolFormatter;

/// The pseudo-file under which the review server exposes a revision's commit
/// message.
pub const COMMIT_MSG_FILE: &str = "/COMMIT_MSG";

const COMMIT_MSG_PATTERN: &str = r"^/COMMIT_MSG$";
const COMMIT_FOOTER_PREFIX: &str = "commitfooter-";

/// A formatting engine for a batch of same-language files.
#[async_trait]
pub trait Formatter: Send + Sync {
    /// Formats the files, which all share one language.
    ///
    /// The returned diagnostic, when non-empty, is attached to the first
    /// output file that has no per-file message of its own.
    async fn format(&self, files: &[SourceFile]) -> Result<FormatOutput, CheckError>;
}

/// A strategy's reply: per-file answers plus a batch-level diagnostic.
#[derive(Debug, Default)]
pub struct FormatOutput {
    pub files: Vec<FormattedFile>,
    pub diagnostic: String,
}

/// A resolved registry entry: which files a checker applies to and how to
/// format them.
#[derive(Clone)]
pub struct FormatterEntry {
    /// File-name filter selecting the checker's files within a revision.
    pub filter: Regex,
    /// Change-query fragment used when registering the checker remotely.
    pub query: Option<String>,
    /// The formatting strategy.
    pub formatter: Arc<dyn Formatter>,
}

/// A parametrized registration: languages sharing `prefix` resolve to a
/// freshly built strategy taking the rest of the identifier as parameter.
struct FamilyEntry {
    prefix: &'static str,
    filter: Regex,
    build: fn(&str) -> Arc<dyn Formatter>,
}

/// A language left out of the registry at probe time, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLanguage {
    pub language: String,
    pub reason: String,
}

/// Immutable language → formatter table, built once at startup.
pub struct FormatterRegistry {
    fixed: BTreeMap<String, FormatterEntry>,
    families: Vec<FamilyEntry>,
}

impl FormatterRegistry {
    /// Builds the registry from the resolved tool locations.
    ///
    /// The commit-message linter and the commit-footer family are always
    /// present; external-tool languages are present only when their binaries
    /// were located, and the second return value names the ones that were
    /// not.
    pub fn probe(tools: &ToolLocations) -> (Self, Vec<SkippedLanguage>) {
        let commit_msg = Regex::new(COMMIT_MSG_PATTERN).expect("commit message pattern");
        let mut fixed = BTreeMap::new();
        let mut skipped = Vec::new();

        fixed.insert(
            "commitmsg".to_string(),
            FormatterEntry {
                filter: commit_msg.clone(),
                query: None,
                formatter: Arc::new(CommitMessageFormatter),
            },
        );

        match &tools.gofmt {
            Some(bin) => {
                fixed.insert(
                    "go".to_string(),
                    FormatterEntry {
                        filter: Regex::new(r"\.go$").expect("go pattern"),
                        query: Some("ext:go".to_string()),
                        formatter: Arc::new(ToolFormatter::new("gofmt", bin, ["-w"])),
                    },
                );
            }
            None => skipped.push(SkippedLanguage {
                language: "go".to_string(),
                reason: "gofmt not found".to_string(),
            }),
        }

        match &tools.buildifier {
            Some(bin) => {
                fixed.insert(
                    "bzl".to_string(),
                    FormatterEntry {
                        filter: Regex::new(r"(\.bzl|/BUILD|^BUILD)$").expect("bzl pattern"),
                        query: Some("(ext:bzl OR file:BUILD OR file:WORKSPACE)".to_string()),
                        formatter: Arc::new(ToolFormatter::new("buildifier", bin, ["-mode=fix"])),
                    },
                );
            }
            None => skipped.push(SkippedLanguage {
                language: "bzl".to_string(),
                reason: "buildifier not found".to_string(),
            }),
        }

        match (&tools.java, &tools.google_java_format) {
            (Some(java), Some(jar)) => {
                fixed.insert(
                    "java".to_string(),
                    FormatterEntry {
                        filter: Regex::new(r"\.java$").expect("java pattern"),
                        query: Some("ext:java".to_string()),
                        formatter: Arc::new(ToolFormatter::new(
                            "google-java-format",
                            java,
                            vec![
                                "-jar".to_string(),
                                jar.to_string_lossy().into_owned(),
                                "-i".to_string(),
                            ],
                        )),
                    },
                );
            }
            (None, _) => skipped.push(SkippedLanguage {
                language: "java".to_string(),
                reason: "java runtime not found".to_string(),
            }),
            (Some(_), None) => skipped.push(SkippedLanguage {
                language: "java".to_string(),
                reason: "google-java-format.jar not found".to_string(),
            }),
        }

        let families = vec![FamilyEntry {
            prefix: COMMIT_FOOTER_PREFIX,
            filter: commit_msg,
            build: |key| Arc::new(CommitFooterFormatter::new(key)),
        }];

        (Self { fixed, families }, skipped)
    }

    /// Resolves a language identifier to its filter and strategy.
    ///
    /// Family identifiers are checked first: `commitfooter-<key>` yields a
    /// fresh footer strategy requiring `<key>`, filtered to the
    /// commit-message pseudo-file.
    pub fn resolve(&self, language: &str) -> Option<FormatterEntry> {
        for family in &self.families {
            if let Some(param) = language.strip_prefix(family.prefix) {
                return Some(FormatterEntry {
                    filter: family.filter.clone(),
                    query: None,
                    formatter: (family.build)(param),
                });
            }
        }
        self.fixed.get(language).cloned()
    }

    /// The change-query fragment for a registered language, if any.
    pub fn query(&self, language: &str) -> Option<String> {
        self.resolve(language).and_then(|entry| entry.query)
    }

    /// The fixed languages available in this registry, sorted.
    pub fn supported_languages(&self) -> Vec<&str> {
        self.fixed.keys().map(String::as_str).collect()
    }

    /// Formats every file of the request with its language's strategy.
    ///
    /// Files are grouped by language; each group goes to one strategy call.
    /// A group whose diagnostic is non-empty has it attached to the group's
    /// first output file lacking a per-file message.
    pub async fn format(&self, request: &FormatRequest) -> Result<Vec<FormattedFile>, CheckError> {
        for file in &request.files {
            if file.language.is_empty() {
                return Err(CheckError::MissingLanguage {
                    file: file.name.clone(),
                });
            }
        }

        let mut by_language: BTreeMap<&str, Vec<SourceFile>> = BTreeMap::new();
        for file in &request.files {
            by_language
                .entry(file.language.as_str())
                .or_default()
                .push(file.clone());
        }

        let mut reply = Vec::new();
        for (language, files) in by_language {
            let entry = self
                .resolve(language)
                .ok_or_else(|| CheckError::NotConfigured {
                    language: language.to_string(),
                })?;
            let mut output = entry.formatter.format(&files).await?;
            if !output.diagnostic.is_empty() {
                if let Some(first) = output
                    .files
                    .iter_mut()
                    .find(|file| file.message.is_none())
                {
                    first.message = Some(output.diagnostic.clone());
                }
            }
            reply.extend(output.files);
        }
        Ok(reply)
    }

    /// Registers a fixed entry directly; test seams only.
    #[cfg(test)]
    pub(crate) fn register_fixed(&mut self, language: &str, entry: FormatterEntry) {
        self.fixed.insert(language.to_string(), entry);
    }
}
