//! Shared value types for the formatting-check domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types
//! carry meaningful values with invariants (e.g. a [`FormattedFile`] answers
//! with either content or a message, never both meaningfully) and participate
//! in domain computations.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::identifiers::{ChangeId, CheckerUuid, PatchSetId, RepositoryName};

// ---------------------------------------------------------------------------
// Check states
// ---------------------------------------------------------------------------

/// The state of one check on one revision, as reported to the review server.
///
/// `Running` is posted before work starts; the remaining states are terminal.
/// States are never retained locally — the server is the system of record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckState {
    Unset,
    Running,
    Successful,
    Failed,
    Irrelevant,
}

impl CheckState {
    /// Returns `true` for states that end a check's lifecycle.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CheckState::Successful | CheckState::Failed | CheckState::Irrelevant
        )
    }
}

impl std::fmt::Display for CheckState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CheckState::Unset => "UNSET",
            CheckState::Running => "RUNNING",
            CheckState::Successful => "SUCCESSFUL",
            CheckState::Failed => "FAILED",
            CheckState::Irrelevant => "IRRELEVANT",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Revision files
// ---------------------------------------------------------------------------

/// How a file changed in a revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileStatus {
    Added,
    #[default]
    Modified,
    Deleted,
    Renamed,
    Copied,
    Rewritten,
}

impl FileStatus {
    /// Maps the review server's one-letter status code. An absent code means
    /// the file was modified.
    pub fn from_code(code: Option<&str>) -> Self {
        match code {
            Some("A") => FileStatus::Added,
            Some("D") => FileStatus::Deleted,
            Some("R") => FileStatus::Renamed,
            Some("C") => FileStatus::Copied,
            Some("W") => FileStatus::Rewritten,
            _ => FileStatus::Modified,
        }
    }
}

/// One file of a revision: its change status and, unless deleted, its full
/// content.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RevisionFile {
    pub status: FileStatus,
    pub content: Option<Vec<u8>>,
}

/// All files touched by one (change, patch set) pair, keyed by path.
///
/// Fetched fresh per check; never cached by the core.
pub type RevisionFileSet = BTreeMap<String, RevisionFile>;

// ---------------------------------------------------------------------------
// Format requests and replies
// ---------------------------------------------------------------------------

/// A single file handed to a formatter strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub language: String,
    pub name: String,
    pub content: Vec<u8>,
}

/// An ordered batch of files from one revision to be formatted.
///
/// Never empty when handed to a strategy; an empty candidate set
/// short-circuits to an `IRRELEVANT` verdict before any strategy runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormatRequest {
    pub files: Vec<SourceFile>,
}

/// A formatter strategy's answer for one file.
///
/// `content` carries the (possibly rewritten) canonical bytes; `message`
/// carries a diagnostic when the strategy chose not to reformat. Exactly one
/// of the two is the answer for a given file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormattedFile {
    pub name: String,
    pub content: Option<Vec<u8>>,
    pub message: Option<String>,
}

// ---------------------------------------------------------------------------
// Pending checks and reports
// ---------------------------------------------------------------------------

/// One poll result entry: a revision together with the checkers still owed a
/// verdict for it. Produced by the review server per poll; a fresh snapshot
/// every round.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCheckEntry {
    pub change: ChangeId,
    pub patch_set: PatchSetId,
    pub repository: RepositoryName,
    pub checkers: Vec<CheckerUuid>,
}

/// A state transition posted to the review server for one checker on one
/// revision. Discarded immediately after posting.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckReport {
    pub checker: CheckerUuid,
    pub state: CheckState,
    pub message: Option<String>,
    pub started: Option<Timestamp>,
}

impl CheckReport {
    /// A `RUNNING` transition stamped with the current time.
    pub fn running(checker: CheckerUuid) -> Self {
        Self {
            checker,
            state: CheckState::Running,
            message: None,
            started: Some(Timestamp::now()),
        }
    }

    /// A terminal transition with an optional remote-facing message.
    pub fn terminal(checker: CheckerUuid, state: CheckState, message: String) -> Self {
        Self {
            checker,
            state,
            message: if message.is_empty() { None } else { Some(message) },
            started: None,
        }
    }
}

/// A checker as registered (or to be registered) on the review server.
///
/// Immutable after creation except through an explicit update.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckerDefinition {
    pub uuid: CheckerUuid,
    pub name: String,
    pub description: String,
    pub repository: RepositoryName,
    pub query: Option<String>,
}

impl CheckerDefinition {
    /// Builds the definition for a language checker on a repository.
    pub fn new(
        scheme: &str,
        language: &str,
        repository: RepositoryName,
        query: Option<String>,
    ) -> Self {
        Self {
            uuid: CheckerUuid::encode(scheme, language, &repository),
            name: format!("{language} formatting"),
            description: "check source code formatting.".to_string(),
            repository,
            query,
        }
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// The review server's wire format for timestamps: UTC wall-clock time with
/// nanosecond precision and no zone designator.
const TIMESTAMP_WIRE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.9f";

/// A UTC wall-clock timestamp in the review server's wire format.
///
/// Wraps [`chrono::NaiveDateTime`] so callers never depend on `chrono` types
/// directly; serde round-trips the server's `"YYYY-MM-DD HH:MM:SS.nnnnnnnnn"`
/// representation exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(NaiveDateTime);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(chrono::Utc::now().naive_utc())
    }

    /// Creates a [`Timestamp`] from a [`NaiveDateTime`] interpreted as UTC.
    pub fn from_naive_utc(dt: NaiveDateTime) -> Self {
        Self(dt)
    }

    /// Returns the underlying [`NaiveDateTime`].
    pub fn as_naive_utc(self) -> NaiveDateTime {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(TIMESTAMP_WIRE_FORMAT))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0.format(TIMESTAMP_WIRE_FORMAT))
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_WIRE_FORMAT)
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_state_wire_names() {
        assert_eq!(
            serde_json::to_string(&CheckState::Successful).unwrap(),
            "\"SUCCESSFUL\""
        );
        assert_eq!(
            serde_json::from_str::<CheckState>("\"IRRELEVANT\"").unwrap(),
            CheckState::Irrelevant
        );
        assert_eq!(CheckState::Failed.to_string(), "FAILED");
    }

    #[test]
    fn terminal_states() {
        assert!(CheckState::Successful.is_terminal());
        assert!(CheckState::Failed.is_terminal());
        assert!(CheckState::Irrelevant.is_terminal());
        assert!(!CheckState::Running.is_terminal());
        assert!(!CheckState::Unset.is_terminal());
    }

    #[test]
    fn timestamp_round_trips_wire_format() {
        let input = "\"2020-04-06 09:06:20.000000000\"";
        let ts: Timestamp = serde_json::from_str(input).unwrap();
        assert_eq!(serde_json::to_string(&ts).unwrap(), input);
    }

    #[test]
    fn file_status_codes() {
        assert_eq!(FileStatus::from_code(Some("A")), FileStatus::Added);
        assert_eq!(FileStatus::from_code(Some("D")), FileStatus::Deleted);
        assert_eq!(FileStatus::from_code(None), FileStatus::Modified);
        assert_eq!(FileStatus::from_code(Some("?")), FileStatus::Modified);
    }

    #[test]
    fn empty_terminal_message_is_omitted() {
        let uuid = CheckerUuid::new("fmt:go-abc").unwrap();
        let report = CheckReport::terminal(uuid, CheckState::Successful, String::new());
        assert_eq!(report.message, None);
        assert_eq!(report.started, None);
    }
}
