//! Error taxonomy for check execution.
//!
//! [`CheckError`] covers everything that can go wrong while executing one
//! check. Everything that fails *inside* a check — including fetching the
//! revision's files — folds into that check's `FAILED` verdict; only
//! failures to post a state or to list pending checks propagate to the
//! scheduler as the round error and trigger the backoff sleep.
//!
//! [`CheckError::Irrelevant`] is a sentinel, not a failure: it signals that
//! no file of the revision matched the checker's filter and produces the
//! `IRRELEVANT` state.

use thiserror::Error;

use crate::host::HostError;
use crate::identifiers::CheckerUuid;

/// Errors arising while executing a single check.
#[derive(Debug, Error)]
pub enum CheckError {
    /// No file in the revision matched the checker's file filter.
    ///
    /// Not a failure; the executor translates it into the `IRRELEVANT`
    /// terminal state without invoking any strategy.
    #[error("irrelevant")]
    Irrelevant,

    /// The checker's language has no registered formatter.
    ///
    /// Happens when a checker was registered for an external tool that was
    /// not discoverable at startup.
    #[error("language {language:?} not configured")]
    NotConfigured {
        /// The language identifier decoded from the checker UUID.
        language: String,
    },

    /// The checker UUID does not decode into a language identifier.
    #[error("uuid \"{uuid}\" has unknown language")]
    UnknownLanguage {
        /// The undecodable UUID, quoted verbatim in the verdict message.
        uuid: CheckerUuid,
    },

    /// A source file arrived without a language tag.
    #[error("file {file:?} has empty language")]
    MissingLanguage {
        /// Name of the offending file.
        file: String,
    },

    /// An external formatting tool exited non-zero.
    ///
    /// The tool's full stdout/stderr is logged locally; the remote-facing
    /// message carries only this summary.
    #[error("{tool} exited with {status}")]
    ToolFailed {
        /// Display name of the tool (e.g. `"gofmt"`).
        tool: String,
        /// The process exit status.
        status: std::process::ExitStatus,
    },

    /// Staging, spawning, or reading back files for an external tool failed.
    #[error("tool {tool}: {source}")]
    ToolIo {
        /// Display name of the tool.
        tool: String,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A strategy answered for a file that was not in the request.
    ///
    /// Unrecoverable for this check; no verdict can be derived from a reply
    /// that does not correspond to the request.
    #[error("result had unknown file {file:?}")]
    Protocol {
        /// The unrequested file name in the reply.
        file: String,
    },

    /// Talking to the review server failed.
    ///
    /// Becomes the round error when raised by a state post or the pending
    /// listing; a fetch failure inside a check folds into its verdict like
    /// any other check error.
    #[error(transparent)]
    Host(#[from] HostError),
}
