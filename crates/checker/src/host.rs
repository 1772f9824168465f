//! The review-server port.
//!
//! The core drives checks through [`ReviewHost`] and never sees transport
//! details. Infrastructure crates implement this trait; the in-memory fake
//! used by the tests implements it too.

use async_trait::async_trait;
use thiserror::Error;

use crate::identifiers::{ChangeId, PatchSetId};
use crate::types::{CheckReport, PendingCheckEntry, RevisionFileSet};

/// A transport-level failure while talking to the review server.
#[derive(Debug, Error)]
pub enum HostError {
    /// The server answered with a non-success HTTP status.
    #[error("{method} {url}: status {status}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
    },

    /// The request never completed (connection, TLS, timeout, ...).
    #[error("transport: {0}")]
    Transport(String),

    /// The response body could not be decoded.
    #[error("decode: {0}")]
    Decode(String),
}

/// Operations the core consumes from the review server.
///
/// All calls are point-in-time snapshots; the server is the system of record
/// and nothing returned here is cached by the core.
#[async_trait]
pub trait ReviewHost: Send + Sync {
    /// Lists every check pending under the given registration scheme.
    async fn pending_checks(&self, scheme: &str) -> Result<Vec<PendingCheckEntry>, HostError>;

    /// Fetches the file set of one revision, with content for every
    /// non-deleted file.
    async fn revision_files(
        &self,
        change: ChangeId,
        patch_set: PatchSetId,
    ) -> Result<RevisionFileSet, HostError>;

    /// Posts one check state transition onto a revision.
    async fn report_check(
        &self,
        change: ChangeId,
        patch_set: PatchSetId,
        report: &CheckReport,
    ) -> Result<(), HostError>;
}
