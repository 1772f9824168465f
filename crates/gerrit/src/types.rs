//! Wire types for the Gerrit checks REST API.
//!
//! Field names follow Gerrit's JSON bodies verbatim; the `checker` crate
//! never sees these shapes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use checker::{CheckReport, CheckState, CheckerDefinition, Timestamp};

/// One entry of `a/plugins/checks/checks.pending/`.
#[derive(Debug, Clone, Deserialize)]
pub struct PendingChecksInfo {
    pub patch_set: CheckablePatchSetInfo,
    #[serde(default)]
    pub pending_checks: HashMap<String, PendingCheckInfo>,
}

/// The revision a pending check applies to.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckablePatchSetInfo {
    pub repository: String,
    pub change_number: u64,
    pub patch_set_id: u64,
}

/// Per-checker pending state; Gerrit reports `NOT_STARTED` here, which is
/// outside the core's state set, so the raw string is kept.
#[derive(Debug, Clone, Deserialize)]
pub struct PendingCheckInfo {
    #[serde(default)]
    pub state: Option<String>,
}

/// Body of `POST a/changes/<c>/revisions/<ps>/checks/`.
#[derive(Debug, Clone, Serialize)]
pub struct CheckInput {
    pub checker_uuid: String,
    pub state: CheckState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started: Option<Timestamp>,
}

impl From<&CheckReport> for CheckInput {
    fn from(report: &CheckReport) -> Self {
        Self {
            checker_uuid: report.checker.as_str().to_string(),
            state: report.state,
            message: report.message.clone(),
            started: report.started,
        }
    }
}

/// A posted check, as echoed back by the server.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckInfo {
    #[serde(default)]
    pub checker_uuid: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub started: Option<Timestamp>,
    #[serde(default)]
    pub updated: Option<Timestamp>,
}

/// One file of a revision as listed by `.../files/`.
///
/// Content is not part of this body; it is fetched per file from the
/// `content` endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileInfo {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub binary: Option<bool>,
    #[serde(default)]
    pub old_path: Option<String>,
    #[serde(default)]
    pub size: Option<i64>,
    #[serde(default)]
    pub size_delta: Option<i64>,
}

/// Body of `POST a/plugins/checks/checkers/` (creation and update).
#[derive(Debug, Clone, Serialize)]
pub struct CheckerInput {
    pub uuid: String,
    pub name: String,
    pub description: String,
    pub repository: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl From<&CheckerDefinition> for CheckerInput {
    fn from(definition: &CheckerDefinition) -> Self {
        Self {
            uuid: definition.uuid.as_str().to_string(),
            name: definition.name.clone(),
            description: definition.description.clone(),
            repository: definition.repository.as_str().to_string(),
            status: "ENABLED".to_string(),
            query: definition.query.clone(),
        }
    }
}

/// A registered checker, as listed by the server.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckerInfo {
    pub uuid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub repository: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub query: Option<String>,
}
