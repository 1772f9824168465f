//! In-memory [`ReviewHost`] fake for executor and scheduler tests.
//!
//! Mirrors the remote contract closely enough for end-to-end scenarios: a
//! terminal report resolves the pending check, and failure injection covers
//! the transport-error paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::host::{HostError, ReviewHost};
use crate::identifiers::{ChangeId, CheckerUuid, PatchSetId, RepositoryName};
use crate::types::{
    CheckReport, CheckState, PendingCheckEntry, RevisionFile, RevisionFileSet,
};

pub(crate) struct InMemoryHost {
    pending: Mutex<Vec<PendingCheckEntry>>,
    revisions: Mutex<HashMap<(ChangeId, PatchSetId), RevisionFileSet>>,
    reports: Mutex<Vec<(ChangeId, PatchSetId, CheckReport)>>,
    attempts: Mutex<Vec<CheckerUuid>>,
    fail_reports: AtomicBool,
    fail_listing: AtomicBool,
}

impl InMemoryHost {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
            revisions: Mutex::new(HashMap::new()),
            reports: Mutex::new(Vec::new()),
            attempts: Mutex::new(Vec::new()),
            fail_reports: AtomicBool::new(false),
            fail_listing: AtomicBool::new(false),
        }
    }

    pub fn entry(change: u64, patch_set: u64, checkers: &[&CheckerUuid]) -> PendingCheckEntry {
        PendingCheckEntry {
            change: ChangeId::new(change),
            patch_set: PatchSetId::new(patch_set),
            repository: RepositoryName::new("test-repo").unwrap(),
            checkers: checkers.iter().map(|&uuid| uuid.clone()).collect(),
        }
    }

    pub fn add_pending(&self, entry: PendingCheckEntry) {
        self.pending.lock().unwrap().push(entry);
    }

    pub fn put_revision(&self, change: u64, patch_set: u64, files: RevisionFileSet) {
        self.revisions
            .lock()
            .unwrap()
            .insert((ChangeId::new(change), PatchSetId::new(patch_set)), files);
    }

    /// Every successfully posted report, in order.
    pub fn reports(&self) -> Vec<(ChangeId, PatchSetId, CheckReport)> {
        self.reports.lock().unwrap().clone()
    }

    /// Terminal (state, message) pairs posted for one checker, in order.
    pub fn terminal_states(&self, uuid: &CheckerUuid) -> Vec<(CheckState, Option<String>)> {
        self.reports
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, _, report)| &report.checker == uuid && report.state.is_terminal())
            .map(|(_, _, report)| (report.state, report.message.clone()))
            .collect()
    }

    /// Every report attempt (including rejected ones), in order.
    pub fn attempts(&self) -> Vec<CheckerUuid> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn set_fail_reports(&self, fail: bool) {
        self.fail_reports.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }
}

/// A revision whose only file is the commit-message pseudo-file.
pub(crate) fn commit_msg_revision(message: &str) -> RevisionFileSet {
    let mut files = RevisionFileSet::new();
    files.insert(
        crate::formatter::COMMIT_MSG_FILE.to_string(),
        RevisionFile {
            content: Some(message.as_bytes().to_vec()),
            ..RevisionFile::default()
        },
    );
    files
}

#[async_trait]
impl ReviewHost for InMemoryHost {
    async fn pending_checks(&self, _scheme: &str) -> Result<Vec<PendingCheckEntry>, HostError> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(HostError::Transport("injected listing failure".to_string()));
        }
        Ok(self.pending.lock().unwrap().clone())
    }

    async fn revision_files(
        &self,
        change: ChangeId,
        patch_set: PatchSetId,
    ) -> Result<RevisionFileSet, HostError> {
        self.revisions
            .lock()
            .unwrap()
            .get(&(change, patch_set))
            .cloned()
            .ok_or_else(|| HostError::Transport(format!("no revision {change}/{patch_set}")))
    }

    async fn report_check(
        &self,
        change: ChangeId,
        patch_set: PatchSetId,
        report: &CheckReport,
    ) -> Result<(), HostError> {
        self.attempts.lock().unwrap().push(report.checker.clone());
        if self.fail_reports.load(Ordering::SeqCst) {
            return Err(HostError::Transport("injected report failure".to_string()));
        }
        self.reports
            .lock()
            .unwrap()
            .push((change, patch_set, report.clone()));

        // A terminal report resolves the pending check, as the real server
        // does.
        if report.state.is_terminal() {
            let mut pending = self.pending.lock().unwrap();
            for entry in pending.iter_mut() {
                if entry.change == change && entry.patch_set == patch_set {
                    entry.checkers.retain(|uuid| uuid != &report.checker);
                }
            }
            pending.retain(|entry| !entry.checkers.is_empty());
        }
        Ok(())
    }
}
