//! Gerrit infrastructure adapter.
//!
//! Implements the [`checker::ReviewHost`] trait over the Gerrit REST API:
//! pending-check listing, revision file fetching (including per-file content
//! transfer), and check-state posting. Also carries the checker-registration
//! calls used by the CLI's `--register`/`--update`/`--list` modes.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** URL construction, basic-auth headers, Gerrit's XSSI
//! guard prefix, and base64 content transfer all live here; the [`checker`]
//! crate sees only [`checker::ReviewHost`].

use std::collections::HashMap;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use checker::{
    ChangeId, CheckReport, CheckerDefinition, CheckerUuid, FileStatus, HostError, PatchSetId,
    PendingCheckEntry, RepositoryName, ReviewHost, RevisionFile, RevisionFileSet,
};

mod types;

pub use types::{
    CheckInfo, CheckInput, CheckablePatchSetInfo, CheckerInfo, CheckerInput, FileInfo,
    PendingCheckInfo, PendingChecksInfo,
};

/// Adds the `Basic` authorization header to outgoing requests.
#[derive(Clone)]
pub struct BasicAuth {
    encoded: String,
}

impl BasicAuth {
    /// Creates an authenticator from a `"user:secret"` credential.
    pub fn new(credential: &str) -> Self {
        Self {
            encoded: general_purpose::STANDARD.encode(credential.trim()),
        }
    }

    fn header_value(&self) -> String {
        format!("Basic {}", self.encoded)
    }
}

/// A single Gerrit host.
pub struct GerritServer {
    base: Url,
    client: reqwest::Client,
    user_agent: String,
    auth: Option<BasicAuth>,
}

impl GerritServer {
    /// Creates a client for the Gerrit server at `base`.
    pub fn new(base: Url) -> Self {
        Self {
            base,
            client: reqwest::Client::new(),
            user_agent: "fmt-checker".to_string(),
            auth: None,
        }
    }

    /// Attaches basic-auth credentials (`"user:secret"`).
    pub fn with_basic_auth(mut self, credential: &str) -> Self {
        self.auth = Some(BasicAuth::new(credential));
        self
    }

    /// Builds a URL under the server base from path segments.
    ///
    /// Segments are percent-encoded individually, so a file name containing
    /// `/` becomes one escaped segment as Gerrit's file endpoints require.
    /// An empty trailing segment yields the trailing slash some endpoints
    /// insist on.
    fn url(&self, segments: &[&str]) -> Result<Url, HostError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| HostError::Transport(format!("base url {} cannot-be-a-base", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(
        &self,
        method: &'static str,
        url: Url,
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, HostError> {
        let reqwest_method = match method {
            "POST" => reqwest::Method::POST,
            "PUT" => reqwest::Method::PUT,
            _ => reqwest::Method::GET,
        };
        debug!(%method, url = %url, "gerrit request");
        let mut request = self
            .client
            .request(reqwest_method, url.clone())
            .header(USER_AGENT, &self.user_agent);
        if let Some(auth) = &self.auth {
            request = request.header(AUTHORIZATION, auth.header_value());
        }
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| HostError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(HostError::Status {
                method,
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response
            .bytes()
            .await
            .map(|bytes| bytes.to_vec())
            .map_err(|e| HostError::Transport(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, HostError> {
        let body = self.send("GET", url, None).await?;
        unmarshal(&body)
    }

    async fn post_json<I: Serialize, O: DeserializeOwned>(
        &self,
        url: Url,
        input: &I,
    ) -> Result<O, HostError> {
        let body = serde_json::to_vec(input).map_err(|e| HostError::Decode(e.to_string()))?;
        let reply = self.send("POST", url, Some(body)).await?;
        unmarshal(&reply)
    }

    /// Lists all pending checks registered under a scheme.
    pub async fn pending_checks_by_scheme(
        &self,
        scheme: &str,
    ) -> Result<Vec<PendingChecksInfo>, HostError> {
        let mut url = self.url(&["a", "plugins", "checks", "checks.pending", ""])?;
        url.set_query(Some(&format!("query=scheme:{scheme}")));
        self.get_json(url).await
    }

    /// Lists the files of one revision, without content.
    pub async fn list_revision_files(
        &self,
        change: ChangeId,
        patch_set: PatchSetId,
    ) -> Result<HashMap<String, FileInfo>, HostError> {
        let url = self.url(&[
            "changes",
            &change.to_string(),
            "revisions",
            &patch_set.to_string(),
            "files",
            "",
        ])?;
        self.get_json(url).await
    }

    /// Fetches one file's content; the endpoint returns base64.
    pub async fn file_content(
        &self,
        change: ChangeId,
        patch_set: PatchSetId,
        name: &str,
    ) -> Result<Vec<u8>, HostError> {
        let url = self.url(&[
            "changes",
            &change.to_string(),
            "revisions",
            &patch_set.to_string(),
            "files",
            name,
            "content",
        ])?;
        let body = self.send("GET", url, None).await?;
        let encoded = String::from_utf8_lossy(&body);
        general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| HostError::Decode(format!("file content for {name:?}: {e}")))
    }

    /// Posts one check state onto a revision.
    pub async fn post_check(
        &self,
        change: ChangeId,
        patch_set: PatchSetId,
        input: &CheckInput,
    ) -> Result<CheckInfo, HostError> {
        let url = self.url(&[
            "a",
            "changes",
            &change.to_string(),
            "revisions",
            &patch_set.to_string(),
            "checks",
            "",
        ])?;
        self.post_json(url, input).await
    }

    /// Reads a single check back.
    pub async fn get_check(
        &self,
        change: ChangeId,
        patch_set: PatchSetId,
        uuid: &CheckerUuid,
    ) -> Result<CheckInfo, HostError> {
        let url = self.url(&[
            "changes",
            &change.to_string(),
            "revisions",
            &patch_set.to_string(),
            "checks",
            uuid.as_str(),
        ])?;
        self.get_json(url).await
    }

    /// Creates a checker, or updates the existing one when `update` is set.
    pub async fn register_checker(
        &self,
        definition: &CheckerDefinition,
        update: bool,
    ) -> Result<CheckerInfo, HostError> {
        let input = CheckerInput::from(definition);
        let url = if update {
            self.url(&["a", "plugins", "checks", "checkers", input.uuid.as_str()])?
        } else {
            self.url(&["a", "plugins", "checks", "checkers", ""])?
        };
        self.post_json(url, &input).await
    }

    /// Lists the checkers registered under a scheme whose UUIDs decode into
    /// a language.
    pub async fn list_checkers(&self, scheme: &str) -> Result<Vec<CheckerInfo>, HostError> {
        let url = self.url(&["a", "plugins", "checks", "checkers", ""])?;
        let all: Vec<CheckerInfo> = self.get_json(url).await?;
        Ok(all
            .into_iter()
            .filter(|info| {
                CheckerUuid::new(info.uuid.as_str())
                    .is_some_and(|uuid| {
                        info.uuid.starts_with(&format!("{scheme}:"))
                            && uuid.language(scheme).is_some()
                    })
            })
            .collect())
    }
}

/// Deserializes a Gerrit JSON body, stripping the `)]}'` XSSI guard prefix
/// when present.
fn unmarshal<T: DeserializeOwned>(body: &[u8]) -> Result<T, HostError> {
    serde_json::from_slice(strip_xssi(body)).map_err(|e| HostError::Decode(e.to_string()))
}

fn strip_xssi(body: &[u8]) -> &[u8] {
    match body.strip_prefix(b")]}'") {
        Some(rest) => rest.strip_prefix(b"\n").unwrap_or(rest),
        None => body,
    }
}

fn to_pending_entry(info: PendingChecksInfo) -> Result<PendingCheckEntry, HostError> {
    let repository = RepositoryName::new(info.patch_set.repository)
        .ok_or_else(|| HostError::Decode("pending check without repository".to_string()))?;
    let mut checkers: Vec<CheckerUuid> = info
        .pending_checks
        .keys()
        .filter_map(|uuid| CheckerUuid::new(uuid.as_str()))
        .collect();
    // HashMap order is arbitrary; keep reports deterministic per entry.
    checkers.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    Ok(PendingCheckEntry {
        change: ChangeId::new(info.patch_set.change_number),
        patch_set: PatchSetId::new(info.patch_set.patch_set_id),
        repository,
        checkers,
    })
}

#[async_trait]
impl ReviewHost for GerritServer {
    async fn pending_checks(&self, scheme: &str) -> Result<Vec<PendingCheckEntry>, HostError> {
        let infos = self.pending_checks_by_scheme(scheme).await?;
        infos.into_iter().map(to_pending_entry).collect()
    }

    async fn revision_files(
        &self,
        change: ChangeId,
        patch_set: PatchSetId,
    ) -> Result<RevisionFileSet, HostError> {
        let listed = self.list_revision_files(change, patch_set).await?;
        let mut files = RevisionFileSet::new();
        for (name, info) in listed {
            let status = FileStatus::from_code(info.status.as_deref());
            let content = if status == FileStatus::Deleted {
                None
            } else {
                Some(self.file_content(change, patch_set, &name).await?)
            };
            files.insert(name, RevisionFile { status, content });
        }
        Ok(files)
    }

    async fn report_check(
        &self,
        change: ChangeId,
        patch_set: PatchSetId,
        report: &CheckReport,
    ) -> Result<(), HostError> {
        self.post_check(change, patch_set, &CheckInput::from(report))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_xssi_guard() {
        assert_eq!(strip_xssi(b")]}'\n[1,2]"), b"[1,2]");
        assert_eq!(strip_xssi(b")]}'[1,2]"), b"[1,2]");
        assert_eq!(strip_xssi(b"[1,2]"), b"[1,2]");
    }

    #[test]
    fn unmarshal_guarded_body() {
        let parsed: Vec<u64> = unmarshal(b")]}'\n[4, 5]").unwrap();
        assert_eq!(parsed, vec![4, 5]);
    }

    #[test]
    fn url_escapes_file_names_into_one_segment() {
        let server = GerritServer::new(Url::parse("http://localhost:8080/").unwrap());
        let url = server
            .url(&["changes", "7", "revisions", "1", "files", "dir/main.go", "content"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/changes/7/revisions/1/files/dir%2Fmain.go/content"
        );
    }

    #[test]
    fn url_keeps_base_path_and_trailing_slash() {
        let server = GerritServer::new(Url::parse("http://example.com/gerrit").unwrap());
        let url = server
            .url(&["a", "plugins", "checks", "checks.pending", ""])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://example.com/gerrit/a/plugins/checks/checks.pending/"
        );
    }

    #[test]
    fn pending_entry_conversion_sorts_checkers() {
        let body = r#"{
            "patch_set": {
                "repository": "demo",
                "change_number": 12,
                "patch_set_id": 3
            },
            "pending_checks": {
                "fmt:go-bb": {"state": "NOT_STARTED"},
                "fmt:bzl-aa": {"state": "NOT_STARTED"}
            }
        }"#;
        let info: PendingChecksInfo = serde_json::from_str(body).unwrap();
        let entry = to_pending_entry(info).unwrap();
        assert_eq!(entry.change.as_u64(), 12);
        assert_eq!(entry.patch_set.as_u64(), 3);
        assert_eq!(entry.repository.as_str(), "demo");
        let uuids: Vec<&str> = entry.checkers.iter().map(|u| u.as_str()).collect();
        assert_eq!(uuids, vec!["fmt:bzl-aa", "fmt:go-bb"]);
    }
}
