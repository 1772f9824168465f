//! Explicit runtime configuration.
//!
//! Tool binaries are resolved once at startup into a [`ToolLocations`] value
//! that is passed down to the registry probe; nothing in the core reads or
//! mutates ambient process state afterwards.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The registration scheme this bot owns on the review server.
pub const DEFAULT_SCHEME: &str = "fmt";

/// Locations of the external formatting binaries.
///
/// A `None` entry means the tool is unavailable; the corresponding language
/// is skipped at registry probe time (logged, not fatal).
#[derive(Debug, Clone, Default)]
pub struct ToolLocations {
    /// The `gofmt` binary.
    pub gofmt: Option<PathBuf>,
    /// The `buildifier` binary.
    pub buildifier: Option<PathBuf>,
    /// A `java` runtime, required to run the Java formatter jar.
    pub java: Option<PathBuf>,
    /// The `google-java-format.jar` archive.
    pub google_java_format: Option<PathBuf>,
}

impl ToolLocations {
    /// Resolves every tool by searching the `PATH` of the current process.
    ///
    /// Callers with explicit locations (flags, deployment manifests) can
    /// construct the struct directly instead.
    pub fn discover() -> Self {
        Self {
            gofmt: find_in_path("gofmt"),
            buildifier: find_in_path("buildifier"),
            java: find_in_path("java"),
            google_java_format: find_in_path("google-java-format.jar"),
        }
    }
}

/// Looks a file up in the `PATH` directories, including the directory of the
/// running executable so formatters shipped alongside the bot are found
/// without deployment-side `PATH` edits.
fn find_in_path(name: &str) -> Option<PathBuf> {
    let exe_dir = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    let dirs = env::var_os("PATH")
        .map(|path| env::split_paths(&path).collect::<Vec<_>>())
        .unwrap_or_default();
    exe_dir
        .into_iter()
        .chain(dirs)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// Scheduler parameters.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// The registration scheme to poll for.
    pub scheme: String,
    /// Sleep between rounds that made no progress.
    pub delay: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            scheme: DEFAULT_SCHEME.to_string(),
            delay: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_poll_config() {
        let config = PollConfig::default();
        assert_eq!(config.scheme, "fmt");
        assert_eq!(config.delay, Duration::from_secs(10));
    }

    #[test]
    fn find_in_path_misses_unknown_binary() {
        assert_eq!(find_in_path("no-such-binary-for-sure"), None);
    }
}
