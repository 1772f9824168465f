//! The polling loop: list pending checks, shuffle, execute, back off.
//!
//! Runs until the host process terminates. A round that made progress
//! repeats immediately — the server may have more pending checks than one
//! listing returns under rate limits; a round with nothing to do or nothing
//! but failures sleeps before polling again.

use std::sync::Arc;

use rand::seq::SliceRandom;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::PollConfig;
use crate::errors::CheckError;
use crate::executor::CheckExecutor;
use crate::formatter::FormatterRegistry;
use crate::host::ReviewHost;

/// What one polling round did.
#[derive(Debug)]
pub struct RoundOutcome {
    /// `true` iff at least one entry completed without error.
    pub progress: bool,
    /// The first error of the round; later errors are logged only.
    pub error: Option<CheckError>,
}

/// Polls the review server for pending checks and drives the executor.
pub struct PollingScheduler {
    host: Arc<dyn ReviewHost>,
    executor: CheckExecutor,
    config: PollConfig,
}

impl PollingScheduler {
    pub fn new(
        host: Arc<dyn ReviewHost>,
        registry: FormatterRegistry,
        config: PollConfig,
    ) -> Self {
        let executor = CheckExecutor::new(host.clone(), registry, config.scheme.clone());
        Self {
            host,
            executor,
            config,
        }
    }

    /// Polls forever.
    pub async fn run(&self) {
        loop {
            let outcome = self.process_round().await;
            if let Some(error) = outcome.error {
                warn!(%error, "polling round failed");
            }
            if !outcome.progress {
                sleep(self.config.delay).await;
            }
        }
    }

    /// Runs one polling round over every pending check.
    ///
    /// Entries are shuffled before processing so a persistently failing
    /// check cannot starve the ones listed after it across repeated rounds.
    pub async fn process_round(&self) -> RoundOutcome {
        let mut pending = match self.host.pending_checks(&self.config.scheme).await {
            Ok(pending) => pending,
            Err(error) => {
                return RoundOutcome {
                    progress: false,
                    error: Some(error.into()),
                }
            }
        };

        if pending.is_empty() {
            debug!("no pending checks");
            return RoundOutcome {
                progress: false,
                error: None,
            };
        }

        pending.shuffle(&mut rand::thread_rng());

        let mut progress = false;
        let mut first_error = None;
        for entry in &pending {
            match self.executor.execute(entry).await {
                Ok(()) => progress = true,
                Err(error) => {
                    if first_error.is_some() {
                        warn!(
                            change = %entry.change,
                            patch_set = %entry.patch_set,
                            %error,
                            "additional check failure in round"
                        );
                    }
                    first_error.get_or_insert(error);
                }
            }
        }
        RoundOutcome {
            progress,
            error: first_error,
        }
    }
}
