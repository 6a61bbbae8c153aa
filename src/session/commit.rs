//! Stage-send, commit and rollback.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::{Backend, RpcFailure, Session};
use crate::connection::netconf::{rpc, RpcReply};
use crate::error::{Error, Result};

/// Terminal outcome of a commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitOutcome {
    /// The device activated the candidate
    Committed,
    /// Nothing was staged, nothing was sent
    Skipped,
    /// Lines went to the offline artifact
    WrittenOffline,
}

/// Result of a successful commit
#[derive(Debug, Clone, Serialize)]
pub struct CommitRecord {
    /// Audit message given by the caller
    pub message: String,
    /// Non-fatal diagnostics returned by the device
    pub warnings: Vec<String>,
    /// What happened
    pub outcome: CommitOutcome,
    /// Lines that were applied, in order
    pub lines: Vec<String>,
    /// Completion time
    pub committed_at: DateTime<Utc>,
}

impl CommitRecord {
    fn new(message: &str, outcome: CommitOutcome, lines: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            message: message.to_string(),
            warnings,
            outcome,
            lines,
            committed_at: Utc::now(),
        }
    }
}

/// Returns true if a commit reply confirms the candidate was activated.
fn commit_confirmed(reply: &RpcReply) -> bool {
    reply.ok || reply.data.contains("<commit-success/>") || reply.data.contains("<commit-success />")
}

impl Session {
    /// Send the staged lines as one batch and commit them with `message`.
    ///
    /// An empty stage returns [`CommitOutcome::Skipped`] without contacting the
    /// device. Otherwise the lock must be held. On any failure after the first
    /// line was sent the candidate is discarded before the error is returned;
    /// a failed discard is attached to the error, never replacing it. The lock
    /// stays held either way.
    #[instrument(skip(self), fields(host = %self.host, lines = self.stager.len()))]
    pub async fn apply_and_commit(&mut self, message: &str) -> Result<CommitRecord> {
        self.ensure_open()?;
        if self.stager.is_empty() {
            debug!("Nothing staged, skipping commit");
            return Ok(CommitRecord::new(message, CommitOutcome::Skipped, Vec::new(), Vec::new()));
        }

        if let Backend::Offline(ref sink) = self.backend {
            let lines = self.stager.take();
            sink.append(&lines)?;
            info!(path = %sink.path().display(), "Staged lines written offline");
            return Ok(CommitRecord::new(message, CommitOutcome::WrittenOffline, lines, Vec::new()));
        }

        if !self.lock.is_locked() {
            return Err(Error::NotLocked);
        }

        let lines = self.stager.take();
        match self.send_and_commit(&lines, message).await {
            Ok(warnings) => {
                for warning in &warnings {
                    warn!(warning = %warning, "Device warning");
                }
                info!(message = %message, "Configuration committed");
                Ok(CommitRecord::new(message, CommitOutcome::Committed, lines, warnings))
            }
            Err(primary) => {
                warn!(error = %primary, "Commit transaction failed, discarding candidate");
                match self.discard_candidate().await {
                    Ok(()) => Err(primary),
                    Err(rollback) => {
                        warn!(error = %rollback, "Rollback failed");
                        Err(primary.with_rollback_error(rollback))
                    }
                }
            }
        }
    }

    async fn send_and_commit(&self, lines: &[String], message: &str) -> Result<Vec<String>> {
        let mut warnings = Vec::new();

        let loaded = self
            .round_trip(&rpc::load_set(&lines.join("\n")), true)
            .await
            .map_err(|e| match e {
                RpcFailure::Transport(e) => Error::stage_send(e.to_string()),
                RpcFailure::Cancelled => Error::cancelled("stage-send"),
            })?;
        if loaded.has_errors() {
            return Err(Error::stage_send(loaded.error_message()));
        }
        warnings.extend(loaded.warnings());
        debug!(lines = lines.len(), "Staged lines loaded into candidate");

        let committed = self
            .round_trip(&rpc::commit(message), true)
            .await
            .map_err(|e| match e {
                RpcFailure::Transport(e) => Error::commit(e.to_string()),
                RpcFailure::Cancelled => Error::cancelled("commit"),
            })?;
        if committed.has_errors() {
            return Err(Error::commit(committed.error_message()));
        }
        if !commit_confirmed(&committed) {
            return Err(Error::commit("device did not confirm the commit"));
        }
        warnings.extend(committed.warnings());

        Ok(warnings)
    }

    /// Drop staged lines and discard the device candidate.
    #[instrument(skip(self), fields(host = %self.host))]
    pub async fn clear(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.stager.clear();
        if self.is_offline() {
            return Ok(());
        }
        self.discard_candidate().await
    }

    /// `<discard-changes/>`; not cancellable.
    async fn discard_candidate(&self) -> Result<()> {
        let reply = self
            .round_trip(&rpc::discard_changes(), false)
            .await
            .map_err(|e| Error::device_command("discard-changes", e.to_string()))?;
        if reply.has_errors() {
            return Err(Error::device_command("discard-changes", reply.error_message()));
        }
        debug!("Candidate configuration discarded");
        Ok(())
    }

    /// Lock, stage `lines`, commit and release in one call.
    ///
    /// Uses the session's lock retry policy when one is set. With nothing to
    /// apply no lock is taken.
    #[instrument(skip(self, lines), fields(host = %self.host))]
    pub async fn apply<I, S>(&mut self, lines: I, message: &str) -> Result<CommitRecord>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stage_lines(lines);
        if self.stager.is_empty() {
            return self.apply_and_commit(message).await;
        }

        let locked = match self.lock_policy.clone() {
            Some(policy) => self.acquire_lock_with_retry(&policy).await,
            None => self.acquire_lock().await,
        };
        if let Err(e) = locked {
            self.stager.clear();
            return Err(e);
        }

        let outcome = self.apply_and_commit(message).await;
        self.release_after(outcome).await
    }
}
