//! Candidate configuration lock.
//!
//! `Unlocked -> Locked` on a successful acquire, back to `Unlocked` on release
//! or close. A release attempt always leaves the session `Unlocked`, even when
//! the device reports a failure.
//!
//! A `<lock>` whose reply never arrived (cancelled or timed out) may still
//! have been granted, so the session moves to `Unknown`. The next acquire,
//! release or close sends a best-effort `<unlock>` to clear it.

use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::{Backend, RpcFailure, Session};
use crate::connection::netconf::{rpc, RpcReply};
use crate::connection::ConnectionError;
use crate::error::{Error, Result};
use crate::retry::RetryPolicy;

/// Lock state of one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LockState {
    /// No lock held
    Unlocked,
    /// This session holds the candidate lock
    Locked,
    /// A lock request was abandoned; the device may have granted it
    Unknown,
}

impl LockState {
    /// Returns true when locked
    pub fn is_locked(self) -> bool {
        self == LockState::Locked
    }

    /// Returns true if closing the session has to send `<unlock>`
    pub fn needs_release(self) -> bool {
        self != LockState::Unlocked
    }
}

/// Map a rejected `<lock>` reply to the retryable or permanent error.
fn classify_lock_failure(reply: &RpcReply) -> Error {
    let message = reply.error_message();
    let busy = reply.fatal_errors().any(|e| {
        let text = e.message.as_deref().unwrap_or_default().to_ascii_lowercase();
        e.tag == "lock-denied"
            || e.tag == "in-use"
            || text.contains("locked")
            || text.contains("being edited")
    });
    if busy {
        return Error::LockUnavailable(message);
    }
    Error::LockDenied(message)
}

impl Session {
    /// Current lock state
    pub fn lock_state(&self) -> LockState {
        self.lock
    }

    /// Take the exclusive candidate lock.
    ///
    /// Fails with [`Error::LockUnavailable`] while another party holds it and
    /// with [`Error::LockDenied`] on permission failures.
    #[instrument(skip(self), fields(host = %self.host))]
    pub async fn acquire_lock(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.lock.is_locked() {
            return Err(Error::AlreadyLocked);
        }

        if let Backend::Offline(_) = self.backend {
            self.lock = LockState::Locked;
            debug!("Offline lock taken");
            return Ok(());
        }

        if self.lock == LockState::Unknown {
            if let Err(e) = self.release_lock().await {
                debug!(error = %e, "Clearing abandoned lock request failed");
            }
        }

        let reply = match self.round_trip(&rpc::lock_candidate(), true).await {
            Ok(reply) => reply,
            Err(failure) => {
                if self.request_in_doubt() {
                    warn!("Lock request abandoned before its reply, lock state unknown");
                    self.lock = LockState::Unknown;
                }
                return Err(match failure {
                    RpcFailure::Cancelled => Error::cancelled("lock"),
                    RpcFailure::Transport(ConnectionError::Timeout(secs)) => {
                        Error::LockUnavailable(format!("no reply to <lock> after {} seconds", secs))
                    }
                    RpcFailure::Transport(e) => Error::connection(&self.host, e.to_string()),
                });
            }
        };

        if reply.has_errors() {
            let err = classify_lock_failure(&reply);
            debug!(error = %err, "Lock refused");
            return Err(err);
        }

        self.lock = LockState::Locked;
        info!("Candidate configuration locked");
        Ok(())
    }

    /// Release the candidate lock.
    #[instrument(skip(self), fields(host = %self.host))]
    pub async fn release_lock(&mut self) -> Result<()> {
        let previous = self.lock;
        if previous == LockState::Unlocked {
            return Err(Error::NotLocked);
        }
        self.lock = LockState::Unlocked;

        if let Backend::Offline(_) = self.backend {
            debug!("Offline lock released");
            return Ok(());
        }

        let reply = self
            .round_trip(&rpc::unlock_candidate(), false)
            .await
            .map_err(|e| Error::LockRelease(e.to_string()))?;
        if reply.has_errors() {
            if previous == LockState::Unknown {
                debug!(error = %reply.error_message(), "Abandoned lock request was never granted");
                return Ok(());
            }
            return Err(Error::LockRelease(reply.error_message()));
        }

        info!("Candidate configuration unlocked");
        Ok(())
    }

    /// Acquire the lock, retrying `LockUnavailable` with backoff.
    ///
    /// Any other error, cancellation, an exhausted retry budget or an expired
    /// total timeout ends the loop with the last error.
    pub async fn acquire_lock_with_retry(&mut self, policy: &RetryPolicy) -> Result<()> {
        let start = Instant::now();
        let mut attempt = 0;

        loop {
            let err = match self.acquire_lock().await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() => e,
                Err(e) => return Err(e),
            };

            let expired = policy
                .total_timeout
                .map(|total| start.elapsed() >= total)
                .unwrap_or(false);
            if attempt >= policy.max_retries || expired {
                warn!(host = %self.host, attempts = attempt + 1, "Giving up on candidate lock");
                return Err(err);
            }

            let delay = policy.delay_for_attempt(attempt);
            debug!(host = %self.host, attempt, delay = ?delay, error = %err, "Lock busy, retrying");
            match self.cancel {
                Some(ref token) => {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => return Err(Error::cancelled("lock")),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                None => tokio::time::sleep(delay).await,
            }
            attempt += 1;
        }
    }

    /// Release the lock after `outcome` and return `outcome`.
    ///
    /// When both the work and the release failed, the work's error is
    /// returned and the release failure is logged.
    pub async fn release_after<T>(&mut self, outcome: Result<T>) -> Result<T> {
        let released = self.release_lock().await;
        match (outcome, released) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(release)) => Err(release),
            (Err(primary), Ok(())) => Err(primary),
            (Err(primary), Err(release)) => {
                warn!(host = %self.host, error = %release, "Lock release failed after earlier error");
                Err(primary)
            }
        }
    }
}
