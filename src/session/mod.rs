//! Sessions bound to one Junos device.
//!
//! A [`Session`] owns exactly one transport for its lifetime, caches the device
//! identity fetched at open time, and carries the candidate lock state and the
//! staged lines of the transaction in progress. All operations take `&mut self`,
//! so the commands of one session never overlap on its transport.
//!
//! # Example
//!
//! ```rust,ignore
//! use junos_engine::prelude::*;
//!
//! let mut session = Session::open(&params).await?;
//! session.acquire_lock().await?;
//! session.stage("set system host-name R1");
//! let outcome = session.apply_and_commit("set hostname").await;
//! let record = session.release_after(outcome).await?;
//! session.close().await?;
//! ```

mod commit;
mod lock;

pub use commit::{CommitOutcome, CommitRecord};
pub use lock::LockState;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::connection::netconf::{rpc, CommandFormat, RpcReply};
use crate::connection::{ConnectionError, ConnectionParams, Transport};
use crate::error::{Error, Result};
use crate::facts::{Feature, SystemInformation};
use crate::offline::OfflineSink;
use crate::retry::RetryPolicy;
use crate::stage::CommandStager;

/// Where mutations of this session end up
enum Backend {
    Device(Box<dyn Transport>),
    Offline(OfflineSink),
}

/// Failure of a single device round trip
#[derive(Debug)]
pub(crate) enum RpcFailure {
    Transport(ConnectionError),
    Cancelled,
}

impl std::fmt::Display for RpcFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RpcFailure::Transport(e) => write!(f, "{}", e),
            RpcFailure::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// A handle bound to one device connection.
pub struct Session {
    host: String,
    identifier: String,
    backend: Backend,
    info: Option<SystemInformation>,
    stager: CommandStager,
    lock: LockState,
    closed: bool,
    command_timeout: Duration,
    close_delay: Duration,
    lock_policy: Option<RetryPolicy>,
    cancel: Option<CancellationToken>,
    /// An RPC was handed to the transport and its reply never read
    reply_owed: AtomicBool,
}

impl Session {
    /// Open a NETCONF over SSH session and query the device identity.
    #[cfg(feature = "russh")]
    pub async fn open(params: &ConnectionParams) -> Result<Self> {
        let transport = crate::connection::russh::NetconfSshTransport::connect(params)
            .await
            .map_err(|e| Error::connection(&params.host, e.to_string()))?;
        Self::open_with(params, Box::new(transport)).await
    }

    /// Open a session over an already established transport.
    ///
    /// The identity query runs immediately; if it fails the transport is closed
    /// and [`Error::CapabilityQuery`] is returned.
    pub async fn open_with(params: &ConnectionParams, transport: Box<dyn Transport>) -> Result<Self> {
        let mut session = Self::new(params, Backend::Device(transport));

        match session.query_system_information().await {
            Ok(info) => {
                info!(
                    host = %session.host,
                    model = %info.hardware_model,
                    version = %info.os_version,
                    "Session opened"
                );
                session.info = Some(info);
                Ok(session)
            }
            Err(message) => {
                if let Backend::Device(ref transport) = session.backend {
                    let _ = transport.close().await;
                }
                session.closed = true;
                Err(Error::capability_query(&params.host, message))
            }
        }
    }

    /// Open a session that never contacts a device.
    ///
    /// Commits write the staged lines to `sink` instead.
    pub fn open_offline(params: &ConnectionParams, sink: OfflineSink) -> Self {
        debug!(host = %params.host, path = %sink.path().display(), "Offline session opened");
        Self::new(params, Backend::Offline(sink))
    }

    fn new(params: &ConnectionParams, backend: Backend) -> Self {
        Self {
            host: params.host.clone(),
            identifier: params.identifier(),
            backend,
            info: None,
            stager: CommandStager::new(),
            lock: LockState::Unlocked,
            closed: false,
            command_timeout: params.command_timeout,
            close_delay: Duration::ZERO,
            lock_policy: None,
            cancel: None,
            reply_owed: AtomicBool::new(false),
        }
    }

    async fn query_system_information(&self) -> std::result::Result<SystemInformation, String> {
        let reply = self
            .round_trip(&rpc::get_system_information(), true)
            .await
            .map_err(|e| e.to_string())?;
        if reply.has_errors() {
            return Err(reply.error_message());
        }
        SystemInformation::from_reply(&reply.data).map_err(|e| e.to_string())
    }

    /// Observe `token` during device calls.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Wait this long after closing the transport.
    pub fn with_close_delay(mut self, delay: Duration) -> Self {
        self.close_delay = delay;
        self
    }

    /// Retry lock acquisition in [`Session::apply`] with this policy.
    pub fn with_lock_policy(mut self, policy: RetryPolicy) -> Self {
        self.lock_policy = Some(policy);
        self
    }

    /// Device host
    pub fn host(&self) -> &str {
        &self.host
    }

    /// `user@host:port`
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Identity cached at open time; `None` for offline sessions
    pub fn system_information(&self) -> Option<&SystemInformation> {
        self.info.as_ref()
    }

    /// Returns true if this session cannot mutate a live device
    pub fn is_offline(&self) -> bool {
        matches!(self.backend, Backend::Offline(_))
    }

    /// Returns true once [`Session::close`] has run
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Returns true if the device's hardware family has `feature`.
    ///
    /// Always false for offline sessions.
    pub fn check_compatibility(&self, feature: Feature) -> bool {
        self.info
            .as_ref()
            .map(|info| info.supports(feature))
            .unwrap_or(false)
    }

    /// Run a read-only command and return its text output.
    ///
    /// The reply body is returned with XML entities decoded; envelope tags such
    /// as `<output>` are left for the caller (the parser strips them).
    pub async fn command(&mut self, text: &str) -> Result<String> {
        let reply = self.read_only(text, CommandFormat::Text).await?;
        Ok(crate::connection::netconf::unescape_xml(&reply.data))
    }

    /// Run a read-only command and return its XML reply body.
    pub async fn command_xml(&mut self, text: &str) -> Result<String> {
        let reply = self.read_only(text, CommandFormat::Xml).await?;
        Ok(reply.data)
    }

    /// `show configuration <path> | display set relative`
    pub async fn show_config(&mut self, path: &str) -> Result<String> {
        let path = path.trim();
        let command = if path.is_empty() {
            "show configuration | display set relative".to_string()
        } else {
            format!("show configuration {} | display set relative", path)
        };
        self.command(&command).await
    }

    async fn read_only(&mut self, text: &str, format: CommandFormat) -> Result<RpcReply> {
        self.ensure_open()?;
        if self.is_offline() {
            return Err(Error::device_command(text, "offline session has no device"));
        }

        debug!(host = %self.host, command = %text, "Running command");
        let reply = self
            .round_trip(&rpc::command(text, format), true)
            .await
            .map_err(|e| match e {
                RpcFailure::Transport(e) => Error::from_command(text, e),
                RpcFailure::Cancelled => Error::cancelled(text),
            })?;

        if reply.has_errors() {
            return Err(Error::device_command(text, reply.error_message()));
        }
        Ok(reply)
    }

    /// Append lines to the stage buffer. Never contacts the device.
    pub fn stage(&mut self, line: impl Into<String>) {
        self.stager.stage(line);
    }

    /// Append several lines, preserving order.
    pub fn stage_lines<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stager.stage_lines(lines);
    }

    /// Lines staged and not yet committed
    pub fn staged(&self) -> &[String] {
        self.stager.lines()
    }

    /// Append `lines` to a local artifact. Needs no lock and no device.
    ///
    /// Batches are serialised with every other sink writing the same path,
    /// including the engine's offline sink.
    pub fn stage_to_file<S: AsRef<str>>(&self, lines: &[S], path: impl AsRef<Path>) -> Result<()> {
        OfflineSink::new(path.as_ref()).append(lines)
    }

    /// Close the session.
    ///
    /// A held lock is released first; failures on the way out are logged.
    /// Closing twice is a no-op.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        if self.lock.needs_release() {
            if let Err(e) = self.release_lock().await {
                warn!(host = %self.host, error = %e, "Failed to release lock while closing");
            }
        }
        self.stager.clear();

        if let Backend::Device(ref transport) = self.backend {
            if let Err(e) = self.round_trip(&rpc::close_session(), false).await {
                debug!(host = %self.host, error = %e, "close-session failed");
            }
            if let Err(e) = transport.close().await {
                warn!(host = %self.host, error = %e, "Failed to close transport");
            }
        }
        self.closed = true;

        if !self.close_delay.is_zero() {
            tokio::time::sleep(self.close_delay).await;
        }

        info!(host = %self.host, "Session closed");
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(Error::SessionClosed(self.host.clone()))
        } else {
            Ok(())
        }
    }

    /// True while the reply to an abandoned RPC is still owed.
    ///
    /// After a failed [`Session::round_trip`] this means the request may have
    /// reached the device.
    pub(crate) fn request_in_doubt(&self) -> bool {
        self.reply_owed.load(Ordering::SeqCst)
    }

    /// One RPC, bounded by the command timeout and optionally by cancellation.
    ///
    /// A call that is cancelled, times out or is dropped by the caller leaves
    /// its reply owed; the next round trip realigns the transport first.
    pub(crate) async fn round_trip(
        &self,
        body: &str,
        cancellable: bool,
    ) -> std::result::Result<RpcReply, RpcFailure> {
        let transport = match self.backend {
            Backend::Device(ref transport) => transport,
            Backend::Offline(_) => {
                return Err(RpcFailure::Transport(ConnectionError::ConnectionClosed))
            }
        };

        let timeout = self.command_timeout;
        let token = self.cancel.as_ref().filter(|_| cancellable);
        if token.map(|t| t.is_cancelled()).unwrap_or(false) {
            return Err(RpcFailure::Cancelled);
        }

        if self.request_in_doubt() {
            match tokio::time::timeout(timeout, transport.realign()).await {
                Ok(Ok(())) => {
                    debug!(host = %self.host, "Transport realigned after abandoned request");
                    self.reply_owed.store(false, Ordering::SeqCst);
                }
                Ok(Err(e)) => return Err(RpcFailure::Transport(e)),
                Err(_) => {
                    return Err(RpcFailure::Transport(ConnectionError::Timeout(
                        timeout.as_secs(),
                    )))
                }
            }
        }

        self.reply_owed.store(true, Ordering::SeqCst);
        let call = tokio::time::timeout(timeout, transport.send_rpc(body));
        let outcome = match token {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => None,
                    result = call => Some(result),
                }
            }
            None => Some(call.await),
        };

        match outcome {
            Some(Ok(result)) => {
                self.reply_owed.store(false, Ordering::SeqCst);
                result
                    .map(|raw| RpcReply::parse(&raw))
                    .map_err(RpcFailure::Transport)
            }
            Some(Err(_)) => {
                warn!(host = %self.host, "RPC timed out, reply is owed");
                Err(RpcFailure::Transport(ConnectionError::Timeout(
                    timeout.as_secs(),
                )))
            }
            None => {
                debug!(host = %self.host, "RPC cancelled, reply is owed");
                Err(RpcFailure::Cancelled)
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.closed && self.lock.needs_release() {
            warn!(host = %self.host, lock = ?self.lock, "Session dropped while holding the candidate lock");
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("identifier", &self.identifier)
            .field("offline", &self.is_offline())
            .field("lock", &self.lock)
            .field("staged", &self.stager.len())
            .field("closed", &self.closed)
            .finish()
    }
}
