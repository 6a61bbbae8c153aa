//! Transport layer for device communication.
//!
//! The engine treats the transport as an opaque RPC channel: it hands over a
//! NETCONF RPC body and receives the raw `<rpc-reply>` document. Framing,
//! authentication and encryption live behind the [`Transport`] trait.
//!
//! # Supported Transports
//!
//! - **NETCONF over SSH** (via `russh`, default feature): see
//!   [`russh::NetconfSshTransport`]
//!
//! Tests and embedders may provide their own [`Transport`] and hand it to
//! [`Session::open_with`](crate::session::Session::open_with).
//!
//! # Example
//!
//! ```rust,ignore
//! use junos_engine::connection::{ConnectionParams, Transport};
//! use junos_engine::connection::russh::NetconfSshTransport;
//!
//! let params = ConnectionParams::new("192.0.2.1").username("netops").password("secret");
//! let transport = NetconfSshTransport::connect(&params).await?;
//! let reply = transport.send_rpc("<get-system-information/>").await?;
//! ```

/// Connection parameters.
pub mod config;

/// NETCONF framing, RPC bodies and reply parsing.
pub mod netconf;

/// NETCONF over SSH using russh.
#[cfg(feature = "russh")]
pub mod russh;

use async_trait::async_trait;
use thiserror::Error;

pub use config::ConnectionParams;
pub use netconf::{RpcError, RpcReply, Severity};

/// Russh-related error wrapper, required by the russh `Handler` trait.
#[cfg(feature = "russh")]
#[derive(Debug)]
pub struct RusshError(pub ::russh::Error);

#[cfg(feature = "russh")]
impl From<::russh::Error> for RusshError {
    fn from(err: ::russh::Error) -> Self {
        RusshError(err)
    }
}

#[cfg(feature = "russh")]
impl std::fmt::Display for RusshError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Russh error: {}", self.0)
    }
}

#[cfg(feature = "russh")]
impl std::error::Error for RusshError {}

#[cfg(feature = "russh")]
impl From<::russh::Error> for ConnectionError {
    fn from(err: ::russh::Error) -> Self {
        ConnectionError::Protocol(format!("Russh error: {}", err))
    }
}

/// Errors that can occur on the transport.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// Failed to establish the connection to the device.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication was rejected by the device.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Operation timed out.
    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    /// The transport was closed, locally or by the device.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Malformed framing or unexpected protocol data.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// I/O error on the underlying stream.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for transport operations.
pub type ConnectionResult<T> = Result<T, ConnectionError>;

/// An opaque command/response channel to one device.
///
/// Implementations serialise their own RPCs; the engine never issues two
/// RPCs concurrently on one transport because a
/// [`Session`](crate::session::Session) is driven through `&mut self`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connection identifier (`user@host:port`).
    fn identifier(&self) -> &str;

    /// Check if the transport is still usable.
    async fn is_alive(&self) -> bool;

    /// Send one RPC body and return the raw reply document.
    ///
    /// The returned future may be dropped before it completes (cancellation,
    /// timeout). The reply owed to such a request must never be returned to
    /// a later call; see [`Transport::realign`].
    async fn send_rpc(&self, rpc: &str) -> ConnectionResult<String>;

    /// Drop replies owed to requests whose `send_rpc` future was dropped.
    ///
    /// The session calls this before its next RPC whenever an earlier one was
    /// abandoned. Transports that match replies to requests have nothing to
    /// do here. The default cannot recover, so later RPCs fail instead of
    /// reading a reply meant for someone else.
    async fn realign(&self) -> ConnectionResult<()> {
        Err(ConnectionError::Protocol(
            "reply stream out of sync after an abandoned request".to_string(),
        ))
    }

    /// Close the transport. Closing twice is not an error.
    async fn close(&self) -> ConnectionResult<()>;
}
