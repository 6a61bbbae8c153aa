//! # junos-engine - configuration transactions for Junos devices
//!
//! A small engine that every Junos configuration consumer builds on: open a
//! session, take the candidate lock, stage `set`/`delete` lines, commit them
//! atomically (discarding the candidate on any failure), and read the result
//! back through a parser for `display set relative` output.
//!
//! ## Core Concepts
//!
//! - **Session**: one device connection with its cached identity, lock state
//!   and staged lines
//! - **Lock**: the device's exclusive candidate configuration lock
//! - **Stager**: ordered buffer of lines awaiting commit
//! - **Commit**: load + commit as one transaction, rolled back on failure
//! - **Offline mode**: staged lines go to a local file instead of a device
//! - **Parser**: flat `set` output back into nested records
//! - **Config mutex**: serialises read-then-transform sections in-process
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                            Engine                            │
//! │             (config, ConfigMutex, offline sink)              │
//! └──────────────────────────────────────────────────────────────┘
//!                                │
//!                                ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                           Session                            │
//! │        lock ─► stage ─► apply_and_commit ─► release          │
//! └──────────────────────────────────────────────────────────────┘
//!           │                                      │
//!           ▼                                      ▼
//! ┌─────────────────────┐               ┌─────────────────────┐
//! │  Transport (NETCONF │               │   OfflineSink       │
//! │  over SSH / russh)  │               │   (artifact file)   │
//! └─────────────────────┘               └─────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use junos_engine::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let params = ConnectionParams::new("192.0.2.1").username("netops").password("secret");
//!     let mut session = Session::open(&params).await?;
//!
//!     session.acquire_lock().await?;
//!     session.stage("set system host-name R1");
//!     let outcome = session.apply_and_commit("set hostname").await;
//!     let record = session.release_after(outcome).await?;
//!     println!("warnings: {:?}", record.warnings);
//!
//!     let text = session.command("show configuration system host-name").await?;
//!     let tree = parse_config_at(&text, &builtin::system_schema(), "system")?;
//!     session.close().await?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

// Re-export commonly used items in prelude
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::config::EngineConfig;
    #[cfg(feature = "russh")]
    pub use crate::connection::russh::NetconfSshTransport;
    pub use crate::connection::{ConnectionError, ConnectionParams, Transport};
    pub use crate::engine::Engine;
    pub use crate::error::{Error, Result};
    pub use crate::facts::{Feature, SystemInformation};
    pub use crate::mutex::{ConfigGuard, ConfigMutex};
    pub use crate::offline::OfflineSink;
    pub use crate::parser::{builtin, parse_config, parse_config_at, render, Record, Schema};
    pub use crate::retry::RetryPolicy;
    pub use crate::session::{CommitOutcome, CommitRecord, LockState, Session};
    pub use crate::stage::{CommandStager, ConfigLine};
}

// ============================================================================
// Core Modules
// ============================================================================

/// Error types and result aliases.
pub mod error;

/// Engine configuration loading.
pub mod config;

/// Backoff policy for lock acquisition.
pub mod retry;

/// Transport trait, NETCONF messages and the SSH transport.
pub mod connection;

// ============================================================================
// Transaction Engine
// ============================================================================

/// Device identity and feature checks.
pub mod facts;

/// Set/delete lines and the stage buffer.
pub mod stage;

/// Offline artifact writer.
pub mod offline;

/// Sessions: lifecycle, lock and commit.
///
/// The [`Session`](session::Session) is the handle callers drive; see its
/// module docs for the full lock → stage → commit → release sequence.
pub mod session;

/// Process-wide read/transform mutex.
pub mod mutex;

/// Composition root.
pub mod engine;

// ============================================================================
// Read-back
// ============================================================================

/// `display set relative` parser.
pub mod parser;

// ============================================================================
// Version Information
// ============================================================================

/// Returns the current version of the crate.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
