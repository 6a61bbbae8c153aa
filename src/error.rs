//! Error types for the Junos configuration engine.
//!
//! Every device-facing failure is returned to the caller as an [`Error`] with
//! enough context (the offending command or line) to log or retry. Errors
//! raised while rolling back from an earlier failure are attached to the
//! primary error as a secondary diagnostic and never replace it.

use std::path::PathBuf;
use thiserror::Error;

use crate::connection::ConnectionError;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the engine.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Session Errors
    // ========================================================================
    /// The transport could not be established.
    #[error("Failed to connect to '{host}': {message}")]
    Connection {
        /// Target device
        host: String,
        /// Error message
        message: String,
    },

    /// The identity/capability probe failed after connecting.
    #[error("Failed to query system information from '{host}': {message}")]
    CapabilityQuery {
        /// Target device
        host: String,
        /// Error message
        message: String,
    },

    /// A read-only command failed.
    #[error("Command '{command}' failed: {message}")]
    DeviceCommand {
        /// Command text as sent to the device
        command: String,
        /// Device-reported reason
        message: String,
    },

    /// The session was already closed.
    #[error("Session to '{0}' is closed")]
    SessionClosed(String),

    // ========================================================================
    // Lock Errors
    // ========================================================================
    /// Another party holds the candidate configuration lock.
    #[error("Candidate configuration lock unavailable: {0}")]
    LockUnavailable(String),

    /// The device refused the lock for permission or policy reasons.
    #[error("Candidate configuration lock denied: {0}")]
    LockDenied(String),

    /// The session already holds the lock.
    #[error("Candidate configuration lock already held by this session")]
    AlreadyLocked,

    /// A mutating operation was attempted without holding the lock.
    #[error("Candidate configuration lock is not held by this session")]
    NotLocked,

    /// Releasing the lock failed.
    #[error("Failed to release candidate configuration lock: {0}")]
    LockRelease(String),

    // ========================================================================
    // Commit Errors
    // ========================================================================
    /// The device rejected one or more staged lines.
    #[error("Device rejected staged configuration: {message}")]
    StageSend {
        /// Device-reported reason
        message: String,
        /// Failure of the rollback that followed, if any
        rollback_error: Option<Box<Error>>,
    },

    /// The commit step failed after a successful stage-send.
    #[error("Commit failed: {message}")]
    Commit {
        /// Device-reported reason
        message: String,
        /// Failure of the rollback that followed, if any
        rollback_error: Option<Box<Error>>,
    },

    /// The caller cancelled the operation.
    #[error("Operation '{operation}' cancelled")]
    Cancelled {
        /// Operation that observed the cancellation
        operation: String,
        /// Failure of the rollback that followed, if any
        rollback_error: Option<Box<Error>>,
    },

    /// Writing the offline artifact failed.
    #[error("Failed to write offline artifact '{path}': {source}")]
    OfflineWrite {
        /// Artifact path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    // ========================================================================
    // Parser Errors
    // ========================================================================
    /// A recognized field carried a value that does not convert to its type.
    #[error("Malformed value for '{field}' in line '{line}': {message}")]
    MalformedValue {
        /// Raw configuration line
        line: String,
        /// Field being assigned
        field: String,
        /// Conversion failure
        message: String,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // IO / Serialization Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Generic error with source.
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
        /// Source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Creates a connection error.
    pub fn connection(host: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            host: host.into(),
            message: message.into(),
        }
    }

    /// Creates a capability query error.
    pub fn capability_query(host: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CapabilityQuery {
            host: host.into(),
            message: message.into(),
        }
    }

    /// Creates a device command error.
    pub fn device_command(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DeviceCommand {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Creates a stage-send error with no rollback diagnostic yet.
    pub fn stage_send(message: impl Into<String>) -> Self {
        Self::StageSend {
            message: message.into(),
            rollback_error: None,
        }
    }

    /// Creates a commit error with no rollback diagnostic yet.
    pub fn commit(message: impl Into<String>) -> Self {
        Self::Commit {
            message: message.into(),
            rollback_error: None,
        }
    }

    /// Creates a cancellation error with no rollback diagnostic yet.
    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
            rollback_error: None,
        }
    }

    /// Creates a malformed value error.
    pub fn malformed_value(
        line: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::MalformedValue {
            line: line.into(),
            field: field.into(),
            message: message.into(),
        }
    }

    /// Attaches a rollback failure to this error.
    ///
    /// Only the transaction errors carry a rollback slot; any other primary
    /// error is returned unchanged.
    pub fn with_rollback_error(mut self, secondary: Error) -> Self {
        match &mut self {
            Error::StageSend { rollback_error, .. }
            | Error::Commit { rollback_error, .. }
            | Error::Cancelled { rollback_error, .. } => {
                *rollback_error = Some(Box::new(secondary));
            }
            _ => {}
        }
        self
    }

    /// Returns the rollback failure attached to this error, if any.
    pub fn rollback_error(&self) -> Option<&Error> {
        match self {
            Error::StageSend { rollback_error, .. }
            | Error::Commit { rollback_error, .. }
            | Error::Cancelled { rollback_error, .. } => rollback_error.as_deref(),
            _ => None,
        }
    }

    /// Returns true if the caller may retry the same operation unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::LockUnavailable(_))
    }

    /// Returns true for errors that indicate misuse of the lock contract.
    pub fn is_programming_error(&self) -> bool {
        matches!(self, Error::AlreadyLocked | Error::NotLocked)
    }

    /// Returns the error code for CLI exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Connection { .. } | Error::CapabilityQuery { .. } => 3,
            Error::LockUnavailable(_) | Error::LockDenied(_) => 4,
            Error::StageSend { .. } | Error::Commit { .. } => 5,
            Error::MalformedValue { .. } => 6,
            Error::Config(_) => 7,
            _ => 1,
        }
    }

    /// Maps a transport failure during a read-only command.
    pub(crate) fn from_command(command: &str, err: ConnectionError) -> Self {
        Self::device_command(command, err.to_string())
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Adds context with a closure that is only evaluated on error.
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Other {
            message: message.into(),
            source: Some(Box::new(e)),
        })
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| Error::Other {
            message: f().into(),
            source: Some(Box::new(e)),
        })
    }
}
