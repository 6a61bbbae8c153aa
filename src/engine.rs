//! Composition root.
//!
//! An [`Engine`] is built once from an [`EngineConfig`] and hands out sessions
//! configured from it. It owns the process's [`ConfigMutex`]; nothing else
//! creates one behind the caller's back.

use tracing::debug;

use crate::config::EngineConfig;
use crate::connection::{ConnectionParams, Transport};
use crate::error::Result;
use crate::mutex::ConfigMutex;
use crate::offline::OfflineSink;
use crate::session::Session;

/// Shared state for every session this process opens.
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    mutex: ConfigMutex,
    sink: OfflineSink,
}

impl Engine {
    /// Build an engine from configuration
    pub fn new(config: EngineConfig) -> Self {
        let sink = OfflineSink::new(config.offline_artifact());
        Self {
            config,
            mutex: ConfigMutex::new(),
            sink,
        }
    }

    /// Effective configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Default connection parameters
    pub fn connection(&self) -> &ConnectionParams {
        &self.config.connection
    }

    /// The process-wide read/transform mutex
    pub fn config_mutex(&self) -> &ConfigMutex {
        &self.mutex
    }

    /// Open a session to the configured device.
    ///
    /// Returns an offline session instead when offline mode is enabled.
    pub async fn open_session(&self) -> Result<Session> {
        if self.config.offline.enabled {
            return Ok(self.open_offline_session());
        }

        #[cfg(feature = "russh")]
        {
            let session = Session::open(&self.config.connection).await?;
            return Ok(self.configure(session));
        }

        #[cfg(not(feature = "russh"))]
        {
            return Err(crate::error::Error::Config(
                "built without an SSH transport; enable the `russh` feature".to_string(),
            ));
        }
    }

    /// Open a session over a caller-supplied transport
    pub async fn open_session_with(&self, transport: Box<dyn Transport>) -> Result<Session> {
        let session = Session::open_with(&self.config.connection, transport).await?;
        Ok(self.configure(session))
    }

    /// Open a session that writes to the offline artifact
    pub fn open_offline_session(&self) -> Session {
        self.configure(Session::open_offline(
            &self.config.connection,
            self.sink.clone(),
        ))
    }

    fn configure(&self, session: Session) -> Session {
        session
            .with_lock_policy(self.config.lock.clone())
            .with_close_delay(self.config.session.close_delay)
    }

    /// Run `command` and transform its output while holding the mutex.
    ///
    /// The mutex covers exactly the read and the transform.
    pub async fn read_transform<T, F>(
        &self,
        session: &mut Session,
        command: &str,
        transform: F,
    ) -> Result<T>
    where
        F: FnOnce(&str) -> Result<T>,
    {
        let _guard = self.mutex.lock().await;
        debug!(host = %session.host(), command = %command, "Read/transform section");
        let output = session.command(command).await?;
        transform(&output)
    }
}
