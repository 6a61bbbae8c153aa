//! Subcommands for the junos-engine CLI

pub mod apply;
pub mod facts;
pub mod parse;
pub mod show;

use crate::cli::output::OutputFormatter;
use junos_engine::config::EngineConfig;
use junos_engine::engine::Engine;
use junos_engine::error::Error;
use junos_engine::session::Session;
use tokio_util::sync::CancellationToken;

/// Common context shared between commands
pub struct CommandContext {
    /// Engine built from the effective configuration
    pub engine: Engine,
    /// Output formatter
    pub output: OutputFormatter,
    /// Verbosity level
    pub verbosity: u8,
    /// Cancelled on Ctrl-C
    pub cancel: CancellationToken,
}

impl CommandContext {
    /// Create a new command context from CLI arguments
    pub fn new(cli: &crate::cli::Cli, mut config: EngineConfig) -> Self {
        let output = OutputFormatter::new(!cli.no_color, cli.is_json(), cli.verbosity());

        if let Some(host) = &cli.host {
            config.connection.host = host.clone();
        }
        if let Some(user) = &cli.user {
            config.connection.username = user.clone();
        }

        Self {
            engine: Engine::new(config),
            output,
            verbosity: cli.verbosity(),
            cancel: CancellationToken::new(),
        }
    }

    /// Open a session, reporting a missing host as a configuration error
    pub async fn open_session(&self) -> Result<Session, Error> {
        let config = self.engine.config();
        if !config.offline.enabled && config.connection.host.is_empty() {
            return Err(Error::Config(
                "no device given; use --host, JUNOS_HOST or the config file".to_string(),
            ));
        }
        self.output
            .info(&format!("Opening session to {}", self.engine.connection().identifier()));
        let session = self.engine.open_session().await?;
        Ok(session.with_cancellation(self.cancel.clone()))
    }

    /// Report an engine error and return its exit code
    pub fn fail(&self, err: &Error) -> i32 {
        self.output.error(&err.to_string());
        if let Some(rollback) = err.rollback_error() {
            self.output.warning(&format!("rollback also failed: {}", rollback));
        }
        err.exit_code()
    }
}
