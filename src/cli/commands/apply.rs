//! `apply` - lock, stage, commit and release

use super::CommandContext;
use crate::cli::output::outcome_label;
use anyhow::{Context, Result};
use clap::Parser;
use junos_engine::offline::OfflineSink;
use junos_engine::session::Session;
use junos_engine::stage::ConfigLine;
use std::io::Read;
use std::path::PathBuf;

/// Arguments for the apply command
#[derive(Parser, Debug, Clone)]
pub struct ApplyArgs {
    /// File of set/delete lines (`-` for stdin)
    #[arg(short, long)]
    pub file: PathBuf,

    /// Commit log message
    #[arg(short, long)]
    pub message: String,

    /// Write the lines to this artifact instead of a device
    #[arg(long)]
    pub offline: Option<PathBuf>,
}

impl ApplyArgs {
    fn read_lines(&self) -> Result<Vec<String>> {
        let mut content = String::new();
        if self.file.as_os_str() == "-" {
            std::io::stdin().read_to_string(&mut content)?;
        } else {
            content = std::fs::read_to_string(&self.file)
                .with_context(|| format!("Failed to read {}", self.file.display()))?;
        }

        let mut lines = Vec::new();
        for (index, raw) in content.lines().enumerate() {
            let raw = raw.trim();
            if raw.is_empty() || raw.starts_with('#') {
                continue;
            }
            let line: ConfigLine = raw
                .parse()
                .with_context(|| format!("{}:{}", self.file.display(), index + 1))?;
            lines.push(line.into());
        }
        Ok(lines)
    }

    /// Execute the apply command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let lines = self.read_lines()?;
        ctx.output
            .info(&format!("{} line(s) read from {}", lines.len(), self.file.display()));

        let opened = match &self.offline {
            Some(path) => Ok(Session::open_offline(
                ctx.engine.connection(),
                OfflineSink::new(path),
            )
            .with_cancellation(ctx.cancel.clone())),
            None => ctx.open_session().await,
        };
        let mut session = match opened {
            Ok(session) => session.with_lock_policy(ctx.engine.config().lock.clone()),
            Err(e) => return Ok(ctx.fail(&e)),
        };

        let result = session.apply(lines, &self.message).await;
        let code = match result {
            Ok(record) => {
                for warning in &record.warnings {
                    ctx.output.warning(warning);
                }
                if ctx.output.is_json() {
                    ctx.output.json(&record)?;
                } else {
                    println!(
                        "{} {} line(s) on {}: {}",
                        outcome_label(record.outcome, ctx.output.use_color()),
                        record.lines.len(),
                        session.host(),
                        record.message
                    );
                }
                0
            }
            Err(e) => ctx.fail(&e),
        };

        if let Err(e) = session.close().await {
            ctx.output.warning(&format!("close failed: {}", e));
        }
        Ok(code)
    }
}
