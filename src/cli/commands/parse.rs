//! `parse` - display-set output to JSON

use super::CommandContext;
use anyhow::{Context, Result};
use clap::Parser;
use junos_engine::parser::{builtin, parse_config_at};
use std::io::Read;
use std::path::PathBuf;

/// Arguments for the parse command
#[derive(Parser, Debug, Clone)]
pub struct ParseArgs {
    /// Builtin schema (system, chassis-cluster, bgp)
    #[arg(short, long)]
    pub schema: String,

    /// Input is relative to the schema's hierarchy root
    #[arg(short, long)]
    pub relative: bool,

    /// Input file (stdin when omitted)
    pub file: Option<PathBuf>,
}

impl ParseArgs {
    /// Execute the parse command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let Some((schema, root)) = builtin::schema_by_name(&self.schema) else {
            ctx.output.error(&format!(
                "unknown schema '{}', expected one of: {}",
                self.schema,
                builtin::SCHEMA_NAMES.join(", ")
            ));
            return Ok(2);
        };

        let mut raw = String::new();
        match &self.file {
            Some(path) => {
                raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
            }
            None => {
                std::io::stdin().read_to_string(&mut raw)?;
            }
        }

        let context = if self.relative { root } else { "" };
        match parse_config_at(&raw, &schema, context) {
            Ok(record) => {
                println!("{}", serde_json::to_string_pretty(&record)?);
                Ok(0)
            }
            Err(e) => Ok(ctx.fail(&e)),
        }
    }
}
