//! `show` - run a read-only command

use super::CommandContext;
use anyhow::Result;
use clap::Parser;

/// Arguments for the show command
#[derive(Parser, Debug, Clone)]
pub struct ShowArgs {
    /// Return the raw XML reply body
    #[arg(long)]
    pub xml: bool,

    /// Command words, e.g. `show configuration system`
    #[arg(required = true, trailing_var_arg = true)]
    pub command: Vec<String>,
}

impl ShowArgs {
    /// The command as sent to the device
    pub fn command_text(&self) -> String {
        self.command.join(" ")
    }

    /// Execute the show command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let mut session = match ctx.open_session().await {
            Ok(session) => session,
            Err(e) => return Ok(ctx.fail(&e)),
        };

        let text = self.command_text();
        let result = if self.xml {
            session.command_xml(&text).await
        } else {
            session.command(&text).await
        };

        let code = match result {
            Ok(output) => {
                ctx.output.text(&output);
                0
            }
            Err(e) => ctx.fail(&e),
        };

        if let Err(e) = session.close().await {
            ctx.output.warning(&format!("close failed: {}", e));
        }
        ctx.output.flush();
        Ok(code)
    }
}
