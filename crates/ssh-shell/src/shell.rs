//! The read-eval-print loop run for each session.

use std::sync::Arc;

use serde_json::{Map, Value};
use shell_term::{ReadLine, colored};

use crate::commands::Call;
use crate::commands::args::tokenize;
use crate::context::SessionContext;
use crate::endpoints::{audit, metrics};
use crate::error::{CommandResult, Result, ShellError};
use crate::helper;
use crate::services::ShellServices;

/// Principal recorded for sessions without authentication.
const ANONYMOUS: &str = "anonymous";

/// Runs command lines against the shared services.
#[derive(Debug, Clone)]
pub struct Shell {
    services: Arc<ShellServices>,
}

impl Shell {
    /// Create a shell over `services`.
    #[must_use]
    pub const fn new(services: Arc<ShellServices>) -> Self {
        Self { services }
    }

    /// The shared services.
    #[must_use]
    pub fn services(&self) -> &ShellServices {
        &self.services
    }

    fn prompt(ctx: &SessionContext) -> String {
        let config = ctx.config();
        colored(&format!("{} ", config.prompt.text), config.prompt_color())
    }

    /// Read and run lines until the user exits, input ends or the session
    /// is cancelled.
    ///
    /// Command failures are printed and the loop continues; only a lost
    /// connection ends it with an error.
    pub async fn run(&self, ctx: &mut SessionContext) -> Result<()> {
        let prompt = Self::prompt(ctx);
        let cancel = ctx.cancel_token().clone();
        tracing::info!(session = ctx.id(), "shell started");
        while !ctx.exit_requested() && !cancel.is_cancelled() {
            let line = tokio::select! {
                () = cancel.cancelled() => break,
                line = ctx.read_line(&prompt) => line?,
            };
            match line {
                ReadLine::Line(line) => {
                    self.dispatch(ctx, &line).await?;
                }
                ReadLine::Interrupted => {}
                ReadLine::Eof => {
                    ctx.println("")?;
                    break;
                }
            }
        }
        tracing::info!(session = ctx.id(), "shell ended");
        Ok(())
    }

    /// Run a single command line, as for an `exec` request. Returns the
    /// exit status: `0` on success, `1` on failure.
    pub async fn run_command(&self, ctx: &mut SessionContext, line: &str) -> Result<u32> {
        Ok(if self.dispatch(ctx, line).await? { 0 } else { 1 })
    }

    /// Run one line and print its output or error. Returns whether the
    /// command succeeded.
    async fn dispatch(&self, ctx: &mut SessionContext, line: &str) -> Result<bool> {
        match self.execute_line(ctx, line).await {
            Ok(Some(output)) => {
                ctx.println(&output)?;
                Ok(true)
            }
            Ok(None) => Ok(true),
            Err(e) if e.is_disconnect() => Err(ShellError::from(e)),
            Err(e) => {
                tracing::debug!(session = ctx.id(), error = %e, "command failed");
                ctx.println(&helper::error(&e.to_string()))?;
                Ok(false)
            }
        }
    }

    /// Parse and run one line, returning the rendered output.
    ///
    /// A blank line does nothing.
    pub async fn execute_line(&self, ctx: &mut SessionContext, line: &str) -> CommandResult<Option<String>> {
        let words = tokenize(line)?;
        let Some((name, rest)) = words.split_first() else {
            return Ok(None);
        };
        let services = &*self.services;
        let command = services
            .commands()
            .resolve(name, services, ctx.authentication())?;
        let args = command.parse_args(rest)?;

        let principal = ctx
            .authentication()
            .map_or_else(|| ANONYMOUS.to_string(), |a| a.name.clone());
        tracing::info!(session = ctx.id(), user = %principal, command = command.name(), "running command");

        let result = command.execute(Call { ctx, args, services }).await;

        let status = if result.is_ok() { "success" } else { "failure" };
        services
            .metrics()
            .counter(metrics::COMMANDS, &[("command", command.name()), ("status", status)])
            .inc();
        let mut data = Map::new();
        data.insert("command".to_string(), Value::String(command.name().to_string()));
        data.insert("status".to_string(), Value::String(status.to_string()));
        services.audit().record(&principal, audit::COMMAND, data);

        result?.render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShellConfig;
    use shell_term::{Terminal, TerminalRemote};

    fn setup() -> (Shell, SessionContext, TerminalRemote) {
        let services = Arc::new(ShellServices::builder(ShellConfig::default()).build());
        let (term, remote) = Terminal::builder().build().unwrap();
        let ctx = SessionContext::new(1, term, services.shared_config());
        (Shell::new(services), ctx, remote)
    }

    #[tokio::test]
    async fn blank_line_does_nothing() {
        let (shell, mut ctx, _remote) = setup();
        assert_eq!(shell.execute_line(&mut ctx, "   ").await.unwrap(), None);
        assert!(shell.services().audit().events(None, None).is_empty());
    }

    #[tokio::test]
    async fn records_metrics_and_audit() {
        let (shell, mut ctx, _remote) = setup();
        let out = shell.execute_line(&mut ctx, "health").await.unwrap().unwrap();
        assert!(out.contains("\"status\": \"UP\""));

        let metric = shell
            .services()
            .metrics()
            .metric(metrics::COMMANDS, &Default::default())
            .unwrap();
        assert_eq!(metric.count, Some(1));
        let events = shell.services().audit().events(Some(ANONYMOUS), Some(audit::COMMAND));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data["command"], "health");
    }

    #[tokio::test]
    async fn failures_are_printed_in_red() {
        let (shell, mut ctx, mut remote) = setup();
        assert_eq!(shell.run_command(&mut ctx, "nope").await.unwrap(), 1);
        let out = String::from_utf8(remote.drain_output()).unwrap();
        assert_eq!(
            out,
            format!(
                "{}\r\n",
                helper::error("Command 'nope' not found (type 'help' to list available commands)")
            )
        );
        assert_eq!(shell.run_command(&mut ctx, "info").await.unwrap(), 0);
    }
}
