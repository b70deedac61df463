//! Standalone admin shell server.
//!
//! Reads `ssh-shell.toml` from the working directory (or the path given as
//! the first argument), applies `SSH_SHELL_*` overrides and serves until
//! Ctrl-C or the `shutdown` command.
//!
//! Run with: `cargo run --example server`
//! Then connect with: `ssh -p 2222 user@127.0.0.1`

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;
use ssh_shell::prelude::*;

/// Prints how long the server has been running.
#[derive(Debug)]
struct Uptime {
    started: Instant,
}

impl Command for Uptime {
    fn name(&self) -> &str {
        "uptime"
    }

    fn description(&self) -> &str {
        "Display server uptime."
    }

    fn group(&self) -> &str {
        "Demo Commands"
    }

    fn execute<'a>(&'a self, _call: Call<'a>) -> BoxFuture<'a, CommandResult<CommandOutput>> {
        Box::pin(async move {
            let secs = self.started.elapsed().as_secs();
            Ok(CommandOutput::Text(format!("up {}m {}s", secs / 60, secs % 60)))
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let path = std::env::args().nth(1).map(PathBuf::from);
    let config = ssh_shell::config::load(path.as_deref(), &EnvConfig::default()).await?;
    let levels = ssh_shell::logging::init(&config.logging)?;

    let services = ShellServices::builder(config)
        .with_log_levels(levels)
        .with_command(Uptime { started: Instant::now() })
        .build();

    let shutdown = services.shutdown_token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, shutting down");
            shutdown.cancel();
        }
    });

    SshShellServer::new(Arc::new(services)).serve().await
}
