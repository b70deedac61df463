//! ssh-shell: embedded SSH administration shell
//!
//! This crate runs an SSH server inside an application and gives each
//! authenticated user a small command shell for inspecting and managing it.
//!
//! # Features
//!
//! - **SSH transport** via `russh`, with password authentication
//! - **Command registry** with per-call availability checks
//! - **Actuator commands** backed by pluggable management endpoints
//! - **Auto-refreshing views** redrawn in place on a fixed tick
//! - **Runtime log levels** through a reloadable `tracing` filter
//! - **TOML configuration** with `SSH_SHELL_*` environment overrides
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ssh_shell::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ssh_shell::config::load(None, &EnvConfig::default()).await?;
//!     let levels = ssh_shell::logging::init(&config.logging)?;
//!     let services = ShellServices::builder(config).with_log_levels(levels).build();
//!     SshShellServer::new(Arc::new(services)).serve().await
//! }
//! ```

pub mod auth;
pub mod commands;
pub mod config;
pub mod context;
pub mod endpoints;
pub mod error;
pub mod helper;
pub mod host_key;
pub mod interactive;
pub mod logging;
pub mod prelude;
pub mod server;
pub mod services;
pub mod shell;

pub use auth::{Authentication, PasswordAuthenticator, SimpleAuthenticator, UserStore};
pub use commands::{Command, CommandOutput, CommandRegistry};
pub use config::{EnvConfig, ShellConfig};
pub use context::SessionContext;
pub use error::{CommandError, CommandResult, Result, ShellError};
pub use helper::ShellHelper;
pub use interactive::{
    ContentProducer, InteractiveEndReason, InteractiveOptions, InteractiveResult, run_interactive,
};
pub use server::SshShellServer;
pub use services::ShellServices;
pub use shell::Shell;
