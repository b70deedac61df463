//! Convenient re-exports for embedding the shell.
//!
//! ```ignore
//! use ssh_shell::prelude::*;
//! ```

// Configuration
pub use crate::config::{EnvConfig, ShellConfig};

// Error handling
pub use crate::error::{CommandError, CommandResult, Result, ShellError};

// Server
pub use crate::server::SshShellServer;
pub use crate::services::ShellServices;

// Commands
pub use crate::commands::{Args, Call, Command, CommandOutput, OptionSpec};
pub use crate::context::SessionContext;
pub use crate::helper::ShellHelper;

// Interactive views
pub use crate::interactive::{ContentProducer, InteractiveOptions};
pub use shell_term::{Color, Style, StyledLine, TerminalSize};

// Endpoints
pub use crate::endpoints::{Endpoint, EndpointRequest, HealthIndicator, HealthCheckResult};
