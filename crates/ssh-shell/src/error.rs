//! Error types for ssh-shell.
//!
//! [`ShellError`] covers failures of the shell machinery itself (terminal,
//! configuration, SSH transport, host keys). [`CommandError`] is what a
//! command reports to the user: it is printed in the session and never ends
//! it.

use std::io;

use shell_term::TermError;
use thiserror::Error;

/// The main error type for ssh-shell operations.
#[derive(Debug, Error)]
pub enum ShellError {
    /// Terminal failure.
    #[error("terminal error: {0}")]
    Terminal(#[from] TermError),

    /// I/O error with context.
    #[error("I/O error: {context}: {source}")]
    IoWithContext {
        /// What operation was being performed.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// SSH protocol or transport failure.
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Host key could not be loaded or generated.
    #[error("host key error: {0}")]
    HostKey(String),

    /// A command failed in a context where it cannot be reported to a user.
    #[error(transparent)]
    Command(#[from] CommandError),
}

impl ShellError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an I/O error with context.
    pub fn io_context(context: impl Into<String>, source: io::Error) -> Self {
        Self::IoWithContext {
            context: context.into(),
            source,
        }
    }

    /// Create a host key error.
    pub fn host_key(message: impl Into<String>) -> Self {
        Self::HostKey(message.into())
    }

    /// Check if this error means the remote peer has gone away.
    #[must_use]
    pub fn is_disconnect(&self) -> bool {
        match self {
            Self::Terminal(e) => e.is_disconnect(),
            Self::Io(e) | Self::IoWithContext { source: e, .. } => {
                e.kind() == io::ErrorKind::BrokenPipe
            }
            Self::Command(e) => e.is_disconnect(),
            _ => false,
        }
    }
}

/// A user-facing command failure.
#[derive(Debug, Error)]
pub enum CommandError {
    /// No command with this name.
    #[error("Command '{name}' not found (type 'help' to list available commands)")]
    NotFound {
        /// The name that was typed.
        name: String,
    },

    /// The command exists but may not run now.
    #[error("Command '{name}' exists but is not currently available because {reason}")]
    Unavailable {
        /// The command name.
        name: String,
        /// Why it is unavailable.
        reason: String,
    },

    /// Missing or invalid arguments.
    #[error("{0}")]
    InvalidArgument(String),

    /// The command ran and failed.
    #[error("{0}")]
    Failed(String),

    /// Command output could not be serialized.
    #[error("failed to render result: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Terminal failure while the command was running.
    #[error("terminal error: {0}")]
    Terminal(#[from] TermError),

    /// I/O failure while the command was running.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Shell failure while the command was running.
    #[error("{0}")]
    Shell(Box<ShellError>),
}

impl CommandError {
    /// Create a not-found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Create an unavailable error.
    pub fn unavailable(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create a failure error.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Check if this error means the remote peer has gone away.
    #[must_use]
    pub fn is_disconnect(&self) -> bool {
        match self {
            Self::Terminal(e) => e.is_disconnect(),
            Self::Io(e) => e.kind() == io::ErrorKind::BrokenPipe,
            Self::Shell(e) => e.is_disconnect(),
            _ => false,
        }
    }
}

impl From<ShellError> for CommandError {
    fn from(err: ShellError) -> Self {
        match err {
            ShellError::Command(inner) => inner,
            ShellError::Terminal(inner) => Self::Terminal(inner),
            ShellError::Io(inner) => Self::Io(inner),
            other => Self::Shell(Box::new(other)),
        }
    }
}

/// Result type for shell operations.
pub type Result<T> = std::result::Result<T, ShellError>;

/// Result type for command execution.
pub type CommandResult<T> = std::result::Result<T, CommandError>;
