//! Shell commands.
//!
//! A [`Command`] parses its own arguments from a [`Call`], runs against the
//! session context and returns a [`CommandOutput`] for the shell to print.
//! Availability is computed for every invocation, never cached.

pub mod actuator;
pub mod args;
pub mod availability;
pub mod builtin;
pub mod registry;

use std::fmt;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::auth::Authentication;
use crate::context::SessionContext;
use crate::error::CommandResult;
use crate::services::ShellServices;

pub use args::{Args, OptionSpec};
pub use availability::Availability;
pub use registry::CommandRegistry;

/// Group of the built-in commands.
pub const BUILT_IN_GROUP: &str = "Built-In Commands";

/// Group of the actuator commands.
pub const ACTUATOR_GROUP: &str = "Actuator Commands";

/// What a command produced.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutput {
    /// Text printed as is.
    Text(String),
    /// A value printed as pretty JSON.
    Json(Value),
    /// Nothing to print.
    Empty,
}

impl CommandOutput {
    /// Render for the terminal. `None` when there is nothing to print.
    pub fn render(&self) -> CommandResult<Option<String>> {
        Ok(match self {
            Self::Text(text) => Some(text.clone()),
            Self::Json(value) => Some(serde_json::to_string_pretty(value)?),
            Self::Empty => None,
        })
    }
}

/// One invocation of a command.
pub struct Call<'a> {
    /// The session the command runs in.
    pub ctx: &'a mut SessionContext,
    /// Parsed arguments.
    pub args: Args,
    /// Shared server state.
    pub services: &'a ShellServices,
}

impl fmt::Debug for Call<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call")
            .field("session", &self.ctx.id())
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

/// A shell command.
pub trait Command: Send + Sync + fmt::Debug {
    /// Name typed to run the command.
    fn name(&self) -> &str;

    /// Other names for the command.
    fn aliases(&self) -> &[&str] {
        &[]
    }

    /// One-line description shown by `help`.
    fn description(&self) -> &str;

    /// Group shown by `help`.
    fn group(&self) -> &str {
        BUILT_IN_GROUP
    }

    /// Accepted options.
    fn options(&self) -> &[OptionSpec] {
        &[]
    }

    /// Parse the words following the command name.
    fn parse_args(&self, words: &[String]) -> CommandResult<Args> {
        Args::parse(words, self.options())
    }

    /// Whether the command may run now for `auth`.
    fn availability(&self, _services: &ShellServices, _auth: Option<&Authentication>) -> Availability {
        Availability::Available
    }

    /// Run the command.
    fn execute<'a>(&'a self, call: Call<'a>) -> BoxFuture<'a, CommandResult<CommandOutput>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn output_rendering() {
        assert_eq!(
            CommandOutput::Text("hi".into()).render().unwrap(),
            Some("hi".to_string())
        );
        assert_eq!(
            CommandOutput::Json(json!({"status": "UP"})).render().unwrap(),
            Some("{\n  \"status\": \"UP\"\n}".to_string())
        );
        assert_eq!(CommandOutput::Empty.render().unwrap(), None);
    }
}
