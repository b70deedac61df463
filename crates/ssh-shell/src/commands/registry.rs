//! Ordered command registry.

use std::sync::Arc;

use super::{Availability, Command};
use crate::auth::Authentication;
use crate::error::{CommandError, CommandResult};
use crate::services::ShellServices;

/// Commands in registration order.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    commands: Vec<Arc<dyn Command>>,
}

impl CommandRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command. A command with the same name is replaced in
    /// place.
    pub fn register(&mut self, command: Arc<dyn Command>) {
        tracing::debug!(command = command.name(), "registered command");
        if let Some(slot) = self.commands.iter_mut().find(|c| c.name() == command.name()) {
            *slot = command;
        } else {
            self.commands.push(command);
        }
    }

    /// Register a command, builder style.
    #[must_use]
    pub fn with(mut self, command: impl Command + 'static) -> Self {
        self.register(Arc::new(command));
        self
    }

    /// Find a command by name or alias.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Command>> {
        self.commands
            .iter()
            .find(|c| c.name() == name || c.aliases().contains(&name))
    }

    /// All commands, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Command>> {
        self.commands.iter()
    }

    /// Number of registered commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no command is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Find a command that may run now.
    ///
    /// Availability is evaluated on every call.
    pub fn resolve(
        &self,
        name: &str,
        services: &ShellServices,
        auth: Option<&Authentication>,
    ) -> CommandResult<Arc<dyn Command>> {
        let command = self.get(name).ok_or_else(|| CommandError::not_found(name))?;
        match command.availability(services, auth) {
            Availability::Available => Ok(Arc::clone(command)),
            Availability::Unavailable { reason } => {
                tracing::debug!(command = name, %reason, "command unavailable");
                Err(CommandError::unavailable(command.name(), reason))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::builtin::{Clear, Exit, Help};
    use crate::config::ShellConfig;

    #[test]
    fn lookup_by_name_and_alias() {
        let registry = CommandRegistry::new().with(Help).with(Exit).with(Clear);
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get("quit").map(|c| c.name()), Some("exit"));
        assert!(registry.get("nope").is_none());
        let names: Vec<_> = registry.iter().map(|c| c.name()).collect();
        assert_eq!(names, ["help", "exit", "clear"]);
    }

    #[test]
    fn replace_keeps_position() {
        let mut registry = CommandRegistry::new().with(Help).with(Exit);
        registry.register(Arc::new(Help));
        let names: Vec<_> = registry.iter().map(|c| c.name()).collect();
        assert_eq!(names, ["help", "exit"]);
    }

    #[test]
    fn resolve_reports_not_found_and_unavailable() {
        let services = ShellServices::builder(ShellConfig::default()).build();
        let err = services
            .commands()
            .resolve("nope", &services, None)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Command 'nope' not found (type 'help' to list available commands)"
        );

        let err = services
            .commands()
            .resolve("shutdown", &services, None)
            .unwrap_err();
        assert!(matches!(err, CommandError::Unavailable { .. }));
        assert!(err.to_string().contains("deactivated"));

        assert!(services.commands().resolve("health", &services, None).is_ok());
    }
}
