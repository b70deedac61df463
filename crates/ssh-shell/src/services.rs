//! Server-wide state shared by every session.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::commands::actuator::ActuatorCommand;
use crate::commands::builtin::{Clear, Exit, Help, Watch};
use crate::commands::{Command, CommandRegistry};
use crate::config::ShellConfig;
use crate::endpoints::health::{PingIndicator, ServerIndicator};
use crate::endpoints::{
    AuditEndpoint, AuditLog, ConfigPropsEndpoint, Endpoint, EndpointRegistry, EnvEndpoint,
    HealthEndpoint, InfoEndpoint, LoggersEndpoint, MetricsEndpoint, MetricsRegistry,
    SessionRegistry, SessionsEndpoint, ShutdownEndpoint, ThreadDumpEndpoint,
};
use crate::logging::LogLevels;

/// Configuration, registries and endpoints shared by all sessions.
#[derive(Debug)]
pub struct ShellServices {
    config: Arc<ShellConfig>,
    endpoints: EndpointRegistry,
    commands: CommandRegistry,
    metrics: Arc<MetricsRegistry>,
    sessions: Arc<SessionRegistry>,
    audit: Arc<AuditLog>,
    shutdown: CancellationToken,
    log_levels: LogLevels,
}

impl ShellServices {
    /// Start building services for `config`.
    #[must_use]
    pub fn builder(config: ShellConfig) -> ShellServicesBuilder {
        ShellServicesBuilder::new(config)
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// The configuration, shared.
    #[must_use]
    pub fn shared_config(&self) -> Arc<ShellConfig> {
        Arc::clone(&self.config)
    }

    /// Registered endpoints.
    #[must_use]
    pub const fn endpoints(&self) -> &EndpointRegistry {
        &self.endpoints
    }

    /// Registered commands.
    #[must_use]
    pub const fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    /// Metrics recorded by the server.
    #[must_use]
    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    /// Active sessions.
    #[must_use]
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Audit log.
    #[must_use]
    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Cancelled to stop the server.
    #[must_use]
    pub const fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Runtime logger levels.
    #[must_use]
    pub const fn log_levels(&self) -> &LogLevels {
        &self.log_levels
    }
}

/// Builder for [`ShellServices`].
#[derive(Debug)]
pub struct ShellServicesBuilder {
    config: ShellConfig,
    log_levels: Option<LogLevels>,
    shutdown: Option<CancellationToken>,
    endpoints: Vec<Arc<dyn Endpoint>>,
    commands: Vec<Arc<dyn Command>>,
}

impl ShellServicesBuilder {
    fn new(config: ShellConfig) -> Self {
        Self {
            config,
            log_levels: None,
            shutdown: None,
            endpoints: Vec::new(),
            commands: Vec::new(),
        }
    }

    /// Use levels from an installed subscriber. Without it, levels are
    /// tracked from the configured filter only.
    #[must_use]
    pub fn with_log_levels(mut self, levels: LogLevels) -> Self {
        self.log_levels = Some(levels);
        self
    }

    /// Use `token` as the shutdown signal.
    #[must_use]
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = Some(token);
        self
    }

    /// Register an endpoint, replacing a built-in one with the same id.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Endpoint + 'static) -> Self {
        self.endpoints.push(Arc::new(endpoint));
        self
    }

    /// Register a command, replacing a built-in one with the same name.
    #[must_use]
    pub fn with_command(mut self, command: impl Command + 'static) -> Self {
        self.commands.push(Arc::new(command));
        self
    }

    /// Build the services with the default endpoints and commands.
    #[must_use]
    pub fn build(self) -> ShellServices {
        let config = Arc::new(self.config);
        let shutdown = self.shutdown.unwrap_or_default();
        let log_levels = self
            .log_levels
            .unwrap_or_else(|| LogLevels::new(&config.logging.filter));
        let metrics = Arc::new(MetricsRegistry::new());
        let sessions = Arc::new(SessionRegistry::new());
        let audit = Arc::new(AuditLog::default());

        let address = format!("{}:{}", config.host, config.port);
        let health = HealthEndpoint::new()
            .with_indicator(PingIndicator)
            .with_indicator(ServerIndicator::new(shutdown.clone(), address));
        let mut endpoints = EndpointRegistry::new()
            .with(AuditEndpoint::new(Arc::clone(&audit)))
            .with(ConfigPropsEndpoint::new(Arc::clone(&config)))
            .with(EnvEndpoint::new())
            .with(health)
            .with(InfoEndpoint::new(config.info.clone()))
            .with(LoggersEndpoint::new(log_levels.clone()))
            .with(MetricsEndpoint::new(Arc::clone(&metrics)))
            .with(SessionsEndpoint::new(Arc::clone(&sessions)))
            .with(ShutdownEndpoint::new(shutdown.clone()))
            .with(ThreadDumpEndpoint);
        for endpoint in self.endpoints {
            endpoints.register(endpoint);
        }

        let mut commands = CommandRegistry::new()
            .with(Help)
            .with(Exit)
            .with(Clear)
            .with(Watch);
        if config.actuator.enable {
            for command in ActuatorCommand::all() {
                commands.register(Arc::new(command));
            }
        } else {
            tracing::debug!("actuator commands disabled");
        }
        for command in self.commands {
            commands.register(command);
        }

        ShellServices {
            config,
            endpoints,
            commands,
            metrics,
            sessions,
            audit,
            shutdown,
            log_levels,
        }
    }
}
