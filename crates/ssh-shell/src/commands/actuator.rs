//! Actuator commands: one command per management endpoint.

use std::fmt;
use std::str::FromStr;

use futures::future::BoxFuture;
use serde_json::Value;

use super::availability::actuator_availability;
use super::{ACTUATOR_GROUP, Args, Availability, Call, Command, CommandOutput, OptionSpec};
use crate::auth::Authentication;
use crate::endpoints::{EndpointRequest, ids};
use crate::error::{CommandError, CommandResult};
use crate::helper::ShellHelper;
use crate::logging::{LogLevel, UnknownLevel};
use crate::services::ShellServices;

const AUDIT_OPTIONS: &[OptionSpec] = &[
    OptionSpec::value('p', "principal", "Principal to filter on"),
    OptionSpec::value('t', "type", "Type to filter on"),
];

const ENV_OPTIONS: &[OptionSpec] = &[OptionSpec::value('p', "pattern", "Pattern to filter on")];

const LOGGERS_OPTIONS: &[OptionSpec] = &[
    OptionSpec::value('a', "action", "Action to perform: list, get or conf"),
    OptionSpec::value('n', "name", "Logger name for configuration or display"),
    OptionSpec::value('l', "level", "Logger level for configuration"),
];

const METRICS_OPTIONS: &[OptionSpec] = &[
    OptionSpec::value('n', "name", "Metric name to get"),
    OptionSpec::value('t', "tags", "Tags (key=value, separated by coma)"),
];

const SESSIONS_OPTIONS: &[OptionSpec] = &[OptionSpec::value('u', "username", "User name to filter on")];

/// The actuator commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActuatorKind {
    /// Audit events.
    Audit,
    /// Application components.
    Beans,
    /// Configuration conditions.
    Conditions,
    /// Configuration properties.
    Configprops,
    /// Environment variables.
    Env,
    /// Health status.
    Health,
    /// Request traces.
    Httptrace,
    /// Application information.
    Info,
    /// Logger levels.
    Loggers,
    /// Request mappings.
    Mappings,
    /// Metrics.
    Metrics,
    /// Scheduled tasks.
    Scheduledtasks,
    /// Active sessions.
    Sessions,
    /// Server shutdown.
    Shutdown,
    /// Threads.
    Threaddump,
}

impl ActuatorKind {
    /// Every actuator command, in help order.
    pub const ALL: [Self; 15] = [
        Self::Audit,
        Self::Beans,
        Self::Conditions,
        Self::Configprops,
        Self::Env,
        Self::Health,
        Self::Httptrace,
        Self::Info,
        Self::Loggers,
        Self::Mappings,
        Self::Metrics,
        Self::Scheduledtasks,
        Self::Sessions,
        Self::Shutdown,
        Self::Threaddump,
    ];

    /// Command name, equal to the endpoint id.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Audit => ids::AUDIT,
            Self::Beans => ids::BEANS,
            Self::Conditions => ids::CONDITIONS,
            Self::Configprops => ids::CONFIGPROPS,
            Self::Env => ids::ENV,
            Self::Health => ids::HEALTH,
            Self::Httptrace => ids::HTTPTRACE,
            Self::Info => ids::INFO,
            Self::Loggers => ids::LOGGERS,
            Self::Mappings => ids::MAPPINGS,
            Self::Metrics => ids::METRICS,
            Self::Scheduledtasks => ids::SCHEDULEDTASKS,
            Self::Sessions => ids::SESSIONS,
            Self::Shutdown => ids::SHUTDOWN,
            Self::Threaddump => ids::THREADDUMP,
        }
    }

    const fn description(self) -> &'static str {
        match self {
            Self::Audit => "Display audit endpoint.",
            Self::Beans => "Display beans endpoint.",
            Self::Conditions => "Display conditions endpoint.",
            Self::Configprops => "Display configprops endpoint.",
            Self::Env => "Display env endpoint.",
            Self::Health => "Display health endpoint.",
            Self::Httptrace => "Display httptrace endpoint.",
            Self::Info => "Display info endpoint.",
            Self::Loggers => "Display or configure loggers.",
            Self::Mappings => "Display mappings endpoint.",
            Self::Metrics => "Display metrics endpoint.",
            Self::Scheduledtasks => "Display scheduledtasks endpoint.",
            Self::Sessions => "Display sessions endpoint.",
            Self::Shutdown => "Shutdown application.",
            Self::Threaddump => "Display threaddump endpoint.",
        }
    }

    /// Options accepted by the command.
    #[must_use]
    pub const fn options(self) -> &'static [OptionSpec] {
        match self {
            Self::Audit => AUDIT_OPTIONS,
            Self::Env => ENV_OPTIONS,
            Self::Loggers => LOGGERS_OPTIONS,
            Self::Metrics => METRICS_OPTIONS,
            Self::Sessions => SESSIONS_OPTIONS,
            _ => &[],
        }
    }

    /// Whether the command only reads state and can be re-run by `watch`.
    #[must_use]
    pub const fn is_read_only(self) -> bool {
        !matches!(self, Self::Shutdown)
    }

    fn request(self, args: &Args) -> EndpointRequest {
        let request = EndpointRequest::new();
        match self {
            Self::Audit => request
                .with_opt("principal", args.value("principal"))
                .with_opt("type", args.value("type")),
            Self::Env => request.with_opt("pattern", args.value("pattern")),
            Self::Metrics => request
                .with_opt("name", args.value("name"))
                .with_opt("tags", args.value("tags")),
            Self::Sessions => request.with_opt("username", args.value("username")),
            _ => request,
        }
    }

    /// Query the backing endpoint.
    ///
    /// `shutdown` is not a query; it goes through
    /// [`ActuatorCommand`] so the user is asked first.
    pub fn query(self, args: &Args, services: &ShellServices) -> CommandResult<CommandOutput> {
        match self {
            Self::Loggers => loggers(args, services),
            Self::Metrics => {
                let value = invoke(self, &self.request(args), services)?;
                match (value, args.value("name")) {
                    (Value::Null, Some(name)) => {
                        let tags = args
                            .value("tags")
                            .map(|t| format!(" and tags: {t}"))
                            .unwrap_or_default();
                        Err(CommandError::invalid_argument(format!(
                            "No result for metrics name: {name}{tags}"
                        )))
                    }
                    (value, _) => Ok(CommandOutput::Json(value)),
                }
            }
            Self::Shutdown => Err(CommandError::failed("shutdown cannot be queried")),
            _ => invoke(self, &self.request(args), services).map(CommandOutput::Json),
        }
    }
}

impl fmt::Display for ActuatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ActuatorKind {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| CommandError::not_found(s))
    }
}

fn invoke(kind: ActuatorKind, request: &EndpointRequest, services: &ShellServices) -> CommandResult<Value> {
    let endpoint = services
        .endpoints()
        .get(kind.name())
        .ok_or_else(|| CommandError::unavailable(kind.name(), format!("{kind} endpoint is not registered")))?;
    endpoint.invoke(request)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoggerAction {
    List,
    Get,
    Conf,
}

impl FromStr for LoggerAction {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "list" => Ok(Self::List),
            "get" => Ok(Self::Get),
            "conf" => Ok(Self::Conf),
            other => Err(CommandError::invalid_argument(format!(
                "Unknown action '{other}', expected one of: list, get, conf"
            ))),
        }
    }
}

impl fmt::Display for LoggerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::List => "list",
            Self::Get => "get",
            Self::Conf => "conf",
        })
    }
}

fn loggers(args: &Args, services: &ShellServices) -> CommandResult<CommandOutput> {
    let action: LoggerAction = args.value("action").unwrap_or("list").parse()?;
    if action == LoggerAction::List {
        return invoke(ActuatorKind::Loggers, &EndpointRequest::new(), services).map(CommandOutput::Json);
    }
    let name = args.value("name").ok_or_else(|| {
        CommandError::invalid_argument(format!("Logger name is mandatory for '{action}' action"))
    })?;
    let request = EndpointRequest::new().with("name", name);
    if action == LoggerAction::Conf {
        let level: LogLevel = args
            .value("level")
            .ok_or_else(|| {
                CommandError::invalid_argument(format!("Logger level is mandatory for '{action}' action"))
            })?
            .parse()
            .map_err(|e: UnknownLevel| CommandError::invalid_argument(e.to_string()))?;
        invoke(ActuatorKind::Loggers, &request.with("level", level.name()), services)?;
        return Ok(CommandOutput::Text(format!(
            "Logger named [{name}] now configured to level [{level}]"
        )));
    }
    let levels = invoke(ActuatorKind::Loggers, &request, services)?;
    let configured = levels["configuredLevel"].as_str().unwrap_or("none");
    let effective = levels["effectiveLevel"].as_str().unwrap_or("none");
    Ok(CommandOutput::Text(format!(
        "Logger named [{name}] : [configured: {configured}, effective: {effective}]"
    )))
}

/// Shell command backed by one endpoint.
#[derive(Debug, Clone, Copy)]
pub struct ActuatorCommand {
    kind: ActuatorKind,
}

impl ActuatorCommand {
    /// Command for `kind`.
    #[must_use]
    pub const fn new(kind: ActuatorKind) -> Self {
        Self { kind }
    }

    /// One command per actuator kind.
    pub fn all() -> impl Iterator<Item = Self> {
        ActuatorKind::ALL.into_iter().map(Self::new)
    }

    /// The endpoint behind this command.
    #[must_use]
    pub const fn kind(&self) -> ActuatorKind {
        self.kind
    }
}

impl Command for ActuatorCommand {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn description(&self) -> &str {
        self.kind.description()
    }

    fn group(&self) -> &str {
        ACTUATOR_GROUP
    }

    fn options(&self) -> &[OptionSpec] {
        self.kind.options()
    }

    fn availability(&self, services: &ShellServices, auth: Option<&Authentication>) -> Availability {
        actuator_availability(self.kind.name(), services.config(), services.endpoints(), auth)
    }

    fn execute<'a>(&'a self, call: Call<'a>) -> BoxFuture<'a, CommandResult<CommandOutput>> {
        Box::pin(async move {
            if self.kind != ActuatorKind::Shutdown {
                return self.kind.query(&call.args, call.services);
            }
            let mut helper = ShellHelper::new(call.ctx);
            if helper
                .confirm("Are you sure you want to shutdown application ? [y/N]", false, &[])
                .await?
            {
                invoke(self.kind, &EndpointRequest::new(), call.services)?;
                Ok(CommandOutput::Text("Shutting down application...".to_string()))
            } else {
                Ok(CommandOutput::Text("Aborting shutdown".to_string()))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShellConfig;
    use crate::logging::LogLevels;

    fn services() -> ShellServices {
        ShellServices::builder(ShellConfig::default())
            .with_log_levels(LogLevels::new("info"))
            .build()
    }

    fn args(kind: ActuatorKind, line: &str) -> Args {
        let words = super::super::args::tokenize(line).unwrap();
        Args::parse(&words, kind.options()).unwrap()
    }

    #[test]
    fn names_round_trip_through_parse() {
        for kind in ActuatorKind::ALL {
            assert_eq!(kind.name().parse::<ActuatorKind>().unwrap(), kind);
        }
        assert!(matches!("watch".parse::<ActuatorKind>(), Err(CommandError::NotFound { .. })));
    }

    #[test]
    fn loggers_messages() {
        let services = services();
        let kind = ActuatorKind::Loggers;

        let err = kind.query(&args(kind, "-a get"), &services).unwrap_err();
        assert_eq!(err.to_string(), "Logger name is mandatory for 'get' action");
        let err = kind.query(&args(kind, "-a conf -n russh"), &services).unwrap_err();
        assert_eq!(err.to_string(), "Logger level is mandatory for 'conf' action");

        let out = kind.query(&args(kind, "-a conf -n russh -l debug"), &services).unwrap();
        assert_eq!(
            out,
            CommandOutput::Text("Logger named [russh] now configured to level [DEBUG]".into())
        );
        let out = kind.query(&args(kind, "-a get -n russh::server"), &services).unwrap();
        assert_eq!(
            out,
            CommandOutput::Text("Logger named [russh::server] : [configured: none, effective: DEBUG]".into())
        );

        let out = kind.query(&args(kind, ""), &services).unwrap();
        assert!(matches!(out, CommandOutput::Json(v) if v["loggers"]["russh"]["configuredLevel"] == "DEBUG"));
        assert!(kind.query(&args(kind, "-a drop"), &services).is_err());
    }

    #[test]
    fn metrics_without_result() {
        let services = services();
        let kind = ActuatorKind::Metrics;
        let err = kind.query(&args(kind, "-n missing"), &services).unwrap_err();
        assert_eq!(err.to_string(), "No result for metrics name: missing");
        let err = kind
            .query(&args(kind, "-n missing -t a=b"), &services)
            .unwrap_err();
        assert_eq!(err.to_string(), "No result for metrics name: missing and tags: a=b");

        services.metrics().counter("ssh.commands", &[("command", "health")]).inc();
        let out = kind.query(&args(kind, "-n ssh.commands"), &services).unwrap();
        assert!(matches!(out, CommandOutput::Json(v) if v["name"] == "ssh.commands"));
    }

    #[test]
    fn unregistered_endpoint_query_fails() {
        let services = services();
        assert!(matches!(
            ActuatorKind::Beans.query(&Args::default(), &services),
            Err(CommandError::Unavailable { .. })
        ));
    }

    #[test]
    fn request_carries_options() {
        let request = ActuatorKind::Audit.request(&args(ActuatorKind::Audit, "-p alice -t COMMAND"));
        assert_eq!(request.get("principal"), Some("alice"));
        assert_eq!(request.get("type"), Some("COMMAND"));
        assert_eq!(ActuatorKind::Health.request(&Args::default()), EndpointRequest::new());
    }
}
