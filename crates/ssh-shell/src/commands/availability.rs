//! Command availability.

use std::fmt;

use crate::auth::{self, Authentication};
use crate::config::ShellConfig;
use crate::endpoints::{EndpointRegistry, ids};

/// Whether a command may run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    /// The command may run.
    Available,
    /// The command exists but may not run.
    Unavailable {
        /// Why, completing "not currently available because ...".
        reason: String,
    },
}

impl Availability {
    /// An unavailable result.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Whether the command may run.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }

    /// The reason, when unavailable.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Available => None,
            Self::Unavailable { reason } => Some(reason),
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available => f.write_str("available"),
            Self::Unavailable { reason } => write!(f, "unavailable: {reason}"),
        }
    }
}

/// Availability of the actuator command `name`.
///
/// Checked in order: user roles (skipped for `info`), endpoint enablement,
/// the exclusion list, then endpoint registration. The first failing check
/// gives the reason.
#[must_use]
pub fn actuator_availability(
    name: &str,
    config: &ShellConfig,
    endpoints: &EndpointRegistry,
    auth: Option<&Authentication>,
) -> Availability {
    if name != ids::INFO {
        let authorities = auth.and_then(|a| a.authorities.as_deref());
        if !auth::check_authorities(&config.actuator.authorized_roles, authorities, true) {
            return Availability::unavailable("actuator commands are forbidden for current user");
        }
    }
    if !config.endpoint_enabled(name) {
        return Availability::unavailable(format!(
            "endpoint '{name}' deactivated (please check property 'endpoints.{name}.enabled')"
        ));
    }
    if config.actuator.excludes.iter().any(|e| e == name) {
        return Availability::unavailable(
            "command is present in exclusion (please check property 'actuator.excludes')",
        );
    }
    if !endpoints.contains(name) {
        return Availability::unavailable(format!("{name} endpoint is not registered"));
    }
    Availability::Available
}
