//! Management endpoints queried by the actuator commands.
//!
//! An [`Endpoint`] answers a query with a JSON value. Endpoints are looked
//! up by id in an [`EndpointRegistry`]; a command whose endpoint is not
//! registered is reported as unavailable.

pub mod audit;
pub mod configprops;
pub mod env;
pub mod health;
pub mod info;
pub mod loggers;
pub mod metrics;
pub mod sessions;
pub mod shutdown;
pub mod threaddump;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::CommandResult;

pub use audit::{AuditEndpoint, AuditEvent, AuditLog};
pub use configprops::ConfigPropsEndpoint;
pub use env::EnvEndpoint;
pub use health::{HealthCheckResult, HealthEndpoint, HealthIndicator, HealthStatus};
pub use info::InfoEndpoint;
pub use loggers::LoggersEndpoint;
pub use metrics::{Counter, Gauge, MetricsEndpoint, MetricsRegistry};
pub use sessions::{SessionInfo, SessionRegistry, SessionsEndpoint};
pub use shutdown::ShutdownEndpoint;
pub use threaddump::ThreadDumpEndpoint;

/// Endpoint ids.
pub mod ids {
    /// Audit events.
    pub const AUDIT: &str = "audit";
    /// Application components.
    pub const BEANS: &str = "beans";
    /// Configuration conditions.
    pub const CONDITIONS: &str = "conditions";
    /// Configuration properties.
    pub const CONFIGPROPS: &str = "configprops";
    /// Environment.
    pub const ENV: &str = "env";
    /// Health.
    pub const HEALTH: &str = "health";
    /// Request traces.
    pub const HTTPTRACE: &str = "httptrace";
    /// Application information.
    pub const INFO: &str = "info";
    /// Log levels.
    pub const LOGGERS: &str = "loggers";
    /// Request mappings.
    pub const MAPPINGS: &str = "mappings";
    /// Metrics.
    pub const METRICS: &str = "metrics";
    /// Scheduled tasks.
    pub const SCHEDULEDTASKS: &str = "scheduledtasks";
    /// Active sessions.
    pub const SESSIONS: &str = "sessions";
    /// Shutdown.
    pub const SHUTDOWN: &str = "shutdown";
    /// Threads.
    pub const THREADDUMP: &str = "threaddump";
}

/// Named query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointRequest {
    params: BTreeMap<String, String>,
}

impl EndpointRequest {
    /// A request without parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Add a parameter when `value` is set.
    #[must_use]
    pub fn with_opt(self, key: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.with(key, value),
            None => self,
        }
    }

    /// A parameter value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// A management endpoint.
pub trait Endpoint: Send + Sync + fmt::Debug {
    /// Endpoint id, matching the command name.
    fn id(&self) -> &str;

    /// Answer a query. `Value::Null` means there is nothing matching it.
    fn invoke(&self, request: &EndpointRequest) -> CommandResult<Value>;
}

/// An endpoint backed by a closure.
pub struct FnEndpoint<F> {
    id: String,
    f: F,
}

impl<F> fmt::Debug for FnEndpoint<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnEndpoint").field("id", &self.id).finish()
    }
}

/// Create an endpoint from a closure.
pub fn from_fn<F>(id: impl Into<String>, f: F) -> FnEndpoint<F>
where
    F: Fn(&EndpointRequest) -> CommandResult<Value> + Send + Sync,
{
    FnEndpoint { id: id.into(), f }
}

impl<F> Endpoint for FnEndpoint<F>
where
    F: Fn(&EndpointRequest) -> CommandResult<Value> + Send + Sync,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn invoke(&self, request: &EndpointRequest) -> CommandResult<Value> {
        (self.f)(request)
    }
}

/// Registered endpoints by id.
#[derive(Debug, Clone, Default)]
pub struct EndpointRegistry {
    endpoints: BTreeMap<String, Arc<dyn Endpoint>>,
}

impl EndpointRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an endpoint, replacing any with the same id.
    pub fn register(&mut self, endpoint: Arc<dyn Endpoint>) {
        tracing::debug!(endpoint = endpoint.id(), "registered endpoint");
        self.endpoints.insert(endpoint.id().to_string(), endpoint);
    }

    /// Register an endpoint, builder style.
    #[must_use]
    pub fn with(mut self, endpoint: impl Endpoint + 'static) -> Self {
        self.register(Arc::new(endpoint));
        self
    }

    /// Look up an endpoint.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<dyn Endpoint>> {
        self.endpoints.get(id)
    }

    /// Whether an endpoint is registered.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.endpoints.contains_key(id)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.endpoints.keys().map(String::as_str)
    }
}

/// Unix time in milliseconds.
pub(crate) fn unix_millis(time: std::time::SystemTime) -> u64 {
    time.duration_since(std::time::UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_params() {
        let request = EndpointRequest::new()
            .with("name", "jvm")
            .with_opt("tags", None::<String>)
            .with_opt("level", Some("INFO"));
        assert_eq!(request.get("name"), Some("jvm"));
        assert_eq!(request.get("tags"), None);
        assert_eq!(request.get("level"), Some("INFO"));
    }

    #[test]
    fn registry_lookup() {
        let registry = EndpointRegistry::new()
            .with(from_fn("beans", |_| Ok(json!({"beans": []}))))
            .with(from_fn("mappings", |r| Ok(json!(r.get("x")))));
        assert!(registry.contains("beans"));
        assert!(!registry.contains("health"));
        assert_eq!(registry.ids().collect::<Vec<_>>(), ["beans", "mappings"]);
        let value = registry
            .get("mappings")
            .unwrap()
            .invoke(&EndpointRequest::new().with("x", "y"))
            .unwrap();
        assert_eq!(value, json!("y"));
    }
}
