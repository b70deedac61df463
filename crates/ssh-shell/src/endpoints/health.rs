//! Health checking.
//!
//! Indicators report the state of one component; the endpoint aggregates
//! them into an overall status.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value, json};
use tokio_util::sync::CancellationToken;

use super::{Endpoint, EndpointRequest, ids};
use crate::error::CommandResult;

/// Health status, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    /// Status unknown.
    Unknown,
    /// Healthy and operational.
    Up,
    /// Deliberately taken out of service.
    OutOfService,
    /// Not operational.
    Down,
}

impl HealthStatus {
    /// Check if up.
    #[must_use]
    pub const fn is_up(&self) -> bool {
        matches!(self, Self::Up)
    }

    /// The most severe of `statuses`, or `Unknown` when there are none.
    #[must_use]
    pub fn aggregate(statuses: impl IntoIterator<Item = Self>) -> Self {
        statuses.into_iter().max().unwrap_or(Self::Unknown)
    }
}

/// Health check result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthCheckResult {
    /// Status.
    pub status: HealthStatus,
    /// Extra information.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub details: Map<String, Value>,
}

impl HealthCheckResult {
    /// Create an up result.
    #[must_use]
    pub fn up() -> Self {
        Self::with_status(HealthStatus::Up)
    }

    /// Create a down result.
    #[must_use]
    pub fn down(message: impl Into<String>) -> Self {
        Self::with_status(HealthStatus::Down).with_detail("error", message.into())
    }

    /// Create a result with the given status.
    #[must_use]
    pub fn with_status(status: HealthStatus) -> Self {
        Self {
            status,
            details: Map::new(),
        }
    }

    /// Add a detail.
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// Reports the health of one component.
pub trait HealthIndicator: Send + Sync + fmt::Debug {
    /// Component name.
    fn name(&self) -> &str;

    /// Check the component.
    fn check(&self) -> HealthCheckResult;
}

/// Always up.
#[derive(Debug, Clone, Copy, Default)]
pub struct PingIndicator;

impl HealthIndicator for PingIndicator {
    fn name(&self) -> &str {
        "ping"
    }

    fn check(&self) -> HealthCheckResult {
        HealthCheckResult::up()
    }
}

/// Out of service once the server is shutting down.
#[derive(Debug, Clone)]
pub struct ServerIndicator {
    shutdown: CancellationToken,
    address: String,
}

impl ServerIndicator {
    /// Watch `shutdown` for a server listening on `address`.
    pub fn new(shutdown: CancellationToken, address: impl Into<String>) -> Self {
        Self {
            shutdown,
            address: address.into(),
        }
    }
}

impl HealthIndicator for ServerIndicator {
    fn name(&self) -> &str {
        "sshServer"
    }

    fn check(&self) -> HealthCheckResult {
        let status = if self.shutdown.is_cancelled() {
            HealthStatus::OutOfService
        } else {
            HealthStatus::Up
        };
        HealthCheckResult::with_status(status).with_detail("address", self.address.clone())
    }
}

/// Aggregates registered indicators.
#[derive(Debug, Clone, Default)]
pub struct HealthEndpoint {
    indicators: Vec<Arc<dyn HealthIndicator>>,
}

impl HealthEndpoint {
    /// Create an endpoint without indicators.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an indicator.
    #[must_use]
    pub fn with_indicator(mut self, indicator: impl HealthIndicator + 'static) -> Self {
        self.indicators.push(Arc::new(indicator));
        self
    }

    /// Run every indicator.
    #[must_use]
    pub fn health(&self) -> (HealthStatus, Vec<(String, HealthCheckResult)>) {
        let results: Vec<_> = self
            .indicators
            .iter()
            .map(|i| (i.name().to_string(), i.check()))
            .collect();
        let status = HealthStatus::aggregate(results.iter().map(|(_, r)| r.status));
        (status, results)
    }
}

impl Endpoint for HealthEndpoint {
    fn id(&self) -> &str {
        ids::HEALTH
    }

    fn invoke(&self, _request: &EndpointRequest) -> CommandResult<Value> {
        let (status, results) = self.health();
        let mut components = Map::new();
        for (name, result) in results {
            components.insert(name, serde_json::to_value(result)?);
        }
        Ok(json!({ "status": status, "components": components }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Fixed(&'static str, HealthStatus);

    impl HealthIndicator for Fixed {
        fn name(&self) -> &str {
            self.0
        }

        fn check(&self) -> HealthCheckResult {
            HealthCheckResult::with_status(self.1)
        }
    }

    #[test]
    fn aggregation_prefers_severe() {
        use HealthStatus::{Down, OutOfService, Unknown, Up};
        assert_eq!(HealthStatus::aggregate([]), Unknown);
        assert_eq!(HealthStatus::aggregate([Up, Unknown]), Up);
        assert_eq!(HealthStatus::aggregate([Up, OutOfService]), OutOfService);
        assert_eq!(HealthStatus::aggregate([OutOfService, Down, Up]), Down);
        assert!(Up.is_up());
    }

    #[test]
    fn endpoint_reports_components() {
        let endpoint = HealthEndpoint::new()
            .with_indicator(PingIndicator)
            .with_indicator(Fixed("db", HealthStatus::Down));
        let value = endpoint.invoke(&EndpointRequest::new()).unwrap();
        assert_eq!(value["status"], "DOWN");
        assert_eq!(value["components"]["ping"]["status"], "UP");
        assert_eq!(value["components"]["db"]["status"], "DOWN");
    }

    #[test]
    fn server_indicator_follows_shutdown() {
        let token = CancellationToken::new();
        let indicator = ServerIndicator::new(token.clone(), "127.0.0.1:2222");
        assert_eq!(indicator.check().status, HealthStatus::Up);
        token.cancel();
        let result = indicator.check();
        assert_eq!(result.status, HealthStatus::OutOfService);
        assert_eq!(result.details["address"], "127.0.0.1:2222");
    }

    #[test]
    fn down_carries_message() {
        let result = HealthCheckResult::down("disk full");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["details"]["error"], "disk full");
        assert!(serde_json::to_value(HealthCheckResult::up()).unwrap().get("details").is_none());
    }
}
