//! In-memory audit log.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use serde_json::{Map, Value, json};

use super::{Endpoint, EndpointRequest, ids, unix_millis};
use crate::error::CommandResult;

/// Default number of retained events.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Successful login.
pub const AUTHENTICATION_SUCCESS: &str = "AUTHENTICATION_SUCCESS";
/// Rejected login.
pub const AUTHENTICATION_FAILURE: &str = "AUTHENTICATION_FAILURE";
/// Command run in a session.
pub const COMMAND: &str = "COMMAND";

/// One audit event.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    /// When it happened.
    pub timestamp: SystemTime,
    /// Who did it.
    pub principal: String,
    /// Event type.
    pub kind: String,
    /// Extra data.
    pub data: Map<String, Value>,
}

impl AuditEvent {
    fn to_json(&self) -> Value {
        json!({
            "timestamp": unix_millis(self.timestamp),
            "principal": self.principal,
            "type": self.kind,
            "data": self.data,
        })
    }
}

/// Bounded event log; the oldest events are dropped first.
#[derive(Debug)]
pub struct AuditLog {
    capacity: usize,
    events: Mutex<VecDeque<AuditEvent>>,
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl AuditLog {
    /// Create a log retaining at most `capacity` events.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            events: Mutex::new(VecDeque::new()),
        }
    }

    /// Record an event.
    pub fn record(&self, principal: &str, kind: &str, data: Map<String, Value>) {
        tracing::debug!(principal, kind, "audit event");
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events.push_back(AuditEvent {
            timestamp: SystemTime::now(),
            principal: principal.to_string(),
            kind: kind.to_string(),
            data,
        });
        while events.len() > self.capacity {
            events.pop_front();
        }
    }

    /// Events matching the optional principal and type, oldest first.
    #[must_use]
    pub fn events(&self, principal: Option<&str>, kind: Option<&str>) -> Vec<AuditEvent> {
        let events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events
            .iter()
            .filter(|e| principal.is_none_or(|p| e.principal == p))
            .filter(|e| kind.is_none_or(|k| e.kind == k))
            .cloned()
            .collect()
    }
}

/// Serves an [`AuditLog`].
#[derive(Debug, Clone)]
pub struct AuditEndpoint {
    log: Arc<AuditLog>,
}

impl AuditEndpoint {
    /// Serve `log`.
    #[must_use]
    pub const fn new(log: Arc<AuditLog>) -> Self {
        Self { log }
    }
}

impl Endpoint for AuditEndpoint {
    fn id(&self) -> &str {
        ids::AUDIT
    }

    fn invoke(&self, request: &EndpointRequest) -> CommandResult<Value> {
        let events: Vec<Value> = self
            .log
            .events(request.get("principal"), request.get("type"))
            .iter()
            .map(AuditEvent::to_json)
            .collect();
        Ok(json!({ "events": events }))
    }
}
