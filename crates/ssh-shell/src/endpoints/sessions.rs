//! Active SSH sessions.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use serde_json::{Value, json};

use super::{Endpoint, EndpointRequest, ids, unix_millis};
use crate::error::CommandResult;

/// One open session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Session id.
    pub id: u64,
    /// Authenticated user name.
    pub user: String,
    /// Peer address.
    pub remote_addr: Option<SocketAddr>,
    /// Terminal type requested by the client.
    pub term_type: String,
    /// When the session started.
    pub started_at: SystemTime,
}

/// Tracks open sessions and hands out session ids.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    next_id: AtomicU64,
    sessions: Mutex<BTreeMap<u64, SessionInfo>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh session id.
    pub fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Record an open session.
    pub fn insert(&self, info: SessionInfo) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.insert(info.id, info);
    }

    /// Forget a session.
    pub fn remove(&self, id: u64) -> Option<SessionInfo> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.remove(&id)
    }

    /// Open sessions, optionally only those of `user`.
    #[must_use]
    pub fn list(&self, user: Option<&str>) -> Vec<SessionInfo> {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions
            .values()
            .filter(|s| user.is_none_or(|u| s.user == u))
            .cloned()
            .collect()
    }

    /// Number of open sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether no session is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lists the sessions of a [`SessionRegistry`].
#[derive(Debug, Clone)]
pub struct SessionsEndpoint {
    registry: Arc<SessionRegistry>,
}

impl SessionsEndpoint {
    /// Serve `registry`.
    #[must_use]
    pub const fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }
}

impl Endpoint for SessionsEndpoint {
    fn id(&self) -> &str {
        ids::SESSIONS
    }

    fn invoke(&self, request: &EndpointRequest) -> CommandResult<Value> {
        let sessions: Vec<Value> = self
            .registry
            .list(request.get("username"))
            .into_iter()
            .map(|s| {
                json!({
                    "id": s.id,
                    "user": s.user,
                    "remoteAddress": s.remote_addr.map(|a| a.to_string()),
                    "termType": s.term_type,
                    "creationTime": unix_millis(s.started_at),
                })
            })
            .collect();
        Ok(json!({ "sessions": sessions }))
    }
}
