//! Server shutdown.

use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use super::{Endpoint, EndpointRequest, ids};
use crate::error::CommandResult;

/// Cancels the server's shutdown token.
#[derive(Debug, Clone)]
pub struct ShutdownEndpoint {
    token: CancellationToken,
}

impl ShutdownEndpoint {
    /// Cancel `token` when invoked.
    #[must_use]
    pub const fn new(token: CancellationToken) -> Self {
        Self { token }
    }
}

impl Endpoint for ShutdownEndpoint {
    fn id(&self) -> &str {
        ids::SHUTDOWN
    }

    fn invoke(&self, _request: &EndpointRequest) -> CommandResult<Value> {
        tracing::warn!("shutdown requested");
        self.token.cancel();
        Ok(json!({ "message": "Shutting down, bye..." }))
    }
}
