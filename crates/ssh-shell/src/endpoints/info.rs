//! Application information.

use serde_json::{Map, Value, json};

use super::{Endpoint, EndpointRequest, ids};
use crate::error::CommandResult;

/// Returns the configured `[info]` table plus build information.
#[derive(Debug, Clone, Default)]
pub struct InfoEndpoint {
    info: Map<String, Value>,
}

impl InfoEndpoint {
    /// Serve `info`.
    #[must_use]
    pub const fn new(info: Map<String, Value>) -> Self {
        Self { info }
    }
}

impl Endpoint for InfoEndpoint {
    fn id(&self) -> &str {
        ids::INFO
    }

    fn invoke(&self, _request: &EndpointRequest) -> CommandResult<Value> {
        let mut info = self.info.clone();
        info.entry("build").or_insert_with(|| {
            json!({
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            })
        });
        Ok(Value::Object(info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_build_info() {
        let mut map = Map::new();
        map.insert("team".into(), json!("ops"));
        let value = InfoEndpoint::new(map).invoke(&EndpointRequest::new()).unwrap();
        assert_eq!(value["team"], "ops");
        assert_eq!(value["build"]["name"], "ssh-shell");
    }

    #[test]
    fn configured_build_wins() {
        let mut map = Map::new();
        map.insert("build".into(), json!({"version": "custom"}));
        let value = InfoEndpoint::new(map).invoke(&EndpointRequest::new()).unwrap();
        assert_eq!(value["build"]["version"], "custom");
    }
}
