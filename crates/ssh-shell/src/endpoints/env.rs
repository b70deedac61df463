//! Process environment.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Value, json};

use super::{Endpoint, EndpointRequest, ids};
use crate::error::{CommandError, CommandResult};

/// Replacement shown for sensitive values.
pub const MASK: &str = "******";

static SENSITIVE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)(password|passwd|secret|token|credential|private|api_?key)").ok()
});

/// Whether a variable name looks like it holds a secret.
#[must_use]
pub fn is_sensitive(name: &str) -> bool {
    SENSITIVE.as_ref().is_some_and(|re| re.is_match(name))
}

/// Environment variables, optionally filtered by a name pattern.
#[derive(Debug, Clone, Default)]
pub struct EnvEndpoint {
    fixed: Option<BTreeMap<String, String>>,
}

impl EnvEndpoint {
    /// Serve the process environment.
    #[must_use]
    pub const fn new() -> Self {
        Self { fixed: None }
    }

    /// Serve a fixed set of variables.
    #[must_use]
    pub fn from_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fixed: Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
        }
    }

    fn vars(&self) -> BTreeMap<String, String> {
        self.fixed
            .clone()
            .unwrap_or_else(|| std::env::vars().collect())
    }
}

impl Endpoint for EnvEndpoint {
    fn id(&self) -> &str {
        ids::ENV
    }

    fn invoke(&self, request: &EndpointRequest) -> CommandResult<Value> {
        let pattern = request
            .get("pattern")
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    CommandError::invalid_argument(format!("Invalid pattern '{p}': {e}"))
                })
            })
            .transpose()?;
        let properties: serde_json::Map<String, Value> = self
            .vars()
            .into_iter()
            .filter(|(k, _)| pattern.as_ref().is_none_or(|re| re.is_match(k)))
            .map(|(k, v)| {
                let value = if is_sensitive(&k) { MASK.to_string() } else { v };
                (k, json!({ "value": value }))
            })
            .collect();
        Ok(json!({
            "propertySources": [
                { "name": "systemEnvironment", "properties": properties }
            ]
        }))
    }
}
