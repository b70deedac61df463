//! Logger levels.
//!
//! Without a `name` parameter the endpoint lists configured loggers. With
//! `name` it returns that logger's levels, and with `name` and `level` it
//! changes them first.

use serde_json::{Map, Value, json};

use super::{Endpoint, EndpointRequest, ids};
use crate::error::{CommandError, CommandResult};
use crate::logging::{LogLevel, LogLevels, LoggerLevels};

/// Serves and changes [`LogLevels`].
#[derive(Debug, Clone)]
pub struct LoggersEndpoint {
    levels: LogLevels,
}

impl LoggersEndpoint {
    /// Serve `levels`.
    #[must_use]
    pub const fn new(levels: LogLevels) -> Self {
        Self { levels }
    }
}

fn levels_json(levels: LoggerLevels) -> Value {
    json!({
        "configuredLevel": levels.configured.map(LogLevel::name),
        "effectiveLevel": levels.effective.name(),
    })
}

impl Endpoint for LoggersEndpoint {
    fn id(&self) -> &str {
        ids::LOGGERS
    }

    fn invoke(&self, request: &EndpointRequest) -> CommandResult<Value> {
        let Some(name) = request.get("name") else {
            let loggers: Map<String, Value> = self
                .levels
                .all()
                .into_iter()
                .map(|(name, levels)| (name, levels_json(levels)))
                .collect();
            let names: Vec<_> = LogLevel::ALL.iter().map(|l| l.name()).collect();
            return Ok(json!({ "levels": names, "loggers": loggers }));
        };
        if let Some(level) = request.get("level") {
            let level: LogLevel = level
                .parse()
                .map_err(|e: crate::logging::UnknownLevel| CommandError::invalid_argument(e.to_string()))?;
            self.levels.configure(name, Some(level))?;
        }
        Ok(levels_json(self.levels.get(name)))
    }
}
