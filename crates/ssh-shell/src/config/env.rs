//! Environment-based configuration.

use std::collections::HashMap;

use super::ShellConfig;

/// Environment configuration prefix.
pub const DEFAULT_PREFIX: &str = "SSH_SHELL";

/// Where variable values come from.
#[derive(Debug, Clone)]
enum Source {
    Process,
    Map(HashMap<String, String>),
}

/// Environment variable reader.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Prefix for environment variables.
    prefix: String,
    source: Source,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl EnvConfig {
    /// Create a reader over the process environment.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            source: Source::Process,
        }
    }

    /// Create a reader over a fixed set of variables.
    ///
    /// Keys are full variable names, prefix included.
    #[must_use]
    pub fn from_map<K, V>(prefix: impl Into<String>, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            prefix: prefix.into(),
            source: Source::Map(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
        }
    }

    /// Build the full environment variable name.
    fn var_name(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_uppercase()
        } else {
            format!("{}_{}", self.prefix, name.to_uppercase())
        }
    }

    /// Get a string value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        let var_name = self.var_name(name);
        match &self.source {
            Source::Process => std::env::var(&var_name).ok(),
            Source::Map(vars) => vars.get(&var_name).cloned(),
        }
    }

    /// Get a parsed value. Unparseable values are ignored with a warning.
    #[must_use]
    pub fn parse<T: std::str::FromStr>(&self, name: &str) -> Option<T> {
        let raw = self.get(name)?;
        let parsed = raw.parse().ok();
        if parsed.is_none() {
            tracing::warn!(var = %self.var_name(name), value = %raw, "ignoring invalid value");
        }
        parsed
    }

    /// Get a boolean value.
    #[must_use]
    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).map(|v| {
            matches!(
                v.to_lowercase().as_str(),
                "1" | "true" | "yes" | "on" | "enabled"
            )
        })
    }

    /// Get a comma-separated list. Blank entries are dropped.
    #[must_use]
    pub fn list(&self, name: &str) -> Option<Vec<String>> {
        self.get(name).map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
    }

    /// Check if a variable is set.
    #[must_use]
    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Patch `config` with every variable that is set.
    pub fn apply(&self, config: &mut ShellConfig) {
        if let Some(host) = self.get(vars::HOST) {
            config.host = host;
        }
        if let Some(port) = self.parse(vars::PORT) {
            config.port = port;
        }
        if let Some(user) = self.get(vars::USER) {
            config.user = user;
        }
        if let Some(password) = self.get(vars::PASSWORD) {
            config.password = Some(password);
        }
        if let Some(path) = self.get(vars::HOST_KEY_FILE) {
            config.host_key_file = path.into();
        }
        if let Some(text) = self.get(vars::PROMPT_TEXT) {
            config.prompt.text = text;
        }
        if let Some(color) = self.get(vars::PROMPT_COLOR) {
            config.prompt.color = color;
        }
        if let Some(enable) = self.bool(vars::ACTUATOR_ENABLE) {
            config.actuator.enable = enable;
        }
        if let Some(roles) = self.list(vars::ACTUATOR_ROLES) {
            config.actuator.authorized_roles = roles;
        }
        if let Some(excludes) = self.list(vars::ACTUATOR_EXCLUDES) {
            config.actuator.excludes = excludes;
        }
        if let Some(filter) = self.get(vars::LOG) {
            config.logging.filter = filter;
        }
    }
}

/// Recognized variable names, without prefix.
pub mod vars {
    /// Bind address.
    pub const HOST: &str = "HOST";
    /// Bind port.
    pub const PORT: &str = "PORT";
    /// Simple authentication user.
    pub const USER: &str = "USER";
    /// Simple authentication password.
    pub const PASSWORD: &str = "PASSWORD";
    /// Host key location.
    pub const HOST_KEY_FILE: &str = "HOST_KEY_FILE";
    /// Prompt text.
    pub const PROMPT_TEXT: &str = "PROMPT_TEXT";
    /// Prompt color.
    pub const PROMPT_COLOR: &str = "PROMPT_COLOR";
    /// Actuator commands on or off.
    pub const ACTUATOR_ENABLE: &str = "ACTUATOR_ENABLE";
    /// Comma-separated actuator roles.
    pub const ACTUATOR_ROLES: &str = "ACTUATOR_AUTHORIZED_ROLES";
    /// Comma-separated excluded commands.
    pub const ACTUATOR_EXCLUDES: &str = "ACTUATOR_EXCLUDES";
    /// Log filter directives.
    pub const LOG: &str = "LOG";
}
