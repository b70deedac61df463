//! Configuration types for ssh-shell.
//!
//! Configuration is read from a TOML file (see [`file`]) and then patched
//! from `SSH_SHELL_*` environment variables (see [`env`]). Every field has a
//! default, so an empty file is a valid configuration.

pub mod env;
pub mod file;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shell_term::Color;

use crate::error::{Result, ShellError};

pub use env::EnvConfig;
pub use file::load;

/// Default listen address.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default listen port.
pub const DEFAULT_PORT: u16 = 2222;

/// Default user for simple authentication.
pub const DEFAULT_USER: &str = "user";

/// Default prompt text.
pub const DEFAULT_PROMPT: &str = "shell>";

/// Endpoints that are disabled unless explicitly enabled.
const DISABLED_BY_DEFAULT: &[&str] = &["shutdown"];

/// Top-level shell configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// User name for simple authentication.
    pub user: String,
    /// Password for simple authentication. Generated at startup when unset.
    pub password: Option<String>,
    /// Where the server host key is stored.
    pub host_key_file: PathBuf,
    /// Prompt settings.
    pub prompt: PromptConfig,
    /// Words accepted as a positive answer by confirmations.
    pub confirmation_words: Vec<String>,
    /// Authentication settings.
    pub auth: AuthConfig,
    /// Actuator command settings.
    pub actuator: ActuatorConfig,
    /// Per-endpoint settings, keyed by endpoint name.
    pub endpoints: BTreeMap<String, EndpointConfig>,
    /// Free-form data returned by the `info` endpoint.
    pub info: serde_json::Map<String, serde_json::Value>,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Idle connections are closed after this many seconds. `0` disables it.
    pub inactivity_timeout_secs: u64,
    /// Number of remembered command lines per session.
    pub history_size: usize,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            user: DEFAULT_USER.to_string(),
            password: None,
            host_key_file: PathBuf::from("hostKey.pem"),
            prompt: PromptConfig::default(),
            confirmation_words: vec!["y".to_string(), "yes".to_string()],
            auth: AuthConfig::default(),
            actuator: ActuatorConfig::default(),
            endpoints: BTreeMap::new(),
            info: serde_json::Map::new(),
            logging: LoggingConfig::default(),
            inactivity_timeout_secs: 0,
            history_size: shell_term::line::DEFAULT_HISTORY_SIZE,
        }
    }
}

impl ShellConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        Ok(config)
    }

    /// Apply `SSH_SHELL_*` overrides.
    #[must_use]
    pub fn with_env(mut self, env: &EnvConfig) -> Self {
        env.apply(&mut self);
        self
    }

    /// Check the configuration for values the server cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(ShellError::config("port must not be 0"));
        }
        if self.user.trim().is_empty() && self.auth.mode == AuthMode::Simple {
            return Err(ShellError::config("user must not be empty"));
        }
        if self.prompt.color.parse::<Color>().is_err() {
            return Err(ShellError::config(format!(
                "unknown prompt color '{}'",
                self.prompt.color
            )));
        }
        if self.auth.mode == AuthMode::Users && self.auth.users.is_empty() {
            return Err(ShellError::config(
                "auth mode 'users' requires at least one configured user",
            ));
        }
        Ok(())
    }

    /// Whether an endpoint is enabled.
    ///
    /// Endpoints are enabled unless configured otherwise, except the ones
    /// that are disabled by default (`shutdown`).
    #[must_use]
    pub fn endpoint_enabled(&self, name: &str) -> bool {
        self.endpoints
            .get(name)
            .and_then(|e| e.enabled)
            .unwrap_or_else(|| !DISABLED_BY_DEFAULT.contains(&name))
    }

    /// The idle timeout, if any.
    #[must_use]
    pub const fn inactivity_timeout(&self) -> Option<Duration> {
        if self.inactivity_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.inactivity_timeout_secs))
        }
    }

    /// The prompt color, falling back to white on an unknown name.
    #[must_use]
    pub fn prompt_color(&self) -> Color {
        self.prompt.color.parse().unwrap_or(Color::White)
    }
}

/// Prompt settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Prompt text, printed before a trailing space.
    pub text: String,
    /// Prompt color name.
    pub color: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            text: DEFAULT_PROMPT.to_string(),
            color: Color::White.name().to_string(),
        }
    }
}

/// How users are authenticated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// One configured user and password, no roles.
    #[default]
    Simple,
    /// A list of users with passwords and roles.
    Users,
}

/// Authentication settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Authentication mode.
    pub mode: AuthMode,
    /// Users for [`AuthMode::Users`].
    pub users: Vec<UserConfig>,
}

/// A configured user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// Login name.
    pub name: String,
    /// Password.
    pub password: String,
    /// Roles, without the `ROLE_` prefix.
    pub roles: Vec<String>,
}

/// Actuator command settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActuatorConfig {
    /// Register the actuator commands at all.
    pub enable: bool,
    /// Command names that are never available.
    pub excludes: Vec<String>,
    /// Roles allowed to run actuator commands.
    pub authorized_roles: Vec<String>,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            enable: true,
            excludes: Vec::new(),
            authorized_roles: vec!["ACTUATOR".to_string()],
        }
    }
}

/// Per-endpoint settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Explicit enablement. Unset means the endpoint's default.
    pub enabled: Option<bool>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Initial filter directives, e.g. `info,ssh_shell=debug`.
    pub filter: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_default() {
        let config = ShellConfig::from_toml("").unwrap();
        assert_eq!(config, ShellConfig::default());
        assert_eq!(config.port, 2222);
        assert_eq!(config.confirmation_words, ["y", "yes"]);
        assert_eq!(config.actuator.authorized_roles, ["ACTUATOR"]);
        config.validate().unwrap();
    }

    #[test]
    fn parses_nested_sections() {
        let config = ShellConfig::from_toml(
            r#"
            port = 2000
            password = "secret"

            [prompt]
            text = "admin>"
            color = "red"

            [actuator]
            excludes = ["env"]

            [endpoints.shutdown]
            enabled = true

            [info]
            app = "demo"
            "#,
        )
        .unwrap();
        assert_eq!(config.port, 2000);
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert_eq!(config.prompt_color(), Color::Red);
        assert_eq!(config.actuator.excludes, ["env"]);
        assert!(config.endpoint_enabled("shutdown"));
        assert_eq!(config.info["app"], "demo");
    }

    #[test]
    fn endpoint_defaults() {
        let config = ShellConfig::default();
        assert!(config.endpoint_enabled("health"));
        assert!(!config.endpoint_enabled("shutdown"));

        let config = ShellConfig::from_toml("[endpoints.health]\nenabled = false").unwrap();
        assert!(!config.endpoint_enabled("health"));
    }

    #[test]
    fn validation_errors() {
        let config = ShellConfig {
            port: 0,
            ..ShellConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ShellConfig {
            user: " ".into(),
            ..ShellConfig::default()
        };
        assert!(config.validate().is_err());

        let mut config = ShellConfig::default();
        config.prompt.color = "purple".into();
        assert!(config.validate().is_err());

        let mut config = ShellConfig::default();
        config.auth.mode = AuthMode::Users;
        assert!(config.validate().is_err());
    }

    #[test]
    fn inactivity_timeout() {
        assert_eq!(ShellConfig::default().inactivity_timeout(), None);
        let config = ShellConfig {
            inactivity_timeout_secs: 30,
            ..ShellConfig::default()
        };
        assert_eq!(config.inactivity_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        let err = ShellConfig::from_toml("port = \"many\"").unwrap_err();
        assert!(matches!(err, ShellError::ConfigParse(_)));
    }
}
