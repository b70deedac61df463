//! Logging setup and runtime level changes.
//!
//! [`init`] installs a `tracing` subscriber whose filter can be replaced
//! while the server runs. The returned [`LogLevels`] is what the `loggers`
//! endpoint reads and changes.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt as tracing_fmt, reload};

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{Result, ShellError};

/// Name of the root logger.
pub const ROOT: &str = "ROOT";

/// A log level as shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Nothing is logged.
    Off,
    /// Errors only.
    Error,
    /// Warnings and errors.
    Warn,
    /// Informational messages.
    Info,
    /// Debugging output.
    Debug,
    /// Everything.
    Trace,
}

impl LogLevel {
    /// All levels, from quietest to most verbose.
    pub const ALL: [Self; 6] = [
        Self::Off,
        Self::Error,
        Self::Warn,
        Self::Info,
        Self::Debug,
        Self::Trace,
    ];

    /// Upper-case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
            Self::Trace => "TRACE",
        }
    }

    const fn directive(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A level name that is not one of [`LogLevel::ALL`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown log level '{0}' (expected one of OFF, ERROR, WARN, INFO, DEBUG, TRACE)")]
pub struct UnknownLevel(pub String);

impl FromStr for LogLevel {
    type Err = UnknownLevel;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownLevel(s.to_string()))
    }
}

/// Configured and effective level of one logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggerLevels {
    /// Level set explicitly for this logger.
    pub configured: Option<LogLevel>,
    /// Level in force, inherited from the closest configured parent.
    pub effective: LogLevel,
}

#[derive(Debug)]
struct Levels {
    root: LogLevel,
    targets: BTreeMap<String, LogLevel>,
}

impl Levels {
    fn parse(directives: &str) -> Self {
        let mut levels = Self {
            root: LogLevel::Info,
            targets: BTreeMap::new(),
        };
        for directive in directives.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            let parsed = match directive.split_once('=') {
                Some((target, level)) => level
                    .parse()
                    .map(|level| {
                        levels.targets.insert(target.to_string(), level);
                    }),
                None => directive.parse().map(|level| levels.root = level),
            };
            if parsed.is_err() {
                tracing::warn!(directive, "ignoring unsupported log directive");
            }
        }
        levels
    }

    fn directives(&self) -> String {
        std::iter::once(self.root.directive().to_string())
            .chain(
                self.targets
                    .iter()
                    .map(|(target, level)| format!("{target}={}", level.directive())),
            )
            .collect::<Vec<_>>()
            .join(",")
    }

    fn effective(&self, name: &str) -> LogLevel {
        let mut current = name;
        loop {
            if let Some(level) = self.targets.get(current) {
                return *level;
            }
            match current.rsplit_once("::") {
                Some((parent, _)) => current = parent,
                None => return self.root,
            }
        }
    }
}

/// Runtime view of logger levels.
///
/// Cloning shares the same state. Changes are pushed to the installed
/// subscriber when one was set up by [`init`].
#[derive(Clone)]
pub struct LogLevels {
    levels: Arc<Mutex<Levels>>,
    handle: Option<reload::Handle<EnvFilter, Registry>>,
}

impl fmt::Debug for LogLevels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogLevels")
            .field("directives", &self.directives())
            .field("managed", &self.handle.is_some())
            .finish()
    }
}

impl LogLevels {
    /// Track levels parsed from filter directives without driving a
    /// subscriber.
    #[must_use]
    pub fn new(directives: &str) -> Self {
        Self {
            levels: Arc::new(Mutex::new(Levels::parse(directives))),
            handle: None,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Levels> {
        self.levels.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The current filter directives.
    #[must_use]
    pub fn directives(&self) -> String {
        self.lock().directives()
    }

    /// Levels of one logger. Logger names are `tracing` targets such as
    /// `ssh_shell::server`, or [`ROOT`].
    #[must_use]
    pub fn get(&self, name: &str) -> LoggerLevels {
        let levels = self.lock();
        if name.eq_ignore_ascii_case(ROOT) {
            return LoggerLevels {
                configured: Some(levels.root),
                effective: levels.root,
            };
        }
        LoggerLevels {
            configured: levels.targets.get(name).copied(),
            effective: levels.effective(name),
        }
    }

    /// Every explicitly configured logger, root first.
    #[must_use]
    pub fn all(&self) -> Vec<(String, LoggerLevels)> {
        let levels = self.lock();
        std::iter::once((ROOT.to_string(), levels.root))
            .chain(levels.targets.iter().map(|(k, v)| (k.clone(), *v)))
            .map(|(name, level)| {
                (
                    name,
                    LoggerLevels {
                        configured: Some(level),
                        effective: level,
                    },
                )
            })
            .collect()
    }

    /// Set the level of a logger, or reset it to inherit with `None`.
    ///
    /// The root logger cannot be reset.
    pub fn configure(&self, name: &str, level: Option<LogLevel>) -> Result<()> {
        let directives = {
            let mut levels = self.lock();
            match (name.eq_ignore_ascii_case(ROOT), level) {
                (true, Some(level)) => levels.root = level,
                (true, None) => return Err(ShellError::config("the root logger level cannot be reset")),
                (false, Some(level)) => {
                    levels.targets.insert(name.to_string(), level);
                }
                (false, None) => {
                    levels.targets.remove(name);
                }
            }
            levels.directives()
        };
        if let Some(handle) = &self.handle {
            let filter = EnvFilter::try_new(&directives)
                .map_err(|e| ShellError::config(format!("invalid log filter '{directives}': {e}")))?;
            handle
                .reload(filter)
                .map_err(|e| ShellError::config(format!("cannot reload log filter: {e}")))?;
        }
        tracing::info!(logger = name, level = ?level, "logger level changed");
        Ok(())
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG`, when set, takes precedence over the configured filter.
pub fn init(config: &LoggingConfig) -> Result<LogLevels> {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_else(|_| config.filter.clone());
    let filter = EnvFilter::try_new(&directives)
        .map_err(|e| ShellError::config(format!("invalid log filter '{directives}': {e}")))?;
    let (filter, handle) = reload::Layer::new(filter);

    let text = (config.format == LogFormat::Text).then(|| tracing_fmt::layer().with_target(true));
    let json = (config.format == LogFormat::Json).then(|| tracing_fmt::layer().json());

    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .try_init()
        .map_err(|e| ShellError::config(format!("cannot install log subscriber: {e}")))?;

    Ok(LogLevels {
        levels: Arc::new(Mutex::new(Levels::parse(&directives))),
        handle: Some(handle),
    })
}
