//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Configure log level at runtime, per logger
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging; logger names are tracing targets
//! - JSON format for production, text format for development
//! - Levels live in [`LogLevels`] and are pushed into a reloadable `EnvFilter`

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt as tracing_fmt, reload, EnvFilter, Registry};

use crate::config::{LogFormat, LoggingConfig};

/// Name addressing the root level.
pub const ROOT_LOGGER: &str = "ROOT";

/// Upper bound on per-logger overrides, so the filter cannot grow without limit.
pub const MAX_LOGGER_OVERRIDES: usize = 256;

/// Levels accepted by configuration and the `log` task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    All,
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub const ALL_LEVELS: [LogLevel; 7] = [
        LogLevel::All,
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Off,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::All => "ALL",
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Off => "OFF",
        }
    }

    /// The `EnvFilter` level this maps to. `ALL` admits everything.
    pub fn directive(&self) -> &'static str {
        match self {
            LogLevel::All | LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported log level '{0}'")]
pub struct ParseLevelError(pub String);

impl FromStr for LogLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LogLevel::ALL_LEVELS
            .into_iter()
            .find(|level| s.eq_ignore_ascii_case(level.as_str()))
            .ok_or_else(|| ParseLevelError(s.to_string()))
    }
}

/// Runtime access to logger levels.
///
/// `level` returns `None` and `set_level` returns `false` for loggers that do
/// not support dynamic levels. `set_level` also returns `false` once
/// [`MAX_LOGGER_OVERRIDES`] distinct loggers have been set.
pub trait LevelControl: Send + Sync {
    fn level(&self, logger: &str) -> Option<LogLevel>;
    fn set_level(&self, logger: &str, level: LogLevel) -> bool;
}

#[derive(Debug)]
struct LevelState {
    root: LogLevel,
    loggers: BTreeMap<String, LogLevel>,
}

/// Root and per-target levels, optionally wired to the installed subscriber.
pub struct LogLevels {
    state: RwLock<LevelState>,
    reload: Option<reload::Handle<EnvFilter, Registry>>,
}

impl LogLevels {
    /// Levels not attached to any subscriber.
    pub fn detached(root: LogLevel) -> Self {
        Self {
            state: RwLock::new(LevelState {
                root,
                loggers: BTreeMap::new(),
            }),
            reload: None,
        }
    }

    fn attached(root: LogLevel, handle: reload::Handle<EnvFilter, Registry>) -> Self {
        Self {
            reload: Some(handle),
            ..Self::detached(root)
        }
    }

    /// The filter directives for the current levels, root first.
    pub fn directives(&self) -> String {
        let state = self.state.read();
        let mut directives = vec![state.root.directive().to_string()];
        for (target, level) in &state.loggers {
            directives.push(format!("{}={}", target, level.directive()));
        }
        directives.join(",")
    }

    fn apply(&self) {
        let Some(handle) = &self.reload else {
            return;
        };
        let directives = self.directives();
        match EnvFilter::try_new(&directives) {
            Ok(filter) => {
                if let Err(e) = handle.reload(filter) {
                    tracing::warn!(error = %e, "Failed to reload log filter");
                }
            }
            Err(e) => tracing::warn!(directives = %directives, error = %e, "Invalid log filter"),
        }
    }
}

/// Whether `name` can be used as the target of a filter directive.
fn is_dynamic(name: &str) -> bool {
    !name.is_empty()
        && !name
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '=' | ',' | '[' | ']' | '{' | '}'))
}

impl LevelControl for LogLevels {
    fn level(&self, logger: &str) -> Option<LogLevel> {
        let state = self.state.read();
        if logger == ROOT_LOGGER {
            return Some(state.root);
        }
        if !is_dynamic(logger) {
            return None;
        }
        Some(state.loggers.get(logger).copied().unwrap_or(state.root))
    }

    fn set_level(&self, logger: &str, level: LogLevel) -> bool {
        {
            let mut state = self.state.write();
            if logger == ROOT_LOGGER {
                state.root = level;
            } else if is_dynamic(logger) {
                if state.loggers.len() >= MAX_LOGGER_OVERRIDES && !state.loggers.contains_key(logger) {
                    tracing::warn!(logger = %logger, limit = MAX_LOGGER_OVERRIDES, "Too many logger overrides");
                    return false;
                }
                state.loggers.insert(logger.to_string(), level);
            } else {
                return false;
            }
        }
        self.apply();
        true
    }
}

/// Install the global subscriber and return the level controller bound to it.
///
/// If a global subscriber is already installed, the returned levels are still
/// tracked but only the first subscriber receives filter reloads.
pub fn init(config: &LoggingConfig) -> Arc<LogLevels> {
    let root = config.level.parse().unwrap_or(LogLevel::Info);
    let (filter, handle) = reload::Layer::new(EnvFilter::new(root.directive()));
    let levels = Arc::new(LogLevels::attached(root, handle));

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.format {
        LogFormat::Json => registry.with(tracing_fmt::layer().json()).try_init(),
        LogFormat::Text => registry.with(tracing_fmt::layer()).try_init(),
    };
    if let Err(e) = installed {
        tracing::debug!(error = %e, "Global subscriber already installed");
    }

    for (logger, level) in &config.loggers {
        if let Ok(level) = level.parse() {
            levels.set_level(logger, level);
        }
    }
    levels.apply();
    levels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("warn".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("All".parse::<LogLevel>().unwrap(), LogLevel::All);
        assert_eq!("OFF".parse::<LogLevel>().unwrap(), LogLevel::Off);
        assert!("bogus".parse::<LogLevel>().is_err());
        assert!("".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_unset_logger_inherits_root() {
        let levels = LogLevels::detached(LogLevel::Info);
        assert_eq!(levels.level("gantry::admin"), Some(LogLevel::Info));

        levels.set_level(ROOT_LOGGER, LogLevel::Error);
        assert_eq!(levels.level("gantry::admin"), Some(LogLevel::Error));
    }

    #[test]
    fn test_set_level_per_logger() {
        let levels = LogLevels::detached(LogLevel::Info);
        assert!(levels.set_level("gantry::admin", LogLevel::All));
        assert_eq!(levels.level("gantry::admin"), Some(LogLevel::All));
        assert_eq!(levels.level("gantry::http"), Some(LogLevel::Info));
        assert_eq!(levels.directives(), "info,gantry::admin=trace");
    }

    #[test]
    fn test_names_that_cannot_form_directives_are_skipped() {
        let levels = LogLevels::detached(LogLevel::Info);
        assert!(!levels.set_level("a=b", LogLevel::Debug));
        assert!(!levels.set_level("", LogLevel::Debug));
        assert_eq!(levels.level("with space"), None);
        assert_eq!(levels.directives(), "info");
    }

    #[test]
    fn test_overrides_are_bounded() {
        let levels = LogLevels::detached(LogLevel::Info);
        for i in 0..MAX_LOGGER_OVERRIDES {
            assert!(levels.set_level(&format!("target_{i}"), LogLevel::Debug));
        }
        assert!(!levels.set_level("one_too_many", LogLevel::Debug));
        assert_eq!(levels.level("one_too_many"), Some(LogLevel::Info));

        // Existing overrides and the root stay adjustable.
        assert!(levels.set_level("target_0", LogLevel::Warn));
        assert_eq!(levels.level("target_0"), Some(LogLevel::Warn));
        assert!(levels.set_level(ROOT_LOGGER, LogLevel::Error));
        assert_eq!(levels.directives().split(',').count(), MAX_LOGGER_OVERRIDES + 1);
    }
}
