//! Traits and types for outputting tag-scoped log lines.
//!
//! The API only defines the severity scale and the sink; whether a message is emitted for a given tag is up to the
//! backend implementing [`LogTarget`].

use core::fmt;
use core::panic::Location;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Log message severity levels, ordered from "no output" to most verbose.
///
/// A level admits every message of its own severity and of all lower (more severe) levels, so
/// `LogLevel::Error < LogLevel::Verbose`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum LogLevel {
    /// No log output.
    None = 0,
    /// Critical errors, the software module cannot recover on its own.
    Error = 1,
    /// Error conditions from which recovery measures have been taken.
    Warn = 2,
    /// Information messages which describe the normal flow of events.
    #[default]
    Info = 3,
    /// Extra information which is not necessary for normal use (values, pointers, sizes, etc).
    Debug = 4,
    /// Bigger chunks of debugging information, or frequent messages which can potentially flood the output.
    Verbose = 5,
}

impl LogLevel {
    /// Number of levels supported.
    pub const COUNT: usize = 6;

    /// All levels, in ascending order.
    pub const ALL: [LogLevel; Self::COUNT] = [
        LogLevel::None,
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::Verbose,
    ];

    /// Returns the upper-case name of the level.
    pub const fn as_str(self) -> &'static str {
        match self {
            LogLevel::None => "NONE",
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Verbose => "VERBOSE",
        }
    }

    /// Returns the name that prefixes log lines of this level.
    pub const fn label(self) -> &'static str {
        match self {
            LogLevel::None => "None",
            LogLevel::Error => "Error",
            LogLevel::Warn => "Warning",
            LogLevel::Info => "Info",
            LogLevel::Debug => "Debug",
            LogLevel::Verbose => "Verbose",
        }
    }

    /// Maps the level onto the [`tracing`] scale.
    ///
    /// [`LogLevel::None`] has no counterpart as it never produces output.
    pub const fn to_tracing(self) -> Option<tracing::Level> {
        match self {
            LogLevel::None => None,
            LogLevel::Error => Some(tracing::Level::ERROR),
            LogLevel::Warn => Some(tracing::Level::WARN),
            LogLevel::Info => Some(tracing::Level::INFO),
            LogLevel::Debug => Some(tracing::Level::DEBUG),
            LogLevel::Verbose => Some(tracing::Level::TRACE),
        }
    }

    /// Returns `true` if a message of `severity` passes a filter set to `self`.
    pub fn admits(self, severity: LogLevel) -> bool {
        severity != LogLevel::None && severity <= self
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The string did not name a [`LogLevel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown log level")]
pub struct ParseLogLevelError;

impl FromStr for LogLevel {
    type Err = ParseLogLevelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        LogLevel::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(value))
            .ok_or(ParseLogLevelError)
    }
}

impl TryFrom<u8> for LogLevel {
    type Error = ParseLogLevelError;

    fn try_from(value: u8) -> Result<Self, ParseLogLevelError> {
        LogLevel::ALL
            .get(usize::from(value))
            .copied()
            .ok_or(ParseLogLevelError)
    }
}

/// One formatted log line.
///
/// Renders as `"<Label> - <tag>: <message>"`. Warnings and errors also name the call site:
/// `"Warning AT <file>:<line>: - <tag>: <message>"` and `"Error: AT <file>:<line>: - <tag>: <message>"`.
#[derive(Debug, Clone, Copy)]
pub struct LogLine<'a> {
    level: LogLevel,
    tag: &'a str,
    location: &'a Location<'a>,
    args: fmt::Arguments<'a>,
}

impl<'a> LogLine<'a> {
    /// Creates a line for a message of `level` logged at `location`.
    pub fn new(
        level: LogLevel,
        tag: &'a str,
        location: &'a Location<'a>,
        args: fmt::Arguments<'a>,
    ) -> Self {
        Self {
            level,
            tag,
            location,
            args,
        }
    }
}

impl fmt::Display for LogLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (tag, args) = (self.tag, self.args);
        let (file, line) = (self.location.file(), self.location.line());
        match self.level {
            LogLevel::Error => write!(f, "Error: AT {file}:{line}: - {tag}: {args}"),
            LogLevel::Warn => write!(f, "Warning AT {file}:{line}: - {tag}: {args}"),
            level => write!(f, "{} - {tag}: {args}", level.label()),
        }
    }
}

/// `LogTarget` is used to perform log-related operations in a platform-agnostic manner.
pub trait LogTarget: Send + Sync + 'static {
    /// Initializes global state necessary for this type.
    fn init();

    /// Outputs a line of text through this log target.
    fn println(args: fmt::Arguments<'_>);

    /// Outputs a message of `level` on behalf of `tag`.
    ///
    /// The provided implementation prints a [`LogLine`] for the caller and does not filter; targets that support
    /// per-tag levels override it.
    #[track_caller]
    fn log(level: LogLevel, tag: &str, args: fmt::Arguments<'_>) {
        let line = LogLine::new(level, tag, Location::caller(), args);
        Self::println(format_args!("{line}"));
    }
}
