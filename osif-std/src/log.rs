//! Logging related system utilities.

use std::collections::HashMap;
use std::io::Write;
use std::panic::Location;
use std::sync::{LazyLock, PoisonError, RwLock};

pub use osif_api::log::{LogLevel, LogLine, LogTarget};

/// Per-tag output levels.
#[derive(Debug, Default)]
struct Levels {
    default: LogLevel,
    tags: HashMap<String, LogLevel>,
}

static LEVELS: LazyLock<RwLock<Levels>> = LazyLock::new(RwLock::default);

/// Implements the [`LogTarget`] trait by printing to standard output.
///
/// Messages are filtered per tag; tags without an explicit level use the default level, [`LogLevel::Info`] unless
/// changed through [`Log::set_default_level`].
#[derive(Debug)]
pub struct Log;

impl Log {
    /// Sets the output level of `tag`.
    pub fn set_level(tag: &str, level: LogLevel) {
        LEVELS
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .tags
            .insert(tag.to_owned(), level);
    }

    /// Returns the output level of `tag`.
    pub fn level(tag: &str) -> LogLevel {
        let levels = LEVELS.read().unwrap_or_else(PoisonError::into_inner);
        levels.tags.get(tag).copied().unwrap_or(levels.default)
    }

    /// Sets the output level of tags without an explicit level.
    pub fn set_default_level(level: LogLevel) {
        let mut levels = LEVELS.write().unwrap_or_else(PoisonError::into_inner);
        levels.default = level;
    }
}

impl LogTarget for Log {
    fn init() {
        LazyLock::force(&LEVELS);
    }

    /// Prints to [`std::io::stdout`].
    fn println(args: core::fmt::Arguments<'_>) {
        // this is a logger, ignore any errors writing
        let _ = std::writeln!(std::io::stdout(), "{args}");
    }

    #[track_caller]
    fn log(level: LogLevel, tag: &str, args: core::fmt::Arguments<'_>) {
        if Self::level(tag).admits(level) {
            let line = LogLine::new(level, tag, Location::caller(), args);
            Self::println(format_args!("{line}"));
        }
    }
}
